//! In-memory document store. Nothing survives the process.

use crate::collection::{OwnerCollection, validate_owner};
use async_trait::async_trait;
use ragroute_core::{Document, DocumentStore, SearchResult, StoreError, StoreStats};
use std::collections::HashMap;
use tokio::sync::RwLock;

/// A map of owner collections behind an async `RwLock`.
#[derive(Default)]
pub struct InMemoryStore {
    owners: RwLock<HashMap<String, OwnerCollection>>,
    dimension: Option<usize>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject embeddings whose length differs from `dimension`.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    async fn read<T>(&self, owner: &str, f: impl FnOnce(&OwnerCollection) -> T) -> T {
        let owners = self.owners.read().await;
        match owners.get(owner) {
            Some(collection) => f(collection),
            None => f(&OwnerCollection::new()),
        }
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn initialize(&self, owner: &str) -> Result<(), StoreError> {
        validate_owner(owner)?;
        self.owners.write().await.entry(owner.to_string()).or_default();
        Ok(())
    }

    async fn add(&self, document: Document) -> Result<String, StoreError> {
        validate_owner(&document.owner)?;
        let mut owners = self.owners.write().await;
        owners
            .entry(document.owner.clone())
            .or_default()
            .insert(document, self.dimension)
    }

    async fn search(&self, query: &[f32], owner: &str, top_k: usize, min_score: f32) -> Result<Vec<SearchResult>, StoreError> {
        self.read(owner, |c| c.search(query, top_k, min_score)).await
    }

    async fn list(&self, owner: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        Ok(self.read(owner, |c| c.list(limit)).await)
    }

    async fn get(&self, id: &str, owner: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.read(owner, |c| c.get(id)).await)
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<bool, StoreError> {
        let mut owners = self.owners.write().await;
        Ok(owners.get_mut(owner).is_some_and(|c| c.remove(id)))
    }

    async fn clear(&self, owner: &str) -> Result<usize, StoreError> {
        let mut owners = self.owners.write().await;
        Ok(owners.get_mut(owner).map_or(0, OwnerCollection::clear))
    }

    async fn stats(&self, owner: &str) -> Result<StoreStats, StoreError> {
        Ok(self.read(owner, OwnerCollection::stats).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragroute_core::DocumentSource;

    fn doc(owner: &str, content: &str, embedding: Vec<f32>) -> Document {
        Document::new(content, owner, DocumentSource::Manual).with_embedding(embedding)
    }

    #[tokio::test]
    async fn add_and_search() {
        let store = InMemoryStore::new();
        let near = store.add(doc("u1", "near", vec![1.0, 0.0, 0.0])).await.unwrap();
        store.add(doc("u1", "far", vec![0.0, 0.0, 1.0])).await.unwrap();

        let results = store.search(&[0.9, 0.1, 0.0], "u1", 1, 0.0).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, near);
    }

    #[tokio::test]
    async fn owners_are_isolated() {
        let store = InMemoryStore::new();
        store.add(doc("alice", "secret", vec![1.0, 0.0])).await.unwrap();

        assert!(store.search(&[1.0, 0.0], "bob", 5, 0.0).await.unwrap().is_empty());
        assert!(store.list("bob", 10).await.unwrap().is_empty());
        assert_eq!(store.stats("bob").await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn uninitialized_owner_behaves_empty() {
        let store = InMemoryStore::new();
        assert!(!store.delete("nope", "ghost").await.unwrap());
        assert_eq!(store.clear("ghost").await.unwrap(), 0);
        assert!(store.get("nope", "ghost").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn clear_twice_returns_zero_second_time() {
        let store = InMemoryStore::new();
        store.initialize("u1").await.unwrap();
        store.initialize("u1").await.unwrap();
        store.add(doc("u1", "a", vec![1.0])).await.unwrap();
        store.add(doc("u1", "b", vec![1.0])).await.unwrap();

        assert_eq!(store.clear("u1").await.unwrap(), 2);
        assert_eq!(store.clear("u1").await.unwrap(), 0);
        assert_eq!(store.stats("u1").await.unwrap().total, 0);
    }

    #[tokio::test]
    async fn list_keeps_insertion_order() {
        let store = InMemoryStore::new();
        for content in ["first", "second", "third"] {
            store.add(doc("u1", content, vec![1.0])).await.unwrap();
        }
        let listed: Vec<_> = store
            .list("u1", 2)
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.content)
            .collect();
        assert_eq!(listed, ["first", "second"]);
    }

    #[tokio::test]
    async fn configured_dimension_enforced() {
        let store = InMemoryStore::new().with_dimension(4);
        let err = store.add(doc("u1", "short", vec![1.0, 0.0])).await.unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { expected: 4, actual: 2 }));
    }

    #[tokio::test]
    async fn delete_removes_document() {
        let store = InMemoryStore::new();
        let id = store.add(doc("u1", "bye", vec![1.0])).await.unwrap();
        assert!(store.delete(&id, "u1").await.unwrap());
        assert!(!store.delete(&id, "u1").await.unwrap());
        assert!(store.get(&id, "u1").await.unwrap().is_none());
    }
}

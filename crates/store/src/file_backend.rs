//! File-backed document store: one directory per owner.
//!
//! Layout under the root directory:
//!
//! ```text
//! <root>/<owner>/documents.json   array of documents, no vectors
//! <root>/<owner>/vectors.json     parallel array of vectors (null when absent)
//! ```
//!
//! Both files are rewritten on every mutation. Each is written to a
//! temporary file and renamed into place, vectors first. Owners are loaded
//! lazily on first access and cached.

use crate::collection::{OwnerCollection, validate_owner};
use async_trait::async_trait;
use ragroute_core::{Document, DocumentStore, SearchResult, StoreError, StoreStats};
use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

const DOCUMENTS_FILE: &str = "documents.json";
const VECTORS_FILE: &str = "vectors.json";

pub struct FileStore {
    root: PathBuf,
    dimension: Option<usize>,
    cache: RwLock<HashMap<String, OwnerCollection>>,
}

impl FileStore {
    /// Create a store rooted at `root`. Nothing is read until an owner is used.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            dimension: None,
            cache: RwLock::new(HashMap::new()),
        }
    }

    /// Reject embeddings whose length differs from `dimension`.
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn owner_dir(&self, owner: &str) -> PathBuf {
        self.root.join(owner)
    }

    /// Forget the cached copy of an owner; the next access reloads from disk.
    pub async fn invalidate(&self, owner: &str) {
        self.cache.write().await.remove(owner);
    }

    fn load_owner(&self, owner: &str) -> Result<OwnerCollection, StoreError> {
        let dir = self.owner_dir(owner);
        let docs_path = dir.join(DOCUMENTS_FILE);
        let vectors_path = dir.join(VECTORS_FILE);

        match (docs_path.exists(), vectors_path.exists()) {
            (false, false) => return Ok(OwnerCollection::new()),
            (true, true) => {}
            (has_docs, _) => {
                let missing = if has_docs { VECTORS_FILE } else { DOCUMENTS_FILE };
                return Err(StoreError::Corrupt {
                    owner: owner.to_string(),
                    reason: format!("{missing} is missing"),
                });
            }
        }

        let mut documents: Vec<Document> = read_json(owner, &docs_path)?;
        let vectors: Vec<Option<Vec<f32>>> = read_json(owner, &vectors_path)?;

        if documents.len() != vectors.len() {
            return Err(StoreError::Corrupt {
                owner: owner.to_string(),
                reason: format!(
                    "{} documents but {} vector rows",
                    documents.len(),
                    vectors.len()
                ),
            });
        }

        for (doc, vector) in documents.iter_mut().zip(vectors) {
            doc.embedding = vector;
        }

        debug!(owner, count = documents.len(), path = %dir.display(), "Owner collection loaded");
        Ok(OwnerCollection::from_documents(documents))
    }

    fn persist(&self, owner: &str, collection: &OwnerCollection) -> Result<(), StoreError> {
        let dir = self.owner_dir(owner);
        std::fs::create_dir_all(&dir).map_err(|e| {
            StoreError::Storage(format!("Failed to create {}: {e}", dir.display()))
        })?;

        let vectors: Vec<Option<&Vec<f32>>> = collection
            .documents()
            .iter()
            .map(|d| d.embedding.as_ref())
            .collect();

        write_json_atomic(&dir.join(VECTORS_FILE), &vectors)?;
        write_json_atomic(&dir.join(DOCUMENTS_FILE), collection.documents())?;

        debug!(owner, count = collection.len(), "Owner collection persisted");
        Ok(())
    }

    /// Make sure the owner is cached, loading it from disk if needed.
    fn load_into<'a>(
        &self,
        cache: &'a mut HashMap<String, OwnerCollection>,
        owner: &str,
    ) -> Result<&'a mut OwnerCollection, StoreError> {
        match cache.entry(owner.to_string()) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let collection = self.load_owner(owner)?;
                Ok(entry.insert(collection))
            }
        }
    }

    async fn read<T>(&self, owner: &str, f: impl FnOnce(&OwnerCollection) -> T) -> Result<T, StoreError> {
        validate_owner(owner)?;
        {
            let cache = self.cache.read().await;
            if let Some(collection) = cache.get(owner) {
                return Ok(f(collection));
            }
        }
        let mut cache = self.cache.write().await;
        let collection = self.load_into(&mut cache, owner)?;
        Ok(f(&*collection))
    }

    /// Apply `f` to a copy of the owner's collection, persist the copy when
    /// `f` reports a change, then swap it into the cache.
    async fn mutate<T>(
        &self,
        owner: &str,
        f: impl FnOnce(&mut OwnerCollection) -> Result<(T, bool), StoreError>,
    ) -> Result<T, StoreError> {
        validate_owner(owner)?;
        let mut cache = self.cache.write().await;
        let current = self.load_into(&mut cache, owner)?;

        let mut next = current.clone();
        let (value, changed) = f(&mut next)?;
        if changed {
            self.persist(owner, &next)?;
            *current = next;
        }
        Ok(value)
    }
}

fn read_json<T: serde::de::DeserializeOwned>(owner: &str, path: &Path) -> Result<T, StoreError> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| StoreError::Storage(format!("Failed to read {}: {e}", path.display())))?;
    serde_json::from_str(&content).map_err(|e| StoreError::Corrupt {
        owner: owner.to_string(),
        reason: format!("{}: {e}", path.display()),
    })
}

fn write_json_atomic<T: serde::Serialize + ?Sized>(path: &Path, value: &T) -> Result<(), StoreError> {
    let json = serde_json::to_vec(value)
        .map_err(|e| StoreError::Storage(format!("Failed to serialize {}: {e}", path.display())))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json)
        .map_err(|e| StoreError::Storage(format!("Failed to write {}: {e}", tmp.display())))?;
    std::fs::rename(&tmp, path)
        .map_err(|e| StoreError::Storage(format!("Failed to replace {}: {e}", path.display())))
}

#[async_trait]
impl DocumentStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn initialize(&self, owner: &str) -> Result<(), StoreError> {
        self.read(owner, |_| ()).await
    }

    async fn add(&self, document: Document) -> Result<String, StoreError> {
        let owner = document.owner.clone();
        let dimension = self.dimension;
        self.mutate(&owner, |c| c.insert(document, dimension).map(|id| (id, true)))
            .await
    }

    async fn search(&self, query: &[f32], owner: &str, top_k: usize, min_score: f32) -> Result<Vec<SearchResult>, StoreError> {
        self.read(owner, |c| c.search(query, top_k, min_score)).await?
    }

    async fn list(&self, owner: &str, limit: usize) -> Result<Vec<Document>, StoreError> {
        self.read(owner, |c| c.list(limit)).await
    }

    async fn get(&self, id: &str, owner: &str) -> Result<Option<Document>, StoreError> {
        self.read(owner, |c| c.get(id)).await
    }

    async fn delete(&self, id: &str, owner: &str) -> Result<bool, StoreError> {
        self.mutate(owner, |c| {
            let removed = c.remove(id);
            Ok((removed, removed))
        })
        .await
    }

    async fn clear(&self, owner: &str) -> Result<usize, StoreError> {
        self.mutate(owner, |c| {
            let removed = c.clear();
            Ok((removed, removed > 0))
        })
        .await
    }

    async fn stats(&self, owner: &str) -> Result<StoreStats, StoreError> {
        let mut stats = self.read(owner, OwnerCollection::stats).await?;
        stats.storage_path = Some(self.owner_dir(owner).display().to_string());
        Ok(stats)
    }
}

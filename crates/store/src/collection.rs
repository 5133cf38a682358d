//! One owner's documents and vectors, held together as a single unit.
//!
//! Every backend keeps (or rebuilds) an `OwnerCollection` per owner so id
//! assignment, dimension checks, and ranking behave the same everywhere.

use crate::vector;
use chrono::{DateTime, Utc};
use ragroute_core::{Document, SearchResult, StoreError, StoreStats};
use sha2::{Digest, Sha256};

/// Length of generated document ids, in hex characters.
pub const ID_LEN: usize = 12;

/// Derive an id from content and timestamp. `attempt` disambiguates
/// collisions inside one owner's namespace.
pub fn generate_id(content: &str, at: DateTime<Utc>, attempt: u32) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hasher.update(at.to_rfc3339().as_bytes());
    if attempt > 0 {
        hasher.update(attempt.to_le_bytes());
    }
    let digest = format!("{:x}", hasher.finalize());
    digest[..ID_LEN].to_string()
}

/// Reject owner keys that cannot safely name a namespace on disk.
pub fn validate_owner(owner: &str) -> Result<(), StoreError> {
    let ok = !owner.is_empty()
        && owner.len() <= 128
        && owner
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '-' | '_' | '.' | '@'))
        && owner != "."
        && owner != "..";
    if ok {
        Ok(())
    } else {
        Err(StoreError::InvalidOwner(owner.to_string()))
    }
}

/// Check a vector against an expected length, if one is known.
pub fn check_dimension(embedding: &[f32], expected: Option<usize>) -> Result<(), StoreError> {
    match expected {
        Some(expected) if embedding.len() != expected => Err(StoreError::DimensionMismatch {
            expected,
            actual: embedding.len(),
        }),
        _ => Ok(()),
    }
}

#[derive(Debug, Clone, Default)]
pub struct OwnerCollection {
    documents: Vec<Document>,
    /// Vector length fixed by the first stored embedding
    dimension: Option<usize>,
}

impl OwnerCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild from persisted documents (embeddings already attached).
    pub fn from_documents(documents: Vec<Document>) -> Self {
        let dimension = documents
            .iter()
            .find_map(|d| d.embedding.as_ref().map(Vec::len));
        Self {
            documents,
            dimension,
        }
    }

    pub fn documents(&self) -> &[Document] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    fn contains(&self, id: &str) -> bool {
        self.documents.iter().any(|d| d.id == id)
    }

    /// Append a document, assigning an id when it has none.
    ///
    /// `configured_dim` wins over the collection's own dimension.
    pub fn insert(&mut self, mut document: Document, configured_dim: Option<usize>) -> Result<String, StoreError> {
        if let Some(embedding) = &document.embedding {
            check_dimension(embedding, configured_dim.or(self.dimension))?;
        }

        if document.id.is_empty() {
            let mut attempt = 0;
            loop {
                let candidate = generate_id(&document.content, document.created_at, attempt);
                if !self.contains(&candidate) {
                    document.id = candidate;
                    break;
                }
                attempt += 1;
            }
        } else if self.contains(&document.id) {
            return Err(StoreError::DuplicateId(document.id));
        }

        if self.dimension.is_none() {
            self.dimension = document.embedding.as_ref().map(Vec::len);
        }

        let id = document.id.clone();
        self.documents.push(document);
        Ok(id)
    }

    pub fn search(&self, query: &[f32], top_k: usize, min_score: f32) -> Result<Vec<SearchResult>, StoreError> {
        check_dimension(query, self.dimension)?;
        Ok(vector::rank_by_similarity(&self.documents, query, top_k, min_score))
    }

    pub fn list(&self, limit: usize) -> Vec<Document> {
        self.documents.iter().take(limit).cloned().collect()
    }

    pub fn get(&self, id: &str) -> Option<Document> {
        self.documents.iter().find(|d| d.id == id).cloned()
    }

    pub fn remove(&mut self, id: &str) -> bool {
        let before = self.documents.len();
        self.documents.retain(|d| d.id != id);
        if self.documents.is_empty() {
            self.dimension = None;
        }
        self.documents.len() < before
    }

    /// Drop everything. Returns how many documents were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.documents.len();
        self.documents.clear();
        self.dimension = None;
        removed
    }

    pub fn stats(&self) -> StoreStats {
        let mut stats = StoreStats {
            total: self.documents.len(),
            ..Default::default()
        };
        for doc in &self.documents {
            *stats.by_source.entry(doc.source).or_insert(0) += 1;
            if doc.embedding.is_some() {
                stats.embedding_count += 1;
            }
        }
        stats
    }
}

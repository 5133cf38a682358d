//! Document store trait: per-owner documents with vector similarity search.
//!
//! Every operation is scoped by an owner key. Owners never see each
//! other's documents, and an owner that was never initialized behaves as
//! if it holds zero documents.

use crate::error::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Owner key used when a caller does not name one.
pub const DEFAULT_OWNER: &str = "default";

/// Where a document came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocumentSource {
    #[default]
    Manual,
    File,
    Web,
    Conversation,
}

impl DocumentSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentSource::Manual => "manual",
            DocumentSource::File => "file",
            DocumentSource::Web => "web",
            DocumentSource::Conversation => "conversation",
        }
    }
}

impl std::fmt::Display for DocumentSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DocumentSource {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "manual" => Ok(DocumentSource::Manual),
            "file" => Ok(DocumentSource::File),
            "web" => Ok(DocumentSource::Web),
            "conversation" => Ok(DocumentSource::Conversation),
            other => Err(format!(
                "unknown document source '{other}' (expected manual, file, web or conversation)"
            )),
        }
    }
}

/// A stored piece of text and its vector.
///
/// Documents are immutable once stored; the only lifecycle transitions are
/// add and delete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    /// Unique within the owner's namespace. Empty means "assign one on add".
    #[serde(default)]
    pub id: String,

    /// The text content
    pub content: String,

    /// Owner (user) namespace
    pub owner: String,

    /// Where the content came from
    #[serde(default)]
    pub source: DocumentSource,

    /// Free-form string-keyed metadata
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub metadata: HashMap<String, serde_json::Value>,

    /// When the document was added
    pub created_at: DateTime<Utc>,

    /// Vector for similarity search. Persisted separately from the
    /// document list, so it never appears in the serialized form.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,
}

impl Document {
    /// Create an unsaved document with no id and no embedding.
    pub fn new(content: impl Into<String>, owner: impl Into<String>, source: DocumentSource) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            owner: owner.into(),
            source,
            metadata: HashMap::new(),
            created_at: Utc::now(),
            embedding: None,
        }
    }

    pub fn with_embedding(mut self, embedding: Vec<f32>) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl Into<serde_json::Value>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// The first `max_chars` characters, with an ellipsis when cut.
    pub fn preview(&self, max_chars: usize) -> String {
        let mut chars = self.content.chars();
        let head: String = chars.by_ref().take(max_chars).collect();
        if chars.next().is_some() {
            format!("{head}...")
        } else {
            head
        }
    }
}

/// A document paired with its cosine similarity to the query vector.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    pub document: Document,
    /// Cosine similarity clamped to [0, 1]
    pub score: f32,
}

/// Per-owner counters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreStats {
    pub total: usize,
    pub by_source: BTreeMap<DocumentSource, usize>,
    pub embedding_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
}

/// The document store capability.
///
/// Implementations: in-memory, file-backed (JSON per owner), SQLite.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// The backend name (e.g., "memory", "file", "sqlite").
    fn name(&self) -> &str;

    /// Prepare an owner's namespace. Idempotent.
    async fn initialize(&self, owner: &str) -> std::result::Result<(), StoreError>;

    /// Store a document, assigning an id when it has none. Returns the id.
    async fn add(&self, document: Document) -> std::result::Result<String, StoreError>;

    /// The `top_k` most similar documents scoring at least `min_score`,
    /// best first.
    async fn search(
        &self,
        query: &[f32],
        owner: &str,
        top_k: usize,
        min_score: f32,
    ) -> std::result::Result<Vec<SearchResult>, StoreError>;

    /// Documents in insertion order, truncated to `limit`.
    async fn list(&self, owner: &str, limit: usize) -> std::result::Result<Vec<Document>, StoreError>;

    async fn get(&self, id: &str, owner: &str) -> std::result::Result<Option<Document>, StoreError>;

    /// Returns whether a document was removed.
    async fn delete(&self, id: &str, owner: &str) -> std::result::Result<bool, StoreError>;

    /// Remove every document of the owner. Returns how many were removed.
    async fn clear(&self, owner: &str) -> std::result::Result<usize, StoreError>;

    async fn stats(&self, owner: &str) -> std::result::Result<StoreStats, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embedding_is_not_serialized() {
        let doc = Document::new("Paris is the capital of France", "u1", DocumentSource::Web)
            .with_embedding(vec![0.1, 0.2])
            .with_metadata("title", "Paris");
        let json = serde_json::to_string(&doc).unwrap();
        assert!(json.contains(r#""source":"web""#));
        assert!(json.contains("Paris"));
        assert!(!json.contains("embedding"));

        let back: Document = serde_json::from_str(&json).unwrap();
        assert!(back.embedding.is_none());
        assert_eq!(back.owner, "u1");
    }

    #[test]
    fn source_parses_case_insensitively() {
        assert_eq!("FILE".parse::<DocumentSource>().unwrap(), DocumentSource::File);
        assert!("email".parse::<DocumentSource>().is_err());
    }

    #[test]
    fn preview_truncates_on_char_boundary() {
        let doc = Document::new("año ñandú", "u1", DocumentSource::Manual);
        assert_eq!(doc.preview(3), "año...");
        assert_eq!(doc.preview(50), "año ñandú");
    }

    #[test]
    fn stats_serialize_sources_as_keys() {
        let mut stats = StoreStats::default();
        stats.by_source.insert(DocumentSource::File, 2);
        stats.total = 2;
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["by_source"]["file"], 2);
        assert!(json.get("storage_path").is_none());
    }
}

//! External knowledge sources consulted when local retrieval is weak.

use crate::error::KnowledgeError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// One normalized hit from an external reference source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeItem {
    pub title: String,
    pub content: String,
    /// URL of the page the content came from
    pub source: String,
    /// Source family, e.g. "wikipedia"
    pub kind: String,
}

/// A searchable reference source (Wikipedia, an intranet wiki, ...).
#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    fn name(&self) -> &str;

    /// Look up a single search term. An empty list means "no usable result".
    async fn search(&self, term: &str) -> Result<Vec<KnowledgeItem>, KnowledgeError>;
}

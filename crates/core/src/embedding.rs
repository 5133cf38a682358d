//! Embedder trait and the table of supported embedding models.

use crate::error::EmbeddingError;
use async_trait::async_trait;
use serde::Serialize;

/// A named embedding model with a fixed output dimensionality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct EmbeddingModel {
    /// Short config alias (e.g., "minilm")
    pub alias: &'static str,
    /// Full model identifier
    pub model_id: &'static str,
    pub dimension: usize,
}

pub const KNOWN_MODELS: [EmbeddingModel; 4] = [
    EmbeddingModel {
        alias: "minilm",
        model_id: "sentence-transformers/all-MiniLM-L6-v2",
        dimension: 384,
    },
    EmbeddingModel {
        alias: "mpnet",
        model_id: "sentence-transformers/all-mpnet-base-v2",
        dimension: 768,
    },
    EmbeddingModel {
        alias: "e5",
        model_id: "intfloat/multilingual-e5-large",
        dimension: 1024,
    },
    EmbeddingModel {
        alias: "bge",
        model_id: "BAAI/bge-large-en-v1.5",
        dimension: 1024,
    },
];

impl EmbeddingModel {
    /// Look a model up by alias or full identifier.
    pub fn lookup(name: &str) -> Result<EmbeddingModel, EmbeddingError> {
        let wanted = name.trim();
        KNOWN_MODELS
            .into_iter()
            .find(|m| m.alias.eq_ignore_ascii_case(wanted) || m.model_id == wanted)
            .ok_or_else(|| EmbeddingError::UnknownModel(name.to_string()))
    }
}

/// Turns text into fixed-length vectors.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Identifier of the underlying model.
    fn model_id(&self) -> &str;

    /// Length of every vector this embedder returns.
    fn dimension(&self) -> usize;

    /// Encode many texts, one vector per input, in input order.
    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError>;

    /// Encode a single text.
    async fn encode(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut vectors = self.encode_batch(&[text.to_string()]).await?;
        vectors
            .pop()
            .ok_or_else(|| EmbeddingError::EncodeFailed("encoder returned no vectors".into()))
    }
}

//! Error types for the ragroute domain.
//!
//! One enum per bounded context, folded into [`Error`] with `#[from]`.

use thiserror::Error;

/// The top-level error type for ragroute operations.
#[derive(Debug, Error)]
pub enum Error {
    // --- Store errors ---
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    // --- Embedding errors ---
    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    // --- Provider errors ---
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    // --- Knowledge source errors ---
    #[error("Knowledge source error: {0}")]
    Knowledge(#[from] KnowledgeError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    // --- Serialization ---
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Persisted state for owner '{owner}' is corrupt: {reason}")]
    Corrupt { owner: String, reason: String },

    #[error("Invalid owner key: {0:?}")]
    InvalidOwner(String),

    #[error("Embedding has {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Document id already exists: {0}")]
    DuplicateId(String),

    #[error("Query failed: {0}")]
    QueryFailed(String),

    #[error("Migration failed: {0}")]
    MigrationFailed(String),
}

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("Unknown embedding model: {0}")]
    UnknownModel(String),

    #[error("Failed to load embedding model: {0}")]
    ModelLoad(String),

    #[error("Encoding failed: {0}")]
    EncodeFailed(String),

    #[error("Encoder returned {actual} dimensions, expected {expected}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Embedding backend error: {0}")]
    Provider(#[from] ProviderError),
}

#[derive(Debug, Clone, Error)]
pub enum ProviderError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by provider, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Network error: {0}")]
    Network(String),
}

#[derive(Debug, Clone, Error)]
pub enum KnowledgeError {
    #[error("Knowledge source unreachable: {0}")]
    Network(String),

    #[error("Knowledge source timed out: {0}")]
    Timeout(String),

    #[error("Unexpected response from knowledge source: {0}")]
    InvalidResponse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_error_displays_correctly() {
        let err = Error::Provider(ProviderError::ApiError {
            status_code: 503,
            message: "model loading".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("model loading"));
    }

    #[test]
    fn store_error_converts_into_top_level() {
        let err: Error = StoreError::DimensionMismatch {
            expected: 384,
            actual: 3,
        }
        .into();
        assert!(matches!(err, Error::Store(_)));
        assert!(err.to_string().contains("384"));
    }

    #[test]
    fn corrupt_error_names_owner() {
        let err = StoreError::Corrupt {
            owner: "alice".into(),
            reason: "2 documents but 1 vector rows".into(),
        };
        assert!(err.to_string().contains("alice"));
    }
}

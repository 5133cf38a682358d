//! # ragroute core
//!
//! Domain types, collaborator traits, and error definitions for the
//! ragroute query router. Every other crate depends inward on this one.
//!
//! Each collaborator the router talks to is a trait here:
//! - [`DocumentStore`]: per-owner documents with cosine search
//! - [`Embedder`]: text to fixed-length vectors
//! - [`Provider`]: chat completion against a language model
//! - [`KnowledgeSource`]: external reference lookups used on escalation
//!
//! Implementations live in their own crates and tests swap in mocks.

pub mod classification;
pub mod document;
pub mod embedding;
pub mod error;
pub mod knowledge;
pub mod message;
pub mod provider;

pub use classification::{Category, ClassificationResult, Strategy};
pub use document::{DEFAULT_OWNER, Document, DocumentSource, DocumentStore, SearchResult, StoreStats};
pub use embedding::{Embedder, EmbeddingModel, KNOWN_MODELS};
pub use error::{EmbeddingError, Error, KnowledgeError, ProviderError, Result, StoreError};
pub use knowledge::{KnowledgeItem, KnowledgeSource};
pub use message::{Message, Role};
pub use provider::{EmbeddingRequest, EmbeddingResponse, Provider, ProviderRequest, ProviderResponse, Usage};

//! Language model and embedding backends for ragroute.
//!
//! The chat client implements `ragroute_core::Provider`; encoders implement
//! `ragroute_core::Embedder` and are reached through [`EmbeddingHandle`].

pub mod builder;
pub mod embedding;
#[cfg(feature = "local")]
pub mod local;
pub mod openai_compat;

pub use builder::{build_embedding_handle, build_llm};
pub use embedding::{EmbedderFactory, EmbeddingHandle, HashingEmbedder, RemoteEmbedder};
#[cfg(feature = "local")]
pub use local::FastEmbedder;
pub use openai_compat::OpenAiCompatProvider;

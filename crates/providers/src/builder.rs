//! Build the language model client and embedding handle from configuration.

use crate::embedding::EmbeddingHandle;
use crate::openai_compat::OpenAiCompatProvider;
use ragroute_config::{AppConfig, EmbeddingBackend, LlmConfig};
use ragroute_core::error::{EmbeddingError, ProviderError};
use ragroute_core::provider::Provider;
use ragroute_core::{Embedder, EmbeddingModel};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// The chat-completion client for `[llm]`.
pub fn build_llm(config: &LlmConfig) -> Result<Arc<dyn Provider>, ProviderError> {
    let provider = OpenAiCompatProvider::new(
        &config.provider,
        &config.api_url,
        config.api_key.clone(),
        Duration::from_secs(config.timeout_secs),
    )?;
    info!(provider = %config.provider, url = %config.api_url, model = %config.model, "Language model configured");
    Ok(Arc::new(provider))
}

/// The embedding handle for `[embedding]`. Nothing is loaded here.
pub fn build_embedding_handle(config: &AppConfig) -> Result<EmbeddingHandle, EmbeddingError> {
    let model = EmbeddingModel::lookup(&config.embedding.model)?;

    let handle = match config.embedding.backend {
        EmbeddingBackend::Local => local_handle(model, config)?,
        EmbeddingBackend::Hashing => {
            warn!("Using the hashing encoder: vectors carry no semantic similarity");
            EmbeddingHandle::hashing(model)
        }
        EmbeddingBackend::Remote => {
            let url = config
                .embedding
                .api_url
                .as_deref()
                .unwrap_or(&config.llm.api_url);
            let provider = OpenAiCompatProvider::new(
                "embeddings",
                url,
                config.llm.api_key.clone(),
                Duration::from_secs(config.llm.timeout_secs),
            )?;
            EmbeddingHandle::remote(model, Arc::new(provider))
        }
    };

    info!(
        model = %handle.model_id(),
        dimension = model.dimension,
        backend = handle.backend(),
        "Embedding handle configured"
    );
    Ok(handle)
}

#[cfg(feature = "local")]
fn local_handle(model: EmbeddingModel, config: &AppConfig) -> Result<EmbeddingHandle, EmbeddingError> {
    Ok(EmbeddingHandle::local(model, config.embedding.cache_dir.clone()))
}

#[cfg(not(feature = "local"))]
fn local_handle(_model: EmbeddingModel, _config: &AppConfig) -> Result<EmbeddingHandle, EmbeddingError> {
    Err(EmbeddingError::ModelLoad(
        "built without the `local` feature; set embedding.backend to \"hashing\" or \"remote\"".into(),
    ))
}

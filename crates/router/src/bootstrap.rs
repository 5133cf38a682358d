//! Wire a router from configuration.

use crate::router::{RetrievalRouter, RouterConfig};
use ragroute_config::AppConfig;
use ragroute_core::{Embedder, EmbeddingError, Provider, Result};
use ragroute_knowledge::{Escalator, WikipediaSource};
use ragroute_providers::{EmbeddingHandle, build_embedding_handle, build_llm};
use ragroute_store::build_store;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// The shared resources behind one running service.
pub struct Runtime {
    pub router: Arc<RetrievalRouter>,
    pub embeddings: Arc<EmbeddingHandle>,
    pub llm: Arc<dyn Provider>,
}

impl Runtime {
    /// Build the language model client, embedding handle, store, and
    /// knowledge source named by `config`, and a router over them.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let llm = build_llm(&config.llm)?;
        let embeddings = Arc::new(build_embedding_handle(config)?);
        if config.embedding.preload {
            // A local model may download and load for a while
            let handle = embeddings.clone();
            tokio::task::spawn_blocking(move || handle.preload())
                .await
                .map_err(|e| EmbeddingError::ModelLoad(format!("preload task failed: {e}")))??;
        }

        let store = build_store(&config.storage, Some(embeddings.model().dimension)).await?;

        let mut router = RetrievalRouter::new(store.clone(), embeddings.clone(), llm.clone())
            .with_config(RouterConfig::from_app(config));
        if config.knowledge.enabled {
            let source = WikipediaSource::new(
                &config.knowledge.language,
                Duration::from_secs(config.knowledge.timeout_secs),
            )?;
            router = router
                .with_escalator(Escalator::new(Arc::new(source)).with_max_items(config.knowledge.max_items));
        }

        info!(
            store = store.name(),
            llm = llm.name(),
            embedding_model = %embeddings.model_id(),
            embedding_backend = embeddings.backend(),
            knowledge = config.knowledge.enabled,
            "Router ready"
        );

        Ok(Self {
            router: Arc::new(router),
            embeddings,
            llm,
        })
    }

    /// A runtime over explicit parts, for tests and embedding.
    pub fn from_parts(router: RetrievalRouter, embeddings: Arc<EmbeddingHandle>, llm: Arc<dyn Provider>) -> Self {
        Self {
            router: Arc::new(router),
            embeddings,
            llm,
        }
    }
}

impl std::fmt::Debug for Runtime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runtime")
            .field("llm", &self.llm.name())
            .field("embedding_model", &self.embeddings.model_id())
            .field("embedding_backend", &self.embeddings.backend())
            .field("store", &self.router.store().name())
            .finish()
    }
}

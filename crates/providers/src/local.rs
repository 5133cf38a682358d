//! In-process sentence embeddings through fastembed's ONNX models.
//!
//! Enabled by the `local` feature. Model files are downloaded on first load
//! into `embedding.cache_dir` (fastembed's own default when unset).

use async_trait::async_trait;
use fastembed::{InitOptions, TextEmbedding};
use ragroute_core::error::EmbeddingError;
use ragroute_core::{Embedder, EmbeddingModel};
use std::path::PathBuf;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, info};

/// fastembed's model for one of the known aliases.
pub fn fastembed_model(model: &EmbeddingModel) -> Result<fastembed::EmbeddingModel, EmbeddingError> {
    match model.alias {
        "minilm" => Ok(fastembed::EmbeddingModel::AllMiniLML6V2),
        "mpnet" => Ok(fastembed::EmbeddingModel::AllMpnetBaseV2),
        "e5" => Ok(fastembed::EmbeddingModel::MultilingualE5Large),
        "bge" => Ok(fastembed::EmbeddingModel::BGELargeENV15),
        other => Err(EmbeddingError::UnknownModel(other.to_string())),
    }
}

pub struct FastEmbedder {
    model: EmbeddingModel,
    engine: Arc<Mutex<TextEmbedding>>,
}

impl FastEmbedder {
    /// Load (downloading if needed) the ONNX model for `model`. Blocking.
    pub fn load(model: EmbeddingModel, cache_dir: Option<PathBuf>) -> Result<Self, EmbeddingError> {
        let mut options = InitOptions::new(fastembed_model(&model)?).with_show_download_progress(false);
        if let Some(dir) = cache_dir {
            options = options.with_cache_dir(dir);
        }

        let engine = TextEmbedding::try_new(options).map_err(|e| EmbeddingError::ModelLoad(e.to_string()))?;
        info!(model = model.model_id, dimension = model.dimension, "fastembed model ready");

        Ok(Self {
            model,
            engine: Arc::new(Mutex::new(engine)),
        })
    }
}

#[async_trait]
impl Embedder for FastEmbedder {
    fn model_id(&self) -> &str {
        self.model.model_id
    }

    fn dimension(&self) -> usize {
        self.model.dimension
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(count = texts.len(), "Encoding with fastembed");

        let engine = self.engine.clone();
        let texts = texts.to_vec();
        // ONNX inference is CPU-bound
        tokio::task::spawn_blocking(move || {
            let mut engine = engine.lock().unwrap_or_else(PoisonError::into_inner);
            engine
                .embed(texts, None)
                .map_err(|e| EmbeddingError::EncodeFailed(e.to_string()))
        })
        .await
        .map_err(|e| EmbeddingError::EncodeFailed(format!("encoder task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragroute_core::embedding::KNOWN_MODELS;

    #[test]
    fn every_known_alias_maps_to_a_fastembed_model() {
        for model in KNOWN_MODELS {
            assert!(fastembed_model(&model).is_ok(), "{} has no fastembed model", model.alias);
        }
    }

    #[test]
    fn aliases_map_to_matching_models() {
        let minilm = EmbeddingModel::lookup("minilm").unwrap();
        assert!(matches!(
            fastembed_model(&minilm).unwrap(),
            fastembed::EmbeddingModel::AllMiniLML6V2
        ));
        let e5 = EmbeddingModel::lookup("e5").unwrap();
        assert!(matches!(
            fastembed_model(&e5).unwrap(),
            fastembed::EmbeddingModel::MultilingualE5Large
        ));
    }

    #[test]
    fn unknown_alias_rejected() {
        let custom = EmbeddingModel {
            alias: "custom",
            model_id: "custom",
            dimension: 8,
        };
        assert!(matches!(fastembed_model(&custom), Err(EmbeddingError::UnknownModel(_))));
    }
}

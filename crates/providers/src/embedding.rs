//! Embedding backends and the shared, lazily loaded embedding handle.
//!
//! [`EmbeddingHandle`] is built once at startup and passed around by `Arc`.
//! The underlying encoder is created on first use (or by `preload`) under a
//! mutex, so concurrent first requests never load it twice.
//!
//! Backends: `local` (fastembed, behind the `local` feature), `remote`
//! (an OpenAI-compatible `/embeddings` endpoint), and `hashing`, a
//! dependency-free encoder for offline runs and tests.

use async_trait::async_trait;
use ragroute_core::error::EmbeddingError;
use ragroute_core::provider::{EmbeddingRequest, Provider};
use ragroute_core::{Embedder, EmbeddingModel};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tracing::{debug, info};

/// Builds the real encoder when the handle is first used.
pub type EmbedderFactory = Box<dyn Fn() -> Result<Arc<dyn Embedder>, EmbeddingError> + Send + Sync>;

pub struct EmbeddingHandle {
    model: EmbeddingModel,
    id: String,
    backend: &'static str,
    factory: EmbedderFactory,
    loaded: RwLock<Option<Arc<dyn Embedder>>>,
    init: Mutex<()>,
    loads: AtomicUsize,
}

impl EmbeddingHandle {
    /// A handle over a caller-supplied encoder factory.
    pub fn new(model: EmbeddingModel, factory: EmbedderFactory) -> Self {
        Self::with_identity(model, model.model_id.to_string(), "custom", factory)
    }

    fn with_identity(model: EmbeddingModel, id: String, backend: &'static str, factory: EmbedderFactory) -> Self {
        Self {
            model,
            id,
            backend,
            factory,
            loaded: RwLock::new(None),
            init: Mutex::new(()),
            loads: AtomicUsize::new(0),
        }
    }

    /// A handle running `model` in-process through fastembed.
    #[cfg(feature = "local")]
    pub fn local(model: EmbeddingModel, cache_dir: Option<std::path::PathBuf>) -> Self {
        Self::with_identity(
            model,
            model.model_id.to_string(),
            "local",
            Box::new(move || {
                let embedder = crate::local::FastEmbedder::load(model, cache_dir.clone())?;
                Ok(Arc::new(embedder) as Arc<dyn Embedder>)
            }),
        )
    }

    /// A handle backed by the feature-hashing encoder, sized like `model`.
    ///
    /// Reports itself as `hashing-<dimension>`: its vectors are not
    /// comparable with those of any sentence model.
    pub fn hashing(model: EmbeddingModel) -> Self {
        let id = format!("hashing-{}", model.dimension);
        let encoder_id = id.clone();
        Self::with_identity(
            model,
            id,
            "hashing",
            Box::new(move || Ok(Arc::new(HashingEmbedder::new(encoder_id.clone(), model.dimension)) as Arc<dyn Embedder>)),
        )
    }

    /// A handle that encodes through a provider's `/embeddings` endpoint.
    pub fn remote(model: EmbeddingModel, provider: Arc<dyn Provider>) -> Self {
        Self::with_identity(
            model,
            model.model_id.to_string(),
            "remote",
            Box::new(move || Ok(Arc::new(RemoteEmbedder::new(provider.clone(), model)) as Arc<dyn Embedder>)),
        )
    }

    /// Which encoder family produces the vectors (local, hashing, remote, custom).
    pub fn backend(&self) -> &'static str {
        self.backend
    }

    pub fn model(&self) -> EmbeddingModel {
        self.model
    }

    /// Return the encoder, loading it on first call.
    pub fn get(&self) -> Result<Arc<dyn Embedder>, EmbeddingError> {
        if let Some(embedder) = self.cached() {
            return Ok(embedder);
        }

        let _init = self.init.lock().unwrap_or_else(PoisonError::into_inner);
        // Another caller may have finished loading while we waited.
        if let Some(embedder) = self.cached() {
            return Ok(embedder);
        }

        info!(model = %self.id, backend = self.backend, dimension = self.model.dimension, "Loading embedding model");
        let embedder = (self.factory)()?;
        if embedder.dimension() != self.model.dimension {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.model.dimension,
                actual: embedder.dimension(),
            });
        }
        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = Some(embedder.clone());
        self.loads.fetch_add(1, Ordering::SeqCst);
        Ok(embedder)
    }

    fn cached(&self) -> Option<Arc<dyn Embedder>> {
        self.loaded.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Load the encoder now instead of on the first request.
    pub fn preload(&self) -> Result<(), EmbeddingError> {
        self.get().map(|_| ())
    }

    pub fn is_loaded(&self) -> bool {
        self.cached().is_some()
    }

    /// How many times the factory has produced an encoder.
    pub fn load_count(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    /// Drop the loaded encoder. Used to isolate tests.
    pub fn reset(&self) {
        *self.loaded.write().unwrap_or_else(PoisonError::into_inner) = None;
        debug!(model = %self.id, "Embedding model unloaded");
    }
}

#[async_trait]
impl Embedder for EmbeddingHandle {
    fn model_id(&self) -> &str {
        &self.id
    }

    fn dimension(&self) -> usize {
        self.model.dimension
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        let vectors = self.get()?.encode_batch(texts).await?;
        if vectors.len() != texts.len() {
            return Err(EmbeddingError::EncodeFailed(format!(
                "{} inputs produced {} vectors",
                texts.len(),
                vectors.len()
            )));
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != self.model.dimension) {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.model.dimension,
                actual: bad.len(),
            });
        }
        Ok(vectors)
    }
}

// ── Hashing encoder ─────────────────────────────────────────────────────────

/// Deterministic local encoder: signed feature hashing of word tokens and
/// character trigrams, L2-normalized.
///
/// Texts sharing vocabulary land close together; it needs no model files.
pub struct HashingEmbedder {
    model_id: String,
    dimension: usize,
}

const FNV_OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
    bytes
        .iter()
        .fold(FNV_OFFSET, |hash, b| (hash ^ u64::from(*b)).wrapping_mul(FNV_PRIME))
}

impl HashingEmbedder {
    pub fn new(model_id: impl Into<String>, dimension: usize) -> Self {
        Self {
            model_id: model_id.into(),
            dimension: dimension.max(1),
        }
    }

    fn add_feature(&self, vector: &mut [f32], feature: &str, weight: f32) {
        let hash = fnv1a(feature.as_bytes());
        let bucket = (hash % self.dimension as u64) as usize;
        let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
        vector[bucket] += sign * weight;
    }

    pub fn encode_text(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];
        let lowered = text.to_lowercase();

        for token in lowered.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            self.add_feature(&mut vector, token, 1.0);

            let padded: Vec<char> = format!("#{token}#").chars().collect();
            for window in padded.windows(3) {
                let trigram: String = window.iter().collect();
                self.add_feature(&mut vector, &trigram, 0.5);
            }
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut vector {
                *x /= norm;
            }
        }
        vector
    }
}

#[async_trait]
impl Embedder for HashingEmbedder {
    fn model_id(&self) -> &str {
        &self.model_id
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts.iter().map(|t| self.encode_text(t)).collect())
    }
}

// ── Remote encoder ──────────────────────────────────────────────────────────

/// Encodes through an OpenAI-compatible `/embeddings` endpoint.
pub struct RemoteEmbedder {
    provider: Arc<dyn Provider>,
    model: EmbeddingModel,
}

impl RemoteEmbedder {
    pub fn new(provider: Arc<dyn Provider>, model: EmbeddingModel) -> Self {
        Self { provider, model }
    }
}

#[async_trait]
impl Embedder for RemoteEmbedder {
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
        let response = self
            .provider
            .embed(EmbeddingRequest {
                model: self.model.model_id.to_string(),
                inputs: texts.to_vec(),
            })
            .await?;
        Ok(response.embeddings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragroute_core::error::ProviderError;
    use ragroute_core::provider::{EmbeddingResponse, ProviderRequest, ProviderResponse};
    use std::sync::Barrier;
    use std::time::Duration;

    fn minilm() -> EmbeddingModel {
        EmbeddingModel::lookup("minilm").unwrap()
    }

    fn cosine(a: &[f32], b: &[f32]) -> f32 {
        a.iter().zip(b).map(|(x, y)| x * y).sum()
    }

    #[tokio::test]
    async fn hashing_is_deterministic_and_normalized() {
        let embedder = HashingEmbedder::new("test", 384);
        let a = embedder.encode("La capital de Francia es París").await.unwrap();
        let b = embedder.encode("La capital de Francia es París").await.unwrap();
        assert_eq!(a.len(), 384);
        assert_eq!(a, b);
        let norm: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
        assert!((norm - 1.0).abs() < 1e-5);
    }

    #[tokio::test]
    async fn hashing_ranks_related_text_closer() {
        let embedder = HashingEmbedder::new("test", 384);
        let query = embedder.encode("capital de Francia").await.unwrap();
        let related = embedder.encode("París es la capital de Francia").await.unwrap();
        let unrelated = embedder.encode("receta de tortilla de patatas").await.unwrap();
        assert!(cosine(&query, &related) > cosine(&query, &unrelated));
    }

    #[tokio::test]
    async fn hashing_empty_text_is_zero_vector() {
        let embedder = HashingEmbedder::new("test", 8);
        let v = embedder.encode("  ¿?  ").await.unwrap();
        assert!(v.iter().all(|x| *x == 0.0));
    }

    #[tokio::test]
    async fn handle_loads_lazily_once() {
        let handle = EmbeddingHandle::hashing(minilm());
        assert!(!handle.is_loaded());

        handle.encode("hola").await.unwrap();
        handle.encode("adiós").await.unwrap();
        assert!(handle.is_loaded());
        assert_eq!(handle.load_count(), 1);
    }

    #[test]
    fn concurrent_first_use_loads_once() {
        let factory_calls = Arc::new(AtomicUsize::new(0));
        let calls = factory_calls.clone();
        let handle = EmbeddingHandle::new(
            minilm(),
            Box::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                // Hold the load open so every caller arrives while it runs
                std::thread::sleep(Duration::from_millis(100));
                Ok(Arc::new(HashingEmbedder::new("slow", 384)) as Arc<dyn Embedder>)
            }),
        );

        let start = Barrier::new(8);
        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    start.wait();
                    handle.get().unwrap();
                });
            }
        });

        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.load_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_encodes_share_one_load() {
        let factory_calls = Arc::new(AtomicUsize::new(0));
        let calls = factory_calls.clone();
        let handle = Arc::new(EmbeddingHandle::new(
            minilm(),
            Box::new(move || {
                calls.fetch_add(1, Ordering::SeqCst);
                std::thread::sleep(Duration::from_millis(50));
                Ok(Arc::new(HashingEmbedder::new("slow", 384)) as Arc<dyn Embedder>)
            }),
        ));

        let mut tasks = Vec::new();
        for i in 0..8 {
            let handle = handle.clone();
            tasks.push(tokio::spawn(async move { handle.encode(&format!("query {i}")).await }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap().unwrap().len(), 384);
        }
        assert_eq!(factory_calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn hashing_handle_does_not_claim_a_sentence_model() {
        let handle = EmbeddingHandle::hashing(minilm());
        assert_eq!(handle.model_id(), "hashing-384");
        assert_eq!(handle.backend(), "hashing");
        assert_eq!(handle.dimension(), 384);
        assert_eq!(handle.get().unwrap().model_id(), "hashing-384");
    }

    #[test]
    fn remote_handle_reports_model_id() {
        let handle = EmbeddingHandle::remote(minilm(), Arc::new(FixedEmbeddings { vectors: vec![] }));
        assert_eq!(handle.model_id(), "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(handle.backend(), "remote");
    }

    #[cfg(feature = "local")]
    #[test]
    fn local_handle_builds_without_loading() {
        let handle = EmbeddingHandle::local(minilm(), None);
        assert_eq!(handle.model_id(), "sentence-transformers/all-MiniLM-L6-v2");
        assert_eq!(handle.backend(), "local");
        assert!(!handle.is_loaded());
    }

    #[tokio::test]
    async fn reset_forces_reload() {
        let handle = EmbeddingHandle::hashing(minilm());
        handle.preload().unwrap();
        handle.reset();
        assert!(!handle.is_loaded());
        handle.preload().unwrap();
        assert_eq!(handle.load_count(), 2);
    }

    #[test]
    fn factory_with_wrong_dimension_rejected() {
        let handle = EmbeddingHandle::new(
            minilm(),
            Box::new(|| Ok(Arc::new(HashingEmbedder::new("tiny", 3)) as Arc<dyn Embedder>)),
        );
        assert!(matches!(
            handle.preload(),
            Err(EmbeddingError::DimensionMismatch { expected: 384, actual: 3 })
        ));
        assert!(!handle.is_loaded());
    }

    #[test]
    fn factory_failure_surfaces() {
        let handle = EmbeddingHandle::new(
            minilm(),
            Box::new(|| -> Result<Arc<dyn Embedder>, EmbeddingError> {
                Err(EmbeddingError::ModelLoad("weights missing".into()))
            }),
        );
        assert!(matches!(handle.preload(), Err(EmbeddingError::ModelLoad(_))));
    }

    struct FixedEmbeddings {
        vectors: Vec<Vec<f32>>,
    }

    #[async_trait]
    impl Provider for FixedEmbeddings {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
            Err(ProviderError::NotConfigured("chat not supported".into()))
        }

        async fn embed(&self, request: EmbeddingRequest) -> Result<EmbeddingResponse, ProviderError> {
            Ok(EmbeddingResponse {
                embeddings: self.vectors.clone(),
                model: request.model,
            })
        }
    }

    #[tokio::test]
    async fn remote_output_length_checked() {
        let model = EmbeddingModel {
            alias: "tiny",
            model_id: "tiny",
            dimension: 2,
        };
        let provider = Arc::new(FixedEmbeddings {
            vectors: vec![vec![1.0, 0.0, 0.0]],
        });
        let handle = EmbeddingHandle::remote(model, provider);
        let err = handle.encode("hola").await.unwrap_err();
        assert!(matches!(err, EmbeddingError::DimensionMismatch { expected: 2, actual: 3 }));
    }

    #[tokio::test]
    async fn remote_errors_convert() {
        let handle = EmbeddingHandle::remote(minilm(), Arc::new(FixedEmbeddings { vectors: vec![] }));
        // One input, zero vectors back
        assert!(matches!(
            handle.encode("hola").await,
            Err(EmbeddingError::EncodeFailed(_))
        ));
    }
}

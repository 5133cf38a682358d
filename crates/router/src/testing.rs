//! Scripted collaborators for router tests.
//!
//! Compiled for this crate's unit tests and, through the `test-util`
//! feature, for downstream integration tests.

use async_trait::async_trait;
use ragroute_core::{
    Embedder, EmbeddingError, KnowledgeError, KnowledgeItem, KnowledgeSource, Message, Provider,
    ProviderError, ProviderRequest, ProviderResponse, Role, Usage,
};
use std::collections::HashMap;
use std::sync::Mutex;

// ── Language model ──────────────────────────────────────────────────────────

/// Gives the same reply to every request and records what it was sent.
pub struct ScriptedProvider {
    reply: Result<String, ProviderError>,
    requests: Mutex<Vec<ProviderRequest>>,
}

impl ScriptedProvider {
    pub fn answering(text: &str) -> Self {
        Self {
            reply: Ok(text.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Every call fails as if the server were down.
    pub fn unreachable() -> Self {
        Self {
            reply: Err(ProviderError::Network("connection refused".into())),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ProviderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// System prompt of the most recent request, if it had one.
    pub fn last_system_prompt(&self) -> Option<String> {
        self.requests
            .lock()
            .unwrap()
            .last()?
            .messages
            .iter()
            .find(|m| m.role == Role::System)
            .map(|m| m.content.clone())
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: ProviderRequest) -> Result<ProviderResponse, ProviderError> {
        let model = request.model.clone();
        self.requests.lock().unwrap().push(request);
        let text = self.reply.clone()?;
        Ok(ProviderResponse {
            message: Message::assistant(text),
            usage: Some(Usage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            }),
            model,
        })
    }

    async fn health_check(&self) -> Result<bool, ProviderError> {
        Ok(self.reply.is_ok())
    }
}

// ── Knowledge source ────────────────────────────────────────────────────────

/// Returns fixed items for every term and counts lookups.
pub struct CountingSource {
    items: Vec<KnowledgeItem>,
    terms: Mutex<Vec<String>>,
}

impl CountingSource {
    pub fn with_items(items: Vec<KnowledgeItem>) -> Self {
        Self {
            items,
            terms: Mutex::new(Vec::new()),
        }
    }

    pub fn empty() -> Self {
        Self::with_items(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.terms.lock().unwrap().len()
    }

    pub fn terms(&self) -> Vec<String> {
        self.terms.lock().unwrap().clone()
    }
}

#[async_trait]
impl KnowledgeSource for CountingSource {
    fn name(&self) -> &str {
        "counting"
    }

    async fn search(&self, term: &str) -> Result<Vec<KnowledgeItem>, KnowledgeError> {
        self.terms.lock().unwrap().push(term.to_string());
        Ok(self.items.clone())
    }
}

pub fn item(title: &str, content: &str) -> KnowledgeItem {
    KnowledgeItem {
        title: title.to_string(),
        content: content.to_string(),
        source: format!("https://example.org/wiki/{}", title.replace(' ', "_")),
        kind: "wikipedia".to_string(),
    }
}

// ── Embedder ────────────────────────────────────────────────────────────────

/// Maps known texts to chosen vectors. Anything else gets the last axis.
pub struct FixedEmbedder {
    dimension: usize,
    vectors: HashMap<String, Vec<f32>>,
}

impl FixedEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            vectors: HashMap::new(),
        }
    }

    pub fn with(mut self, text: &str, vector: Vec<f32>) -> Self {
        self.vectors.insert(text.to_string(), vector);
        self
    }

    fn fallback(&self) -> Vec<f32> {
        let mut v = vec![0.0; self.dimension];
        if let Some(last) = v.last_mut() {
            *last = 1.0;
        }
        v
    }
}

#[async_trait]
impl Embedder for FixedEmbedder {
    fn model_id(&self) -> &str {
        "fixed"
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    async fn encode_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbeddingError> {
        Ok(texts
            .iter()
            .map(|t| self.vectors.get(t).cloned().unwrap_or_else(|| self.fallback()))
            .collect())
    }
}

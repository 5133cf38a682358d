//! The retrieval router: classify, pick a strategy, gather context, generate.

use crate::prompts;
use crate::stats::{StatsSnapshot, UsageStats};
use ragroute_classifier::QueryClassifier;
use ragroute_config::AppConfig;
use ragroute_core::{
    ClassificationResult, Document, DocumentSource, DocumentStore, Embedder, KnowledgeItem, Message,
    Provider, ProviderError, ProviderRequest, Result, SearchResult, Strategy,
};
use ragroute_knowledge::Escalator;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Prefix of every answer produced without the language model.
pub const DEGRADED_MARKER: &str = "[LLM unavailable]";

/// Tunables for one router instance.
#[derive(Debug, Clone)]
pub struct RouterConfig {
    pub local_top_k: usize,
    /// Escalate when the best local score is below this.
    pub escalation_threshold: f32,
    pub min_score: f32,
    /// Score attached to knowledge-source hits.
    pub web_source_score: f32,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub cache_web_results: bool,
    pub log_conversations: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self::from_app(&AppConfig::default())
    }
}

impl RouterConfig {
    pub fn from_app(config: &AppConfig) -> Self {
        Self {
            local_top_k: config.routing.local_top_k,
            escalation_threshold: config.routing.escalation_threshold,
            min_score: config.routing.min_score,
            web_source_score: config.routing.web_source_score,
            model: config.llm.model.clone(),
            max_tokens: config.llm.max_tokens,
            temperature: config.llm.temperature,
            cache_web_results: config.routing.cache_web_results,
            log_conversations: config.routing.log_conversations,
        }
    }
}

/// A piece of context the answer was built from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "origin", rename_all = "snake_case")]
pub enum SourceRef {
    Local {
        id: String,
        content: String,
        source: DocumentSource,
        score: f32,
        #[serde(default, skip_serializing_if = "HashMap::is_empty")]
        metadata: HashMap<String, serde_json::Value>,
    },
    Web {
        title: String,
        url: String,
        kind: String,
        score: f32,
    },
}

impl SourceRef {
    pub fn score(&self) -> f32 {
        match self {
            SourceRef::Local { score, .. } | SourceRef::Web { score, .. } => *score,
        }
    }

    pub fn is_web(&self) -> bool {
        matches!(self, SourceRef::Web { .. })
    }
}

impl From<&SearchResult> for SourceRef {
    fn from(hit: &SearchResult) -> Self {
        SourceRef::Local {
            id: hit.document.id.clone(),
            content: hit.document.content.clone(),
            source: hit.document.source,
            score: hit.score,
            metadata: hit.document.metadata.clone(),
        }
    }
}

/// Everything `route` produced for one question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteOutcome {
    pub answer: String,
    pub classification: ClassificationResult,
    /// The strategy actually executed; differs from the classifier's when forced.
    pub strategy: Strategy,
    pub sources: Vec<SourceRef>,
    pub elapsed_ms: u64,
    /// True when the language model failed and the answer is raw context.
    pub degraded: bool,
}

#[derive(Default)]
struct Gathered {
    context: String,
    sources: Vec<SourceRef>,
}

pub struct RetrievalRouter {
    classifier: Arc<QueryClassifier>,
    store: Arc<dyn DocumentStore>,
    embedder: Arc<dyn Embedder>,
    llm: Arc<dyn Provider>,
    escalator: Option<Escalator>,
    config: RouterConfig,
    stats: UsageStats,
}

impl RetrievalRouter {
    /// A router with default tunables and no knowledge source.
    pub fn new(store: Arc<dyn DocumentStore>, embedder: Arc<dyn Embedder>, llm: Arc<dyn Provider>) -> Self {
        Self {
            classifier: Arc::new(QueryClassifier::new()),
            store,
            embedder,
            llm,
            escalator: None,
            config: RouterConfig::default(),
            stats: UsageStats::new(),
        }
    }

    pub fn with_escalator(mut self, escalator: Escalator) -> Self {
        self.escalator = Some(escalator);
        self
    }

    pub fn with_config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_classifier(mut self, classifier: Arc<QueryClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    pub fn has_knowledge_source(&self) -> bool {
        self.escalator.is_some()
    }

    pub fn classify(&self, question: &str) -> ClassificationResult {
        self.classifier.classify(question)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    pub async fn llm_available(&self) -> bool {
        match self.llm.health_check().await {
            Ok(up) => up,
            Err(e) => {
                debug!(provider = self.llm.name(), error = %e, "Health check failed");
                false
            }
        }
    }

    /// Answer `question` for `owner`.
    ///
    /// Store and embedding failures propagate. A failing language model
    /// yields a degraded outcome instead of an error.
    pub async fn route(&self, question: &str, owner: &str, forced: Option<Strategy>) -> Result<RouteOutcome> {
        let started = Instant::now();
        let classification = self.classifier.classify(question);
        let strategy = forced.unwrap_or(classification.strategy);
        self.stats.record_query(classification.category, strategy);

        info!(
            owner,
            category = %classification.category,
            strategy = %strategy,
            forced = forced.is_some(),
            "Routing query"
        );

        let mut gathered = Gathered::default();
        match strategy {
            Strategy::LlmDirect => {}
            Strategy::RagLocal => {
                self.gather_local(question, owner, &mut gathered).await?;
            }
            Strategy::RagThenWeb => {
                let best = self.gather_local(question, owner, &mut gathered).await?;
                if best.is_none_or(|score| score < self.config.escalation_threshold) {
                    debug!(best_score = ?best, threshold = self.config.escalation_threshold, "Local retrieval weak; escalating");
                    self.escalate(question, owner, &mut gathered).await;
                }
            }
            Strategy::WebSearch => self.escalate(question, owner, &mut gathered).await,
        }

        let context = gathered.context.trim();
        let messages = if strategy == Strategy::LlmDirect {
            prompts::direct_messages(question, Some(classification.category))
        } else if context.is_empty() {
            debug!(strategy = %strategy, "No context gathered; answering directly");
            prompts::direct_messages(question, None)
        } else {
            prompts::context_messages(question, context)
        };

        let (answer, degraded) = match self.generate(messages).await {
            Ok(answer) => (answer, false),
            Err(e) => {
                warn!(provider = self.llm.name(), error = %e, "Language model unavailable; returning gathered context");
                (degraded_answer(context), true)
            }
        };

        if self.config.log_conversations && !degraded {
            let turn = Document::new(format!("Q: {question}\nA: {answer}"), owner, DocumentSource::Conversation)
                .with_metadata("category", classification.category.as_str())
                .with_metadata("strategy", strategy.as_str());
            if let Err(e) = self.add_document(turn).await {
                warn!(owner, error = %e, "Failed to log conversation turn");
            }
        }

        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        info!(owner, strategy = %strategy, sources = gathered.sources.len(), degraded, elapsed_ms, "Query answered");

        Ok(RouteOutcome {
            answer,
            classification,
            strategy,
            sources: gathered.sources,
            elapsed_ms,
            degraded,
        })
    }

    /// Embed (when needed) and store a document. Returns its id.
    pub async fn add_document(&self, mut document: Document) -> Result<String> {
        if document.embedding.is_none() {
            document.embedding = Some(self.embedder.encode(&document.content).await?);
        }
        self.store.initialize(&document.owner).await?;
        let id = self.store.add(document).await?;
        Ok(id)
    }

    /// Semantic search over one owner's documents.
    pub async fn search(&self, query: &str, owner: &str, top_k: usize, min_score: f32) -> Result<Vec<SearchResult>> {
        let vector = self.embedder.encode(query).await?;
        let hits = self.store.search(&vector, owner, top_k, min_score).await?;
        Ok(hits)
    }

    /// Local hits into `out`. Returns the best score, if any hit survived.
    async fn gather_local(&self, question: &str, owner: &str, out: &mut Gathered) -> Result<Option<f32>> {
        let hits = self
            .search(question, owner, self.config.local_top_k, self.config.min_score)
            .await?;
        let best = hits.first().map(|h| h.score);
        debug!(owner, hits = hits.len(), best_score = ?best, "Local retrieval");

        for hit in &hits {
            out.context.push_str("\n- ");
            out.context.push_str(&hit.document.content);
            out.sources.push(SourceRef::from(hit));
        }
        Ok(best)
    }

    async fn escalate(&self, question: &str, owner: &str, out: &mut Gathered) {
        let Some(escalator) = &self.escalator else {
            debug!("No knowledge source configured; skipping escalation");
            return;
        };

        self.stats.record_web_search();
        let items = escalator.search(question).await;
        info!(source = escalator.source_name(), items = items.len(), "Escalated to knowledge source");

        for item in &items {
            out.context.push_str(&format!("\n\n{}: {}", item.title, item.content));
            out.sources.push(SourceRef::Web {
                title: item.title.clone(),
                url: item.source.clone(),
                kind: item.kind.clone(),
                score: self.config.web_source_score,
            });
        }

        if self.config.cache_web_results {
            self.cache_items(owner, &items).await;
        }
    }

    async fn cache_items(&self, owner: &str, items: &[KnowledgeItem]) {
        for item in items {
            let document = Document::new(format!("{}: {}", item.title, item.content), owner, DocumentSource::Web)
                .with_metadata("title", item.title.as_str())
                .with_metadata("url", item.source.as_str())
                .with_metadata("kind", item.kind.as_str());
            match self.add_document(document).await {
                Ok(id) => debug!(owner, id = %id, title = %item.title, "Cached knowledge item"),
                Err(e) => warn!(owner, title = %item.title, error = %e, "Failed to cache knowledge item"),
            }
        }
    }

    async fn generate(&self, messages: Vec<Message>) -> std::result::Result<String, ProviderError> {
        let request = ProviderRequest {
            model: self.config.model.clone(),
            messages,
            temperature: self.config.temperature,
            max_tokens: Some(self.config.max_tokens),
            stop: Vec::new(),
        };
        let response = self.llm.complete(request).await?;
        Ok(response.message.content.trim().to_string())
    }
}

fn degraded_answer(context: &str) -> String {
    if context.is_empty() {
        format!("{DEGRADED_MARKER} No stored or external information matched this question.")
    } else {
        format!("{DEGRADED_MARKER} Retrieved information:\n\n{context}")
    }
}

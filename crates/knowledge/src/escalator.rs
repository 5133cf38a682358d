//! Best-effort escalation to an external knowledge source.

use crate::terms::extract_terms;
use ragroute_core::{KnowledgeItem, KnowledgeSource};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Candidate terms tried per question.
pub const MAX_TERMS: usize = 2;

/// Turns a question into lookups against a [`KnowledgeSource`].
///
/// Never fails: source errors are logged and treated as "no result".
#[derive(Clone)]
pub struct Escalator {
    source: Arc<dyn KnowledgeSource>,
    max_terms: usize,
    max_items: usize,
}

impl Escalator {
    pub fn new(source: Arc<dyn KnowledgeSource>) -> Self {
        Self {
            source,
            max_terms: MAX_TERMS,
            max_items: 3,
        }
    }

    pub fn with_max_items(mut self, max_items: usize) -> Self {
        self.max_items = max_items;
        self
    }

    pub fn source_name(&self) -> &str {
        self.source.name()
    }

    /// Try up to two extracted terms; the first non-empty answer wins.
    pub async fn search(&self, question: &str) -> Vec<KnowledgeItem> {
        let terms = extract_terms(question);
        if terms.is_empty() {
            debug!(question, "No search terms left after filtering");
            return Vec::new();
        }

        for term in terms.iter().take(self.max_terms) {
            match self.source.search(term).await {
                Ok(items) if !items.is_empty() => {
                    info!(source = self.source.name(), term, hits = items.len(), "Knowledge source answered");
                    return items.into_iter().take(self.max_items).collect();
                }
                Ok(_) => debug!(source = self.source.name(), term, "No result for term"),
                Err(e) => warn!(source = self.source.name(), term, error = %e, "Knowledge source failed"),
            }
        }
        Vec::new()
    }
}

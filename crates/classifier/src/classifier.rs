//! Weighted pattern classifier.
//!
//! Each category scores `matching patterns × weight`. The highest score wins,
//! ties going to the earlier category in [`PATTERN_TABLE`]. With no match at
//! all the query is conversational.

use crate::patterns::{PATTERN_TABLE, default_strategy, strategy_rationale, weight};
use ragroute_core::{Category, ClassificationResult, Strategy};
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::{debug, warn};

const UNMATCHED_CONFIDENCE: f32 = 0.5;
const CONFIDENCE_CAP: f32 = 0.95;
const CONFIDENCE_BASE: f32 = 0.3;

struct CompiledCategory {
    category: Category,
    weight: f32,
    patterns: Vec<Regex>,
}

/// A compiled classifier. Build once and share.
pub struct QueryClassifier {
    categories: Vec<CompiledCategory>,
}

/// Per-category score for one query.
#[derive(Debug, Clone, PartialEq)]
pub struct CategoryScore {
    pub category: Category,
    pub score: f32,
    pub matched: Vec<String>,
}

impl Default for QueryClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryClassifier {
    pub fn new() -> Self {
        let categories = PATTERN_TABLE
            .iter()
            .map(|(category, sources)| CompiledCategory {
                category: *category,
                weight: weight(*category),
                patterns: sources
                    .iter()
                    .filter_map(|src| match Regex::new(src) {
                        Ok(re) => Some(re),
                        Err(e) => {
                            warn!(%category, pattern = src, error = %e, "Skipping invalid pattern");
                            None
                        }
                    })
                    .collect(),
            })
            .collect();
        Self { categories }
    }

    /// Total compiled patterns across all categories.
    pub fn pattern_count(&self) -> usize {
        self.categories.iter().map(|c| c.patterns.len()).sum()
    }

    /// Score every category against `text`.
    pub fn scores(&self, text: &str) -> Vec<CategoryScore> {
        let cleaned = text.trim().to_lowercase();
        self.categories
            .iter()
            .map(|c| {
                let matched: Vec<String> = c
                    .patterns
                    .iter()
                    .filter(|re| re.is_match(&cleaned))
                    .map(|re| re.as_str().to_string())
                    .collect();
                CategoryScore {
                    category: c.category,
                    score: matched.len() as f32 * c.weight,
                    matched,
                }
            })
            .collect()
    }

    /// Classify a query. Never fails.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let scores = self.scores(text);

        let mut best: Option<&CategoryScore> = None;
        for s in &scores {
            if s.score > best.map_or(0.0, |b| b.score) {
                best = Some(s);
            }
        }

        let result = match best {
            None => ClassificationResult {
                category: Category::Conversational,
                strategy: Strategy::LlmDirect,
                confidence: UNMATCHED_CONFIDENCE,
                reasons: vec!["no clear patterns; answering directly".to_string()],
            },
            Some(winner) => {
                let total: f32 = scores.iter().map(|s| s.score).sum();
                let confidence = (winner.score / total.max(1.0) + CONFIDENCE_BASE).min(CONFIDENCE_CAP);
                let strategy = default_strategy(winner.category);

                let mut reasons: Vec<String> = winner
                    .matched
                    .iter()
                    .map(|p| format!("{}: /{p}/", winner.category))
                    .collect();
                reasons.push(strategy_rationale(winner.category, strategy));

                ClassificationResult {
                    category: winner.category,
                    strategy,
                    confidence,
                    reasons,
                }
            }
        };

        debug!(
            category = %result.category,
            strategy = %result.strategy,
            confidence = result.confidence,
            "Query classified"
        );
        result
    }
}

static DEFAULT: LazyLock<QueryClassifier> = LazyLock::new(QueryClassifier::new);

/// Classify with a process-wide classifier compiled on first use.
pub fn classify(text: &str) -> ClassificationResult {
    DEFAULT.classify(text)
}

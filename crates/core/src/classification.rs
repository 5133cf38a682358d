//! Query categories, answering strategies, and the classifier's verdict.

use serde::{Deserialize, Serialize};

/// What kind of question the user asked.
///
/// Declaration order matters: when two categories tie on score, the one
/// declared first wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Math,
    Code,
    Reasoning,
    Tools,
    Greeting,
    Factual,
    Conversational,
}

impl Category {
    /// Every category, in declaration order.
    pub const ALL: [Category; 7] = [
        Category::Math,
        Category::Code,
        Category::Reasoning,
        Category::Tools,
        Category::Greeting,
        Category::Factual,
        Category::Conversational,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Math => "math",
            Category::Code => "code",
            Category::Reasoning => "reasoning",
            Category::Tools => "tools",
            Category::Greeting => "greeting",
            Category::Factual => "factual",
            Category::Conversational => "conversational",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a query gets answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Ask the language model with no retrieval.
    LlmDirect,
    /// Search the owner's documents, then generate.
    RagLocal,
    /// Search locally; escalate to the knowledge source when local hits are weak.
    RagThenWeb,
    /// Go straight to the knowledge source.
    WebSearch,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::LlmDirect,
        Strategy::RagLocal,
        Strategy::RagThenWeb,
        Strategy::WebSearch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::LlmDirect => "llm_direct",
            Strategy::RagLocal => "rag_local",
            Strategy::RagThenWeb => "rag_then_web",
            Strategy::WebSearch => "web_search",
        }
    }
}

impl std::fmt::Display for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Strategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace('-', "_");
        Strategy::ALL
            .into_iter()
            .find(|strategy| strategy.as_str() == wanted)
            .ok_or_else(|| {
                format!("unknown strategy '{s}' (expected llm_direct, rag_local, rag_then_web or web_search)")
            })
    }
}

/// The classifier's verdict for one query. Never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationResult {
    pub category: Category,
    pub strategy: Strategy,
    /// In [0, 1]
    pub confidence: f32,
    /// Matched patterns plus a one-line strategy rationale
    pub reasons: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strategy_parses_both_spellings() {
        assert_eq!("rag_then_web".parse::<Strategy>().unwrap(), Strategy::RagThenWeb);
        assert_eq!("Web-Search".parse::<Strategy>().unwrap(), Strategy::WebSearch);
        assert!("rag".parse::<Strategy>().is_err());
    }

    #[test]
    fn classification_serializes_snake_case() {
        let result = ClassificationResult {
            category: Category::Factual,
            strategy: Strategy::RagThenWeb,
            confidence: 0.95,
            reasons: vec!["factual: /capital\\s+de/".into()],
        };
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["category"], "factual");
        assert_eq!(json["strategy"], "rag_then_web");
    }

    #[test]
    fn all_lists_follow_declaration_order() {
        assert_eq!(Category::ALL[0], Category::Math);
        assert_eq!(Category::ALL[6], Category::Conversational);
        assert!(Category::Math < Category::Factual);
    }
}

//! System instructions sent to the language model.

use ragroute_core::{Category, Message};

pub const MATH_PROMPT: &str = "You are a calculator. Answer ONLY with the resulting number. \
Do not show steps or explanations. Answer in the language of the question.";

pub const CODE_PROMPT: &str = "You are an expert programmer. Answer ONLY with working code. \
Do not explain the code. Answer in the language of the question.";

pub const TOOLS_PROMPT: &str = "You are an assistant with access to tools.

Available tools:
- get_weather(location): current weather for a location
- calculate(expression): evaluate a mathematical expression
- translate(text, to_language): translate text into another language

Answer ONLY with JSON in this format:
{\"tool\": \"name\", \"arguments\": {\"param\": \"value\"}}";

pub const REASONING_PROMPT: &str = "Give ONLY the conclusion. Do not restate the problem. \
Be brief. Answer in the language of the question.";

/// The dedicated instruction for `category`, if it has one.
pub fn direct_prompt(category: Category) -> Option<&'static str> {
    match category {
        Category::Math => Some(MATH_PROMPT),
        Category::Code => Some(CODE_PROMPT),
        Category::Tools => Some(TOOLS_PROMPT),
        Category::Reasoning => Some(REASONING_PROMPT),
        Category::Greeting | Category::Factual | Category::Conversational => None,
    }
}

/// Grounding instruction wrapping a context block.
pub fn context_prompt(context: &str) -> String {
    format!(
        "You are an intelligent assistant. Use the following information to answer the question.

CONTEXT:
{context}

INSTRUCTIONS:
- Answer based on the context above
- If the context does not contain the information, say so clearly
- Be concise and direct
- Answer in the language of the question"
    )
}

/// Messages for a direct answer, optionally steered by the category.
pub fn direct_messages(question: &str, category: Option<Category>) -> Vec<Message> {
    let mut messages = Vec::with_capacity(2);
    if let Some(prompt) = category.and_then(direct_prompt) {
        messages.push(Message::system(prompt));
    }
    messages.push(Message::user(question));
    messages
}

/// Messages for an answer grounded in `context`.
pub fn context_messages(question: &str, context: &str) -> Vec<Message> {
    vec![Message::system(context_prompt(context)), Message::user(question)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ragroute_core::Role;

    #[test]
    fn only_steered_categories_get_a_prompt() {
        assert!(direct_prompt(Category::Math).is_some());
        assert!(direct_prompt(Category::Tools).unwrap().contains("get_weather"));
        assert!(direct_prompt(Category::Greeting).is_none());
        assert!(direct_prompt(Category::Conversational).is_none());
    }

    #[test]
    fn direct_messages_skip_missing_system_prompt() {
        let messages = direct_messages("hola", Some(Category::Greeting));
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::User);

        let messages = direct_messages("25+17", Some(Category::Math));
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[1].content, "25+17");
    }

    #[test]
    fn context_is_embedded_in_system_prompt() {
        let messages = context_messages("capital?", "- Paris is the capital of France");
        assert!(messages[0].content.contains("CONTEXT:\n- Paris is the capital of France"));
        assert_eq!(messages[1].content, "capital?");
    }
}

//! Search-term extraction from a natural-language question.

/// Words that never make a useful encyclopedia lookup.
pub const STOP_WORDS: &[&str] = &[
    // Spanish
    "qué", "que", "quién", "quien", "cuál", "cual", "cómo", "como", "dónde", "donde", "cuándo",
    "cuando", "el", "la", "los", "las", "un", "una", "de", "del", "al", "a", "en", "con", "es",
    "son", "capital", "fue", "era", "y", "o", "se", "su",
    // English
    "what", "who", "which", "how", "where", "when", "the", "and", "was", "were", "is", "are",
    "did", "does", "of",
];

/// Candidate terms, best first: the remaining words joined as one phrase,
/// then each word longer than three characters, capitalized.
///
/// Punctuation becomes whitespace. Words of two characters or fewer and stop
/// words are dropped.
pub fn extract_terms(question: &str) -> Vec<String> {
    let cleaned: String = question
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
        .collect();

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 2 && !STOP_WORDS.contains(w))
        .collect();

    if words.is_empty() {
        return Vec::new();
    }

    let mut terms = vec![words.join(" ")];
    terms.extend(
        words
            .iter()
            .filter(|w| w.chars().count() > 3)
            .map(|w| capitalize(w)),
    );
    terms
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_stop_words_and_punctuation() {
        let terms = extract_terms("¿Quién fue Albert Einstein?");
        assert_eq!(terms, ["albert einstein", "Albert", "Einstein"]);
    }

    #[test]
    fn capital_is_a_stop_word() {
        let terms = extract_terms("¿Cuál es la capital de Francia?");
        assert_eq!(terms, ["francia", "Francia"]);
    }

    #[test]
    fn short_words_dropped_from_singles() {
        // "sol" survives the phrase filter but is too short to try alone
        let terms = extract_terms("qué es el sol naciente");
        assert_eq!(terms, ["sol naciente", "Naciente"]);
    }

    #[test]
    fn accented_words_capitalize() {
        assert_eq!(extract_terms("órbita")[1], "Órbita");
    }

    #[test]
    fn nothing_left_means_no_terms() {
        assert!(extract_terms("¿Qué es el?").is_empty());
        assert!(extract_terms("").is_empty());
    }

    #[test]
    fn english_questions() {
        assert_eq!(extract_terms("Who invented the telephone?")[0], "invented telephone");
    }
}

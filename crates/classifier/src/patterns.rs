//! Pattern, weight, and strategy tables.
//!
//! Patterns are matched against the lowercased query. Each category lists the
//! Spanish set first, then English. Matching is ASCII for `\b` and `\w`.

use ragroute_core::{Category, Strategy};

/// Arithmetic and percentages.
pub const MATH: &[&str] = &[
    r"^\d+\s*[\+\-\*\/\^]\s*\d+",
    r"cuánto\s+es\s+\d+",
    r"resultado\s+de\s+\d+",
    r"raíz\s*(cuadrada|cúbica)",
    r"porcentaje|%",
    // English
    r"\bwhat\s+is\s+\d+\s*[\+\-\*\/x]\s*\d+",
    r"\bsquare\s+root\b",
    r"\bhow\s+much\s+is\s+\d+",
    r"\b\d+\s*%\s*of\b",
    r"\bsolve\b",
    r"\bfactorial\b",
];

/// Programming requests and language names.
pub const CODE: &[&str] = &[
    r"escribe?\s+(un\s+)?(código|programa|función|script)",
    r"crea\s+(una?\s+)?(función|clase|método)",
    r"cómo\s+(se\s+)?(programa|codifica|implementa)",
    r"python|javascript|java|c\+\+|rust|go|typescript",
    r"función\s+que|método\s+que",
    r"bucle|loop|for|while|if\s+else",
    r"variable|array|lista|diccionario",
    r"print|console\.log|printf",
    r"def\s+\w+|function\s+\w+|class\s+\w+",
    r"hola\s+mundo|hello\s+world",
    r"ordenar|sort|filtrar|filter|mapear|map",
    // English
    r"\bwrite\s+(a\s+)?(code|function|program|script)\b",
    r"\bhow\s+to\s+(code|program|implement)\b",
    r"\bfn\s+\w+\s*\(",
    r"\bregex\b|\bregular\s+expression\b",
    r"\bsql\b",
    r"\brefactor\b",
    r"\bfix\s+(the\s+)?(bug|error)\b",
];

/// Syllogisms and sequence puzzles.
pub const REASONING: &[&str] = &[
    r"si\s+.+\s+entonces",
    r"qué\s+sigue|siguiente\s+número",
    r"secuencia|patrón|serie",
    r"lógica|lógicamente|deduce|deducir",
    r"todos\s+los\s+.+\s+son",
    r"por\s+lo\s+tanto|en\s+consecuencia",
    r"verdadero\s+o\s+falso",
    r"paradoja|acertijo|puzzle",
    // English
    r"\bif\s+.+\s+then\b",
    r"\bwhat\s+comes\s+next\b",
    r"\btrue\s+or\s+false\b",
    r"\btherefore\b",
    r"\briddle\b",
    r"\ball\s+\w+\s+are\b",
];

/// Commands meant for an external tool.
pub const TOOLS: &[&str] = &[
    r"clima\s+(en|de)|weather",
    r"traducir?\s+.+\s+(a|al)|traduce?\s+.+\s+(a|al)",
    r"traduce?\s+(esto|eso|el|la|lo)\s+(a|al)",
    r"translate",
    r"buscar?\s+(información|info)",
    r"enviar?\s+(un\s+)?(mensaje|email|correo)",
    r"mensaje\s+(a|para)\s+\w+",
    r"crear?\s+(un\s+)?(evento|recordatorio|alarma)",
    r"recordatorio\b",
    r"obtener?\s+(datos|información)",
    r"calcula(r|dora)?\s+\d+",
    r"suma\s+\d+|resta\s+\d+|multiplica\s+\d+|divide\s+\d+",
    // English
    r"\bstock\s+price\b",
    r"\bsend\s+(an?\s+)?(message|email)\b",
    r"\bremind\s+me\b",
    r"\bset\s+(an?\s+)?(alarm|reminder|timer)\b",
];

/// Greetings and farewells. Anchored to the start of the query.
pub const GREETING: &[&str] = &[
    r"^hola\b|^hi\b|^hey\b",
    r"^buenas?\s*(días|tardes|noches)",
    r"^buenos\s+(días|tardes|noches)",
    r"^saludos",
    r"^qué\s+tal|^cómo\s+estás",
    r"^adiós|^hasta\s+(luego|pronto|mañana)",
    r"^chao|^bye",
    r"^gracias|^thank",
    // English
    r"^hello\b",
    r"^good\s+(morning|afternoon|evening)\b",
    r"^how\s+are\s+you\b",
    r"^goodbye\b|^see\s+you\b",
];

/// Encyclopedic questions and questions about indexed projects.
pub const FACTUAL: &[&str] = &[
    r"(quién|quien)\s+(es|fue|era)",
    r"(qué|que)\s+es\s+(un|una|el|la|este)",
    r"capital\s+de|capital\s+del",
    r"cuándo\s+(nació|murió|fue|ocurrió)",
    r"dónde\s+(está|queda|nació)",
    r"historia\s+de|origen\s+de",
    r"inventor\s+de|creador\s+de|fundador",
    r"inventó|descubrió|creó|fundó",
    r"presidente\s+de|rey\s+de|líder",
    r"población\s+de|habitantes",
    r"(qué|cuál)\s+país|en\s+qué\s+año",
    r"descubrimiento|invención|revolución",
    r"siglo\s+\w+|año\s+\d+",
    r"guerra|batalla|tratado",
    r"científico|artista|escritor|músico",
    r"empresa|compañía|corporación",
    r"película|libro|canción|álbum",
    r"(qué|cómo)\s+(hace|funciona|es)\s+(la|el|este)",
    r"(qué|cuáles)\s+(clases|funciones|métodos)\s+hay",
    r"este\s+proyecto|el\s+proyecto",
    r"en\s+(el|este)\s+(archivo|código|script)",
    r"(ejecutar|correr|usar)\s+(con|el)\s+docker",
    // English
    r"\bwho\s+(is|was|were)\b",
    r"\bwhat\s+is\s+(a|an|the)\b",
    r"\bcapital\s+of\b",
    r"\bwhen\s+(did|was)\b",
    r"\bwhere\s+is\b",
    r"\bhistory\s+of\b",
    r"\bwho\s+invented\b",
    r"\bpopulation\s+of\b",
];
/// Pattern sets in scoring order. Ties go to the earlier category.
pub const PATTERN_TABLE: [(Category, &[&str]); 6] = [
    (Category::Math, MATH),
    (Category::Code, CODE),
    (Category::Reasoning, REASONING),
    (Category::Tools, TOOLS),
    (Category::Greeting, GREETING),
    (Category::Factual, FACTUAL),
];

/// Score per matching pattern.
pub const WEIGHTS: [(Category, f32); 6] = [
    (Category::Math, 2.0),
    (Category::Code, 1.5),
    (Category::Reasoning, 1.5),
    (Category::Tools, 2.0),
    (Category::Greeting, 2.5),
    (Category::Factual, 1.8),
];

/// Default strategy for every category. Only factual and code questions
/// pay for retrieval.
pub const STRATEGY_TABLE: [(Category, Strategy); 7] = [
    (Category::Math, Strategy::LlmDirect),
    (Category::Code, Strategy::RagLocal),
    (Category::Reasoning, Strategy::LlmDirect),
    (Category::Tools, Strategy::LlmDirect),
    (Category::Greeting, Strategy::LlmDirect),
    (Category::Factual, Strategy::RagThenWeb),
    (Category::Conversational, Strategy::LlmDirect),
];

pub fn weight(category: Category) -> f32 {
    WEIGHTS
        .iter()
        .find(|(c, _)| *c == category)
        .map_or(0.0, |(_, w)| *w)
}

pub fn default_strategy(category: Category) -> Strategy {
    STRATEGY_TABLE
        .iter()
        .find(|(c, _)| *c == category)
        .map_or(Strategy::LlmDirect, |(_, s)| *s)
}

/// One-line rationale recorded alongside the matched patterns.
pub fn strategy_rationale(category: Category, strategy: Strategy) -> String {
    let why = match strategy {
        Strategy::RagThenWeb => "local documents first, escalating to the web when they fall short",
        Strategy::RagLocal => "answered from local project documents",
        Strategy::WebSearch => "answered from the external knowledge source",
        Strategy::LlmDirect => "answered directly, retrieval does not help here",
    };
    format!("{category} -> {strategy}: {why}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_category_has_exactly_one_strategy() {
        for category in Category::ALL {
            let entries = STRATEGY_TABLE.iter().filter(|(c, _)| *c == category).count();
            assert_eq!(entries, 1, "{category}");
        }
    }

    #[test]
    fn strategy_mapping() {
        assert_eq!(default_strategy(Category::Factual), Strategy::RagThenWeb);
        assert_eq!(default_strategy(Category::Code), Strategy::RagLocal);
        for category in [
            Category::Math,
            Category::Reasoning,
            Category::Tools,
            Category::Greeting,
            Category::Conversational,
        ] {
            assert_eq!(default_strategy(category), Strategy::LlmDirect);
        }
    }

    #[test]
    fn weights_favor_specific_categories() {
        assert_eq!(weight(Category::Greeting), 2.5);
        assert!(weight(Category::Math) > weight(Category::Code));
        assert!(weight(Category::Factual) > weight(Category::Reasoning));
        assert_eq!(weight(Category::Conversational), 0.0);
    }

    #[test]
    fn every_pattern_compiles() {
        for (category, patterns) in PATTERN_TABLE {
            for pattern in patterns {
                assert!(regex_lite::Regex::new(pattern).is_ok(), "{category}: {pattern}");
            }
        }
    }

    #[test]
    fn pattern_and_weight_tables_align() {
        for ((a, _), (b, _)) in PATTERN_TABLE.iter().zip(WEIGHTS.iter()) {
            assert_eq!(a, b);
        }
    }
}

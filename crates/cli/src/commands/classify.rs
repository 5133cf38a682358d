//! `ragroute classify`: show the routing decision for a question.

pub fn run(question: &str, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let result = ragroute_classifier::classify(question);

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    println!("Category:   {}", result.category);
    println!("Strategy:   {}", result.strategy);
    println!("Confidence: {:.2}", result.confidence);
    for reason in &result.reasons {
        println!("  - {reason}");
    }
    Ok(())
}

//! `ragroute query`: answer one question through the router.

use ragroute_core::Strategy;
use ragroute_router::SourceRef;
use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    question: &str,
    owner: &str,
    strategy: Option<&str>,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let forced = strategy.map(str::parse::<Strategy>).transpose()?;
    let (_, runtime) = super::runtime(config_path).await?;
    let outcome = runtime.router.route(question, owner, forced).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&outcome)?);
        return Ok(());
    }

    println!("{}", outcome.answer);
    println!();
    println!(
        "[{} -> {}, confidence {:.2}, {} ms{}]",
        outcome.classification.category,
        outcome.strategy,
        outcome.classification.confidence,
        outcome.elapsed_ms,
        if outcome.degraded { ", degraded" } else { "" }
    );
    for source in &outcome.sources {
        match source {
            SourceRef::Local { id, source, score, .. } => {
                println!("  local  {id} ({source}) score {score:.2}");
            }
            SourceRef::Web { title, url, score, .. } => {
                println!("  web    {title} <{url}> score {score:.2}");
            }
        }
    }
    Ok(())
}

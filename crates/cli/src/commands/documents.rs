//! `ragroute search | documents | stats | delete | clear`.

use ragroute_core::Embedder;
use std::path::Path;
use tracing::{info, warn};

pub async fn search(
    config_path: Option<&Path>,
    query: &str,
    owner: &str,
    top_k: usize,
    min_score: Option<f32>,
) -> Result<(), Box<dyn std::error::Error>> {
    let (config, runtime) = super::runtime(config_path).await?;
    let min_score = min_score.unwrap_or(config.routing.min_score);
    let hits = runtime.router.search(query, owner, top_k.max(1), min_score).await?;

    if hits.is_empty() {
        println!("No documents matched.");
        return Ok(());
    }
    for (i, hit) in hits.iter().enumerate() {
        println!(
            "{:>2}. [{:.3}] {} ({}) {}",
            i + 1,
            hit.score,
            hit.document.id,
            hit.document.source,
            hit.document.preview(80)
        );
    }
    Ok(())
}

pub async fn list(config_path: Option<&Path>, owner: &str, limit: usize) -> Result<(), Box<dyn std::error::Error>> {
    let (_, runtime) = super::runtime(config_path).await?;
    let documents = runtime.router.store().list(owner, limit).await?;

    if documents.is_empty() {
        println!("No documents for {owner}.");
        return Ok(());
    }
    for doc in &documents {
        println!(
            "{}  {:<12} {}  {}",
            doc.id,
            doc.source.as_str(),
            doc.created_at.format("%Y-%m-%d %H:%M"),
            doc.preview(60)
        );
    }
    Ok(())
}

pub async fn stats(config_path: Option<&Path>, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (config, runtime) = super::runtime(config_path).await?;
    let stats = runtime.router.store().stats(owner).await?;

    println!("Documents for {owner}");
    println!("  Backend:    {}", runtime.router.store().name());
    println!("  Total:      {}", stats.total);
    println!("  Embedded:   {}", stats.embedding_count);
    for (source, count) in &stats.by_source {
        println!("    {:<12} {count}", source.as_str());
    }
    if let Some(path) = &stats.storage_path {
        println!("  Path:       {path}");
    }
    println!(
        "  Model:      {} ({} dims, {})",
        runtime.embeddings.model_id(),
        runtime.embeddings.dimension(),
        runtime.embeddings.backend()
    );
    println!("  Threshold:  {}", config.routing.escalation_threshold);
    Ok(())
}

pub async fn delete(config_path: Option<&Path>, id: &str, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_, runtime) = super::runtime(config_path).await?;
    if runtime.router.store().delete(id, owner).await? {
        info!(owner, id, "Document deleted");
        println!("deleted {id}");
        Ok(())
    } else {
        warn!(owner, id, "Delete requested for unknown document");
        Err(format!("No document {id} for {owner}").into())
    }
}

pub async fn clear(config_path: Option<&Path>, owner: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (_, runtime) = super::runtime(config_path).await?;
    let removed = runtime.router.store().clear(owner).await?;
    info!(owner, removed, "Owner cleared");
    println!("removed {removed} documents for {owner}");
    Ok(())
}

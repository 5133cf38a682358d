//! `ragroute config`: configuration management commands.

use ragroute_config::{AppConfig, EmbeddingBackend, StorageBackend};
use std::path::{Path, PathBuf};

fn config_file(path: Option<&Path>) -> PathBuf {
    path.map(Path::to_path_buf)
        .unwrap_or_else(|| AppConfig::config_dir().join("config.toml"))
}

pub fn validate(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    println!("Validating {}", config_file(path).display());

    let config = match super::load_config(path) {
        Ok(config) => config,
        Err(e) => {
            println!("   Config error: {e}");
            return Err(e);
        }
    };
    println!("   Config parsed successfully");

    let model = config.embedding_model()?;
    let mut warnings = Vec::new();

    if config.gateway.host == "0.0.0.0" && config.gateway.cors_origins.is_empty() {
        warnings.push("Gateway bound to 0.0.0.0 with CORS open to every origin");
    }
    if config.routing.min_score > config.routing.escalation_threshold {
        warnings.push("routing.min_score is above escalation_threshold; weak hits will never be kept");
    }
    if config.embedding.backend == EmbeddingBackend::Hashing {
        warnings.push("Hashing embeddings: search matches shared words only, not meaning");
    }
    if config.storage.backend == StorageBackend::Memory {
        warnings.push("Memory storage: documents are lost when the process exits");
    }

    if warnings.is_empty() {
        println!("   All checks passed");
    } else {
        println!();
        for w in &warnings {
            println!("   warning: {w}");
        }
    }

    println!();
    println!("   LLM:        {} at {}", config.llm.model, config.llm.api_url);
    println!(
        "   Embeddings: {} ({} dims, {})",
        model.model_id,
        model.dimension,
        config.embedding.backend.as_str()
    );
    println!("   Storage:    {:?}", config.storage.backend);
    println!("   Gateway:    {}:{}", config.gateway.host, config.gateway.port);
    Ok(())
}

pub fn show(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(path)?;
    if config.llm.api_key.is_some() {
        config.llm.api_key = Some("***".into());
    }
    println!("{}", toml::to_string_pretty(&config)?);
    Ok(())
}

pub fn path(path: Option<&Path>) {
    println!("{}", config_file(path).display());
}

pub fn init(path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let file = config_file(path);
    if file.exists() {
        println!("Config already exists at {}", file.display());
        return Ok(());
    }
    if let Some(parent) = file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&file, AppConfig::default_toml())?;
    println!("Wrote default config to {}", file.display());
    Ok(())
}

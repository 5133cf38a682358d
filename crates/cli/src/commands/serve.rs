//! `ragroute serve`: start the HTTP API.

use std::path::Path;

pub async fn run(
    config_path: Option<&Path>,
    port_override: Option<u16>,
    host_override: Option<String>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut config = super::load_config(config_path)?;
    if let Some(port) = port_override {
        config.gateway.port = port;
    }
    if let Some(host) = host_override {
        config.gateway.host = host;
    }

    println!("ragroute gateway");
    println!("   Listening:  {}:{}", config.gateway.host, config.gateway.port);
    println!("   LLM:        {} ({})", config.llm.api_url, config.llm.model);
    println!("   Embeddings: {} ({})", config.embedding.model, config.embedding.backend.as_str());
    println!("   Storage:    {:?}", config.storage.backend);
    println!(
        "   Knowledge:  {}",
        if config.knowledge.enabled {
            format!("wikipedia ({})", config.knowledge.language)
        } else {
            "disabled".to_string()
        }
    );

    ragroute_gateway::start(config).await
}

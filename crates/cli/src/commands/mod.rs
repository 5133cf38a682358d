//! Subcommand implementations.

pub mod add;
pub mod classify;
pub mod config_cmd;
pub mod documents;
pub mod query;
pub mod serve;

use ragroute_config::AppConfig;
use ragroute_router::Runtime;
use std::path::Path;

/// Load `path` (or the default location), apply env overrides, validate.
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let config = match path {
        None => AppConfig::load(),
        Some(path) => AppConfig::load_from(path).and_then(|mut config| {
            config.apply_env_overrides(|key| std::env::var(key).ok())?;
            config.validate()?;
            Ok(config)
        }),
    };
    config.map_err(|e| format!("Failed to load config: {e}").into())
}

/// Config plus a runtime built from it.
pub async fn runtime(path: Option<&Path>) -> Result<(AppConfig, Runtime), Box<dyn std::error::Error>> {
    let config = load_config(path)?;
    let runtime = Runtime::from_config(&config).await?;
    Ok((config, runtime))
}

//! Configuration loading, validation, and management for ragroute.
//!
//! Loads configuration from `~/.ragroute/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use ragroute_core::EmbeddingModel;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.ragroute/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Language model connection
    #[serde(default)]
    pub llm: LlmConfig,

    /// Embedding model selection
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Document store backend
    #[serde(default)]
    pub storage: StorageConfig,

    /// Retrieval and escalation thresholds
    #[serde(default)]
    pub routing: RoutingConfig,

    /// External knowledge source
    #[serde(default)]
    pub knowledge: KnowledgeConfig,

    /// HTTP server
    #[serde(default)]
    pub gateway: GatewayConfig,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// OpenAI-compatible base URL (the part before `/chat/completions`)
    #[serde(default = "default_llm_url")]
    pub api_url: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    #[serde(default = "default_llm_model")]
    pub model: String,

    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    #[serde(default = "default_temperature")]
    pub temperature: f32,

    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,
}

fn default_llm_provider() -> String {
    "llamacpp".into()
}
fn default_llm_url() -> String {
    "http://localhost:11435/v1".into()
}
fn default_llm_model() -> String {
    "bitnet".into()
}
fn default_max_tokens() -> u32 {
    512
}
fn default_temperature() -> f32 {
    0.7
}
fn default_llm_timeout() -> u64 {
    120
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_url: default_llm_url(),
            api_key: None,
            model: default_llm_model(),
            max_tokens: default_max_tokens(),
            temperature: default_temperature(),
            timeout_secs: default_llm_timeout(),
        }
    }
}

/// Redact a secret for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmConfig")
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("api_key", &redact(&self.api_key))
            .field("model", &self.model)
            .field("max_tokens", &self.max_tokens)
            .field("temperature", &self.temperature)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Which encoder produces vectors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmbeddingBackend {
    /// In-process ONNX sentence encoder (fastembed, `local` build feature)
    #[default]
    Local,
    /// Deterministic feature hashing; offline and test use only
    Hashing,
    /// OpenAI-compatible `/embeddings` endpoint
    Remote,
}

impl EmbeddingBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Local => "local",
            Self::Hashing => "hashing",
            Self::Remote => "remote",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingConfig {
    /// Alias from the known-model table (minilm, mpnet, e5, bge)
    #[serde(default = "default_embedding_model")]
    pub model: String,

    #[serde(default)]
    pub backend: EmbeddingBackend,

    /// Base URL for the remote backend; falls back to `llm.api_url`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Where the local backend keeps downloaded model files
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cache_dir: Option<PathBuf>,

    /// Load the model at startup instead of on first use
    #[serde(default = "default_true")]
    pub preload: bool,
}

fn default_embedding_model() -> String {
    "minilm".into()
}
fn default_true() -> bool {
    true
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            model: default_embedding_model(),
            backend: EmbeddingBackend::default(),
            api_url: None,
            cache_dir: None,
            preload: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Memory,
    #[default]
    File,
    Sqlite,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// Root directory for the file backend (one subdirectory per owner)
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Database file for the sqlite backend
    #[serde(default = "default_sqlite_path")]
    pub sqlite_path: PathBuf,
}

fn default_data_dir() -> PathBuf {
    AppConfig::config_dir().join("data")
}
fn default_sqlite_path() -> PathBuf {
    AppConfig::config_dir().join("documents.sqlite")
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::default(),
            data_dir: default_data_dir(),
            sqlite_path: default_sqlite_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Local hits retrieved per query
    #[serde(default = "default_local_top_k")]
    pub local_top_k: usize,

    /// Escalate when the best local score is below this
    #[serde(default = "default_escalation_threshold")]
    pub escalation_threshold: f32,

    /// Local hits scoring below this are discarded
    #[serde(default = "default_min_score")]
    pub min_score: f32,

    /// Score reported for knowledge-source hits
    #[serde(default = "default_web_source_score")]
    pub web_source_score: f32,

    /// Store escalation hits in the owner's namespace
    #[serde(default)]
    pub cache_web_results: bool,

    /// Store each answered question as a conversation document
    #[serde(default)]
    pub log_conversations: bool,
}

fn default_local_top_k() -> usize {
    3
}
fn default_escalation_threshold() -> f32 {
    0.5
}
fn default_min_score() -> f32 {
    0.3
}
fn default_web_source_score() -> f32 {
    0.8
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            local_top_k: default_local_top_k(),
            escalation_threshold: default_escalation_threshold(),
            min_score: default_min_score(),
            web_source_score: default_web_source_score(),
            cache_web_results: false,
            log_conversations: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Wikipedia language edition
    #[serde(default = "default_language")]
    pub language: String,

    #[serde(default = "default_knowledge_timeout")]
    pub timeout_secs: u64,

    /// Upper bound on items returned per escalation
    #[serde(default = "default_max_items")]
    pub max_items: usize,
}

fn default_language() -> String {
    "es".into()
}
fn default_knowledge_timeout() -> u64 {
    10
}
/// Most knowledge-source items a single escalation may return.
pub const MAX_ESCALATION_ITEMS: usize = 3;

fn default_max_items() -> usize {
    MAX_ESCALATION_ITEMS
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            language: default_language(),
            timeout_secs: default_knowledge_timeout(),
            max_items: default_max_items(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    /// Allowed CORS origins; empty allows any origin
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

fn default_port() -> u16 {
    11436
}
fn default_host() -> String {
    "127.0.0.1".into()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            cors_origins: Vec::new(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.ragroute/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `RAGROUTE_LLM_URL`
    /// - `RAGROUTE_API_KEY`
    /// - `RAGROUTE_EMBEDDING_MODEL`
    /// - `RAGROUTE_DATA_DIR`
    /// - `RAGROUTE_PORT`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a key lookup (the process environment in `load`).
    pub fn apply_env_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(url) = lookup("RAGROUTE_LLM_URL") {
            self.llm.api_url = url;
        }
        if let Some(key) = lookup("RAGROUTE_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(model) = lookup("RAGROUTE_EMBEDDING_MODEL") {
            self.embedding.model = model;
        }
        if let Some(dir) = lookup("RAGROUTE_DATA_DIR") {
            self.storage.data_dir = PathBuf::from(dir);
        }
        if let Some(port) = lookup("RAGROUTE_PORT") {
            self.gateway.port = port.parse().map_err(|_| {
                ConfigError::ValidationError(format!("RAGROUTE_PORT is not a port number: {port}"))
            })?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".ragroute")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::ValidationError(
                "llm.temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.routing.escalation_threshold) {
            return Err(ConfigError::ValidationError(
                "routing.escalation_threshold must be between 0.0 and 1.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.routing.min_score) {
            return Err(ConfigError::ValidationError(
                "routing.min_score must be between 0.0 and 1.0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.routing.web_source_score) {
            return Err(ConfigError::ValidationError(
                "routing.web_source_score must be between 0.0 and 1.0".into(),
            ));
        }

        if !(1..=MAX_ESCALATION_ITEMS).contains(&self.knowledge.max_items) {
            return Err(ConfigError::ValidationError(format!(
                "knowledge.max_items must be between 1 and {MAX_ESCALATION_ITEMS}"
            )));
        }

        if self.routing.local_top_k == 0 {
            return Err(ConfigError::ValidationError(
                "routing.local_top_k must be at least 1".into(),
            ));
        }

        if EmbeddingModel::lookup(&self.embedding.model).is_err() {
            return Err(ConfigError::ValidationError(format!(
                "embedding.model '{}' is not one of minilm, mpnet, e5, bge",
                self.embedding.model
            )));
        }

        Ok(())
    }

    /// The resolved embedding model. Only fails on an unvalidated config.
    pub fn embedding_model(&self) -> Result<EmbeddingModel, ConfigError> {
        EmbeddingModel::lookup(&self.embedding.model)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.gateway.port, 11436);
        assert_eq!(config.routing.local_top_k, 3);
        assert!((config.routing.escalation_threshold - 0.5).abs() < f32::EPSILON);
        assert_eq!(config.embedding_model().unwrap().dimension, 384);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.llm.model, config.llm.model);
        assert_eq!(parsed.storage.backend, StorageBackend::File);
    }

    #[test]
    fn invalid_temperature_rejected() {
        let mut config = AppConfig::default();
        config.llm.temperature = 5.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn web_source_score_must_be_a_score() {
        let mut config = AppConfig::default();
        config.routing.web_source_score = 1.5;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("web_source_score"));

        config.routing.web_source_score = -0.1;
        assert!(config.validate().is_err());
    }

    #[test]
    fn escalation_item_cap_enforced() {
        let mut config = AppConfig::default();
        config.knowledge.max_items = 4;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("knowledge.max_items"));

        config.knowledge.max_items = 0;
        assert!(config.validate().is_err());

        config.knowledge.max_items = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn local_backend_is_default() {
        let config = AppConfig::default();
        assert_eq!(config.embedding.backend, EmbeddingBackend::Local);
        assert_eq!(config.embedding.backend.as_str(), "local");

        let parsed: EmbeddingConfig = toml::from_str("backend = \"hashing\"").unwrap();
        assert_eq!(parsed.backend, EmbeddingBackend::Hashing);
        assert!(parsed.cache_dir.is_none());
    }

    #[test]
    fn unknown_embedding_model_rejected() {
        let mut config = AppConfig::default();
        config.embedding.model = "word2vec".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("word2vec"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let config = AppConfig::load_from(Path::new("/nonexistent/config.toml")).unwrap();
        assert_eq!(config.llm.provider, "llamacpp");
    }

    #[test]
    fn partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
[storage]
backend = "sqlite"

[routing]
escalation_threshold = 0.65
cache_web_results = true

[embedding]
model = "bge"
backend = "remote"
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.storage.backend, StorageBackend::Sqlite);
        assert!((config.routing.escalation_threshold - 0.65).abs() < f32::EPSILON);
        assert!(config.routing.cache_web_results);
        assert_eq!(config.routing.local_top_k, 3);
        assert_eq!(config.embedding.backend, EmbeddingBackend::Remote);
        assert_eq!(config.embedding_model().unwrap().dimension, 1024);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[routing\nlocal_top_k = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_overrides_apply() {
        let env: HashMap<&str, &str> = HashMap::from([
            ("RAGROUTE_LLM_URL", "http://gpu-box:8080/v1"),
            ("RAGROUTE_PORT", "9000"),
            ("RAGROUTE_API_KEY", "sk-local"),
        ]);
        let mut config = AppConfig::default();
        config
            .apply_env_overrides(|k| env.get(k).map(|v| v.to_string()))
            .unwrap();
        assert_eq!(config.llm.api_url, "http://gpu-box:8080/v1");
        assert_eq!(config.gateway.port, 9000);
        assert!(!format!("{:?}", config.llm).contains("sk-local"));
    }

    #[test]
    fn bad_port_override_rejected() {
        let mut config = AppConfig::default();
        let result = config.apply_env_overrides(|k| {
            (k == "RAGROUTE_PORT").then(|| "eleven".to_string())
        });
        assert!(result.is_err());
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("bitnet"));
        assert!(toml_str.contains("11436"));
    }
}

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct DojoConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub inference: InferenceConfig,
    pub query: QueryConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub transport: String,
    pub log_level: String,
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct InferenceConfig {
    /// When false, no request ever leaves the process and extraction is rule-only.
    pub enabled: bool,
    /// OpenAI-compatible base URL, e.g. `http://localhost:11434/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub model: String,
    pub fallback_models: Vec<String>,
    pub request_timeout_secs: u64,
    pub health_timeout_secs: u64,
    pub health_ttl_secs: u64,
    pub health_interval_secs: u64,
    pub temperature: f32,
    pub max_tokens: u32,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct QueryConfig {
    /// How many keys the "Known facts" fallback lists.
    pub known_facts_limit: usize,
    /// How many subjects a global attribute answer samples before "+K more".
    pub global_sample_limit: usize,
}

impl Default for DojoConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            storage: StorageConfig::default(),
            inference: InferenceConfig::default(),
            query: QueryConfig::default(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            transport: "stdio".into(),
            log_level: "info".into(),
            host: "127.0.0.1".into(),
            port: 8931,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        let db_path = default_dojo_dir()
            .join("ledger.db")
            .to_string_lossy()
            .into_owned();
        Self { db_path }
    }
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            base_url: "http://localhost:11434/v1".into(),
            api_key: None,
            model: "llama3.2".into(),
            fallback_models: vec!["qwen2.5".into(), "mistral".into()],
            request_timeout_secs: 20,
            health_timeout_secs: 3,
            health_ttl_secs: 5,
            health_interval_secs: 60,
            temperature: 0.1,
            max_tokens: 256,
        }
    }
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            known_facts_limit: 5,
            global_sample_limit: 3,
        }
    }
}

/// Returns `~/.dojo/`
pub fn default_dojo_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".dojo")
}

/// Returns the default config file path: `~/.dojo/config.toml`
pub fn default_config_path() -> PathBuf {
    default_dojo_dir().join("config.toml")
}

impl DojoConfig {
    /// Load config from TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            DojoConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides
    /// (DOJO_DB, DOJO_LOG_LEVEL, DOJO_INFERENCE_URL, DOJO_MODEL, DOJO_API_KEY).
    fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DOJO_DB") {
            self.storage.db_path = val;
        }
        if let Ok(val) = std::env::var("DOJO_LOG_LEVEL") {
            self.server.log_level = val;
        }
        if let Ok(val) = std::env::var("DOJO_INFERENCE_URL") {
            self.inference.base_url = val;
        }
        if let Ok(val) = std::env::var("DOJO_MODEL") {
            self.inference.model = val;
        }
        if let Ok(val) = std::env::var("DOJO_API_KEY") {
            self.inference.api_key = Some(val);
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }
}

pub fn expand_tilde(path: &str) -> PathBuf {
    match (path.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(path),
    }
}

//! Configuration management.
//!
//! Configuration is layered: built-in defaults, an optional TOML file in
//! the platform config directory, then environment overrides. Secrets
//! only ever live in `SecretString` wrappers.

use std::path::{Path, PathBuf};

use secrecy::SecretString;
use serde::Deserialize;

use crate::index::DEFAULT_TOP_K;
use crate::{Error, Result};

/// Environment variable carrying the Telegram bot token.
pub const BOT_TOKEN_ENV: &str = "TELEGRAM_BOT_TOKEN";

/// Environment variable carrying the Gemini API key.
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

/// Main configuration for toolscout.
#[derive(Debug, Clone)]
pub struct ToolscoutConfig {
    /// Path to the knowledge-base JSON file.
    pub data_file: PathBuf,
    /// Base directory for the persisted vector collection.
    pub index_dir: PathBuf,
    /// Number of documents retrieved per query.
    pub top_k: usize,
    /// Model provider configuration.
    pub llm: LlmConfig,
    /// Telegram gateway configuration.
    pub telegram: TelegramConfig,
    /// Observability settings.
    pub observability: ObservabilitySettings,
}

/// Model provider configuration.
#[derive(Debug, Clone, Default)]
pub struct LlmConfig {
    /// API key for the generation/embedding provider.
    pub api_key: Option<SecretString>,
    /// Chat model name override.
    pub model: Option<String>,
    /// Embedding model name override.
    pub embedding_model: Option<String>,
    /// Base URL override (for proxies and tests).
    pub base_url: Option<String>,
    /// Maximum retries for transient failures.
    pub max_retries: Option<u32>,
    /// Backoff between retries in milliseconds.
    pub retry_backoff_ms: Option<u64>,
}

/// Telegram gateway configuration.
#[derive(Debug, Clone)]
pub struct TelegramConfig {
    /// Bot token; required for `serve`.
    pub bot_token: Option<SecretString>,
    /// Bot API base URL override (for tests).
    pub api_url: String,
    /// Long-poll timeout in seconds.
    pub poll_timeout_secs: u64,
}

impl Default for TelegramConfig {
    fn default() -> Self {
        Self {
            bot_token: None,
            api_url: "https://api.telegram.org".to_string(),
            poll_timeout_secs: 50,
        }
    }
}

/// Observability settings.
#[derive(Debug, Clone)]
pub struct ObservabilitySettings {
    /// Emit JSON log lines instead of the pretty format.
    pub json_logs: bool,
    /// Whether to install the Prometheus recorder.
    pub metrics_enabled: bool,
    /// Port for the Prometheus scrape endpoint.
    pub metrics_port: u16,
}

impl Default for ObservabilitySettings {
    fn default() -> Self {
        Self {
            json_logs: false,
            metrics_enabled: false,
            metrics_port: 9090,
        }
    }
}

/// Configuration file structure (for TOML parsing).
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFile {
    /// Knowledge-base file path.
    pub data_file: Option<String>,
    /// Vector collection base directory.
    pub index_dir: Option<String>,
    /// Retrieval depth.
    pub top_k: Option<usize>,
    /// Model provider section.
    pub llm: Option<ConfigFileLlm>,
    /// Telegram section.
    pub telegram: Option<ConfigFileTelegram>,
    /// Observability section.
    pub observability: Option<ConfigFileObservability>,
}

/// Model provider section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileLlm {
    /// API key (prefer the environment variable).
    pub api_key: Option<String>,
    /// Chat model name.
    pub model: Option<String>,
    /// Embedding model name.
    pub embedding_model: Option<String>,
    /// Base URL.
    pub base_url: Option<String>,
    /// Max retries.
    pub max_retries: Option<u32>,
    /// Retry backoff in milliseconds.
    pub retry_backoff_ms: Option<u64>,
}

/// Telegram section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileTelegram {
    /// Bot API base URL.
    pub api_url: Option<String>,
    /// Long-poll timeout in seconds.
    pub poll_timeout_secs: Option<u64>,
}

/// Observability section in the config file.
#[derive(Debug, Deserialize, Default)]
pub struct ConfigFileObservability {
    /// JSON log output.
    pub json_logs: Option<bool>,
    /// Prometheus recorder.
    pub metrics_enabled: Option<bool>,
    /// Prometheus port.
    pub metrics_port: Option<u16>,
}

impl Default for ToolscoutConfig {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("data/tool_docs.json"),
            index_dir: PathBuf::from(".toolscout/index"),
            top_k: DEFAULT_TOP_K,
            llm: LlmConfig::default(),
            telegram: TelegramConfig::default(),
            observability: ObservabilitySettings::default(),
        }
    }
}

impl ToolscoutConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a file path, then applies env overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| Error::OperationFailed {
            operation: "read_config_file".to_string(),
            cause: format!("{}: {e}", path.display()),
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| Error::OperationFailed {
            operation: "parse_config_file".to_string(),
            cause: e.to_string(),
        })?;

        Ok(Self::from_config_file(file).with_env_overrides())
    }

    /// Loads configuration from the default locations.
    ///
    /// Checks the platform config dir, then `~/.config/toolscout/`, and
    /// falls back to defaults. Environment overrides always apply.
    #[must_use]
    pub fn load_default() -> Self {
        for candidate in Self::default_config_paths() {
            if candidate.exists() {
                if let Ok(config) = Self::load_from_file(&candidate) {
                    return config;
                }
            }
        }
        Self::default().with_env_overrides()
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let Some(base_dirs) = directories::BaseDirs::new() else {
            return Vec::new();
        };
        vec![
            base_dirs.config_dir().join("toolscout").join("config.toml"),
            base_dirs
                .home_dir()
                .join(".config")
                .join("toolscout")
                .join("config.toml"),
        ]
    }

    /// Converts a `ConfigFile` to `ToolscoutConfig`.
    fn from_config_file(file: ConfigFile) -> Self {
        let mut config = Self::default();

        if let Some(data_file) = file.data_file {
            config.data_file = PathBuf::from(data_file);
        }
        if let Some(index_dir) = file.index_dir {
            config.index_dir = PathBuf::from(index_dir);
        }
        if let Some(top_k) = file.top_k {
            config.top_k = top_k.max(1);
        }
        if let Some(llm) = file.llm {
            config.llm.api_key = llm.api_key.map(SecretString::from);
            config.llm.model = llm.model;
            config.llm.embedding_model = llm.embedding_model;
            config.llm.base_url = llm.base_url;
            config.llm.max_retries = llm.max_retries;
            config.llm.retry_backoff_ms = llm.retry_backoff_ms;
        }
        if let Some(telegram) = file.telegram {
            if let Some(api_url) = telegram.api_url {
                config.telegram.api_url = api_url;
            }
            if let Some(timeout) = telegram.poll_timeout_secs {
                config.telegram.poll_timeout_secs = timeout.clamp(1, 60);
            }
        }
        if let Some(observability) = file.observability {
            if let Some(json_logs) = observability.json_logs {
                config.observability.json_logs = json_logs;
            }
            if let Some(enabled) = observability.metrics_enabled {
                config.observability.metrics_enabled = enabled;
            }
            if let Some(port) = observability.metrics_port {
                config.observability.metrics_port = port;
            }
        }

        config
    }

    /// Applies environment variable overrides, including both secrets.
    #[must_use]
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = std::env::var("TOOLSCOUT_DATA_FILE") {
            self.data_file = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_INDEX_DIR") {
            self.index_dir = PathBuf::from(v);
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_TOP_K") {
            if let Ok(top_k) = v.parse::<usize>() {
                self.top_k = top_k.max(1);
            }
        }
        if let Ok(v) = std::env::var(API_KEY_ENV) {
            if !v.is_empty() {
                self.llm.api_key = Some(SecretString::from(v));
            }
        }
        if let Ok(v) = std::env::var(BOT_TOKEN_ENV) {
            if !v.is_empty() {
                self.telegram.bot_token = Some(SecretString::from(v));
            }
        }
        if let Ok(v) = std::env::var("TOOLSCOUT_METRICS_ENABLED") {
            self.observability.metrics_enabled = matches!(v.as_str(), "1" | "true" | "yes");
        }
        self
    }

    /// Sets the knowledge-base file path.
    #[must_use]
    pub fn with_data_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_file = path.into();
        self
    }

    /// Sets the vector collection base directory.
    #[must_use]
    pub fn with_index_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.index_dir = path.into();
        self
    }
}

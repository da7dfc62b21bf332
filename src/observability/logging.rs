//! Structured logging.

use tracing_subscriber::EnvFilter;

use crate::config::ObservabilitySettings;
use crate::{Error, Result};

/// Environment variable controlling the log filter.
pub const LOG_FILTER_ENV: &str = "TOOLSCOUT_LOG";

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable output.
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Copy)]
pub struct LoggingConfig {
    /// Output format.
    pub format: LogFormat,
    /// Whether verbose (debug) output was requested.
    pub verbose: bool,
}

impl LoggingConfig {
    /// Builds logging configuration from settings and CLI flags.
    #[must_use]
    pub const fn from_settings(settings: &ObservabilitySettings, verbose: bool) -> Self {
        Self {
            format: if settings.json_logs {
                LogFormat::Json
            } else {
                LogFormat::Pretty
            },
            verbose,
        }
    }
}

/// Installs the global tracing subscriber.
///
/// # Errors
///
/// Returns an error when a subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let default_filter = if config.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_filter));

    let result = match config.format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_target(true)
            .try_init(),
    };

    result.map_err(|e| Error::OperationFailed {
        operation: "logging_init".to_string(),
        cause: e.to_string(),
    })
}

//! Observability and telemetry.

mod logging;
mod metrics;

pub use logging::{LogFormat, LoggingConfig};
pub use metrics::{MetricsConfig, install_prometheus};

use std::sync::OnceLock;

use crate::config::ObservabilitySettings;
use crate::Result;

/// Options for initialization.
#[derive(Debug, Clone, Copy)]
pub struct InitOptions {
    /// Whether verbose output was requested via CLI.
    pub verbose: bool,
    /// Whether to expose metrics via the HTTP listener.
    pub metrics_expose: bool,
}

static OBSERVABILITY_INIT: OnceLock<()> = OnceLock::new();

/// Initializes logging and metrics for the process.
///
/// Safe to call once per process; later calls are no-ops so tests and
/// embedded use cannot trip the global subscriber.
///
/// # Errors
///
/// Returns an error when a telemetry component fails to initialize.
pub fn init_from_config(settings: &ObservabilitySettings, options: InitOptions) -> Result<()> {
    if OBSERVABILITY_INIT.get().is_some() {
        return Ok(());
    }

    let logging_config = LoggingConfig::from_settings(settings, options.verbose);
    logging::init(&logging_config)?;

    let metrics_config = MetricsConfig::from_settings(settings);
    install_prometheus(&metrics_config, options.metrics_expose)?;

    let _ = OBSERVABILITY_INIT.set(());
    Ok(())
}

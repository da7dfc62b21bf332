//! Prometheus metrics.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::config::ObservabilitySettings;
use crate::{Error, Result};

/// Metrics configuration.
#[derive(Debug, Clone, Copy)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,
    /// Address to bind the metrics exporter.
    pub listen_addr: SocketAddr,
}

impl MetricsConfig {
    /// Builds metrics configuration from settings.
    #[must_use]
    pub const fn from_settings(settings: &ObservabilitySettings) -> Self {
        Self {
            enabled: settings.metrics_enabled,
            listen_addr: SocketAddr::new(
                IpAddr::V4(Ipv4Addr::UNSPECIFIED),
                settings.metrics_port,
            ),
        }
    }
}

/// Installs the Prometheus metrics recorder, optionally with the HTTP
/// scrape listener.
///
/// Without a recorder the `metrics::` macros stay no-ops, so disabled
/// metrics cost nothing.
///
/// # Errors
///
/// Returns an error when the recorder or listener cannot be installed.
pub fn install_prometheus(config: &MetricsConfig, expose: bool) -> Result<()> {
    if !config.enabled {
        return Ok(());
    }

    let builder = PrometheusBuilder::new();
    if expose {
        builder
            .with_http_listener(config.listen_addr)
            .install()
            .map_err(|e| Error::OperationFailed {
                operation: "metrics_listener_install".to_string(),
                cause: e.to_string(),
            })?;
    } else {
        builder
            .install_recorder()
            .map(|_| ())
            .map_err(|e| Error::OperationFailed {
                operation: "metrics_recorder_install".to_string(),
                cause: e.to_string(),
            })?;
    }

    tracing::info!(addr = %config.listen_addr, expose, "Prometheus metrics installed");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_settings() {
        let settings = ObservabilitySettings {
            json_logs: false,
            metrics_enabled: true,
            metrics_port: 9191,
        };
        let config = MetricsConfig::from_settings(&settings);
        assert!(config.enabled);
        assert_eq!(config.listen_addr.port(), 9191);
    }

    #[test]
    fn test_disabled_metrics_is_noop() {
        let config = MetricsConfig {
            enabled: false,
            listen_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), 9090),
        };
        assert!(install_prometheus(&config, true).is_ok());
    }
}

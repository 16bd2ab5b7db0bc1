//! Structured logging initialization.
//!
//! The subscriber is configured from [`LoggingConfig`], which the gateway
//! loads alongside the rest of its settings. A `RUST_LOG` environment
//! variable always overrides the configured filter.

use crate::error::{TelemetryError, TelemetryResult};
use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log event output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable multi-line output for interactive use.
    #[default]
    Pretty,
    /// One JSON object per event, for log shippers.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset.
    #[serde(default = "default_level")]
    pub level: String,
    /// Output format. Default: pretty.
    #[serde(default)]
    pub format: LogFormat,
}

fn default_level() -> String {
    "info,siggate=debug".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_level(),
            format: LogFormat::default(),
        }
    }
}

/// Install the global tracing subscriber.
///
/// Fails if the configured filter directive does not parse or a subscriber
/// is already installed.
pub fn init_logging(config: &LoggingConfig) -> TelemetryResult<()> {
    let env_filter = EnvFilter::try_from_default_env().or_else(|_| {
        EnvFilter::try_new(&config.level)
            .map_err(|e| TelemetryError::LoggingInit(format!("bad filter directive: {e}")))
    })?;

    let registry = tracing_subscriber::registry().with(env_filter);
    match config.format {
        LogFormat::Json => registry
            .with(
                fmt::layer()
                    .json()
                    .with_current_span(true)
                    .with_span_list(true),
            )
            .try_init(),
        LogFormat::Pretty => registry
            .with(
                fmt::layer()
                    .pretty()
                    .with_target(true)
                    .with_thread_names(true),
            )
            .try_init(),
    }
    .map_err(|e| TelemetryError::LoggingInit(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_targets_gateway_crates() {
        let config = LoggingConfig::default();
        assert_eq!(config.level, "info,siggate=debug");
        assert_eq!(config.format, LogFormat::Pretty);
    }

    #[test]
    fn test_format_parses_from_lowercase_names() {
        let json: LogFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(json, LogFormat::Json);
        let pretty: LogFormat = serde_json::from_str(r#""pretty""#).unwrap();
        assert_eq!(pretty, LogFormat::Pretty);
        assert!(serde_json::from_str::<LogFormat>(r#""yaml""#).is_err());
    }
}

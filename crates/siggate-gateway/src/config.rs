//! Gateway configuration.
//!
//! Loaded from TOML, with serde defaults for every field so a partial file
//! (or no file at all) yields a runnable configuration. [`GatewayConfig::validate`]
//! rejects inconsistent values at startup; nothing downstream re-checks them.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use siggate_admission::{CircuitBreakerConfig, IpWhitelist, RateLimitConfig};
use siggate_pipeline::{NormalizerConfig, PositionSizingConfig, ValidatorConfig};
use siggate_telemetry::LoggingConfig;
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Listen port. Default: 8000.
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_port() -> u16 {
    8000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
        }
    }
}

/// Webhook authentication and validation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// Shared HMAC secret. Can also be set via the SIGGATE_WEBHOOK_SECRET
    /// env var, which takes precedence over the file.
    #[serde(default)]
    pub secret: Option<String>,
    /// Reject unsigned requests. Default: false (verify only when signed).
    #[serde(default)]
    pub require_signature: bool,
    /// Minimum conviction score in [0, 1]. Default: 0.6.
    #[serde(default = "default_min_confidence")]
    pub min_confidence: f64,
    /// Hard cap on requested quantity. None disables the check.
    #[serde(default)]
    pub max_quantity: Option<f64>,
    /// Hard cap on price * quantity notional. None disables the check.
    #[serde(default)]
    pub max_order_value: Option<f64>,
    /// Accepted raw symbols. None accepts any symbol.
    #[serde(default)]
    pub symbol_whitelist: Option<Vec<String>>,
    /// Maximum signal age (seconds). Default: 300.
    #[serde(default = "default_stale_timeout_secs")]
    pub stale_timeout_secs: u64,
}

fn default_min_confidence() -> f64 {
    0.6
}

fn default_stale_timeout_secs() -> u64 {
    300
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret: None,
            require_signature: false,
            min_confidence: default_min_confidence(),
            max_quantity: None,
            max_order_value: None,
            symbol_whitelist: None,
            stale_timeout_secs: default_stale_timeout_secs(),
        }
    }
}

/// Per-client rate limiting configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateLimitSection {
    /// Requests per window. Default: 100.
    #[serde(default = "default_max_requests")]
    pub max_requests: usize,
    /// Window length (seconds). Default: 60.
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,
    /// Extra requests tolerated above the base limit. Default: 10.
    #[serde(default = "default_burst_allowance")]
    pub burst_allowance: usize,
}

fn default_max_requests() -> usize {
    100
}

fn default_window_secs() -> u64 {
    60
}

fn default_burst_allowance() -> usize {
    10
}

impl Default for RateLimitSection {
    fn default() -> Self {
        Self {
            max_requests: default_max_requests(),
            window_secs: default_window_secs(),
            burst_allowance: default_burst_allowance(),
        }
    }
}

/// Circuit breaker configuration for the execution backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CircuitBreakerSection {
    /// Consecutive failures before the circuit opens. Default: 5.
    #[serde(default = "default_failure_threshold")]
    pub failure_threshold: u32,
    /// Cooldown before a probe is allowed (seconds). Default: 60.
    #[serde(default = "default_breaker_timeout_secs")]
    pub timeout_secs: u64,
    /// Consecutive probe successes required to close. Default: 2.
    #[serde(default = "default_success_threshold")]
    pub success_threshold: u32,
}

fn default_failure_threshold() -> u32 {
    5
}

fn default_breaker_timeout_secs() -> u64 {
    60
}

fn default_success_threshold() -> u32 {
    2
}

impl Default for CircuitBreakerSection {
    fn default() -> Self {
        Self {
            failure_threshold: default_failure_threshold(),
            timeout_secs: default_breaker_timeout_secs(),
            success_threshold: default_success_threshold(),
        }
    }
}

/// Audit trail configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditSection {
    /// Ring buffer capacity. Default: 10000.
    #[serde(default = "default_audit_capacity")]
    pub capacity: usize,
}

fn default_audit_capacity() -> usize {
    siggate_admission::DEFAULT_AUDIT_CAPACITY
}

impl Default for AuditSection {
    fn default() -> Self {
        Self {
            capacity: default_audit_capacity(),
        }
    }
}

/// Normalizer bounds and precision.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerSection {
    /// Maximum fractional deviation of a limit price from the market
    /// reference. Default: 0.1 (10%).
    #[serde(default = "default_max_price_deviation")]
    pub max_price_deviation: f64,
    /// Minimum quantity after rounding. Default: 0.0001.
    #[serde(default = "default_min_quantity")]
    pub min_quantity: f64,
    /// Maximum quantity. Default: 1000.0.
    #[serde(default = "default_norm_max_quantity")]
    pub max_quantity: f64,
    /// Price decimal places. Default: 8.
    #[serde(default = "default_precision")]
    pub price_precision: u32,
    /// Quantity decimal places. Default: 8.
    #[serde(default = "default_precision")]
    pub quantity_precision: u32,
}

fn default_max_price_deviation() -> f64 {
    0.1
}

fn default_min_quantity() -> f64 {
    0.0001
}

fn default_norm_max_quantity() -> f64 {
    1000.0
}

fn default_precision() -> u32 {
    8
}

impl Default for NormalizerSection {
    fn default() -> Self {
        Self {
            max_price_deviation: default_max_price_deviation(),
            min_quantity: default_min_quantity(),
            max_quantity: default_norm_max_quantity(),
            price_precision: default_precision(),
            quantity_precision: default_precision(),
        }
    }
}

/// Position sizing configuration. When enabled, the sizer caps the requested
/// quantity; it never increases it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingSection {
    /// Whether sizing caps are applied. Default: false.
    #[serde(default)]
    pub enabled: bool,
    /// Account balance in quote currency. Default: 10000.0.
    #[serde(default = "default_account_balance")]
    pub account_balance: f64,
    /// Maximum balance fraction risked per trade. Default: 0.01 (1%).
    #[serde(default = "default_max_risk_per_trade")]
    pub max_risk_per_trade: f64,
    /// Maximum balance fraction in a single position. Default: 0.1 (10%).
    #[serde(default = "default_max_position_size")]
    pub max_position_size: f64,
}

fn default_account_balance() -> f64 {
    10_000.0
}

fn default_max_risk_per_trade() -> f64 {
    0.01
}

fn default_max_position_size() -> f64 {
    0.1
}

impl Default for SizingSection {
    fn default() -> Self {
        Self {
            enabled: false,
            account_balance: default_account_balance(),
            max_risk_per_trade: default_max_risk_per_trade(),
            max_position_size: default_max_position_size(),
        }
    }
}

/// Execution backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSection {
    /// Backend call timeout (seconds). Default: 10.
    #[serde(default = "default_execution_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_execution_timeout_secs() -> u64 {
    10
}

impl Default for ExecutionSection {
    fn default() -> Self {
        Self {
            timeout_secs: default_execution_timeout_secs(),
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// Allowed source IPs and CIDR blocks. Empty means allow all.
    /// Listed before the sections so TOML serialization stays valid.
    #[serde(default)]
    pub ip_whitelist: Vec<String>,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub rate_limit: RateLimitSection,
    #[serde(default)]
    pub circuit_breaker: CircuitBreakerSection,
    #[serde(default)]
    pub audit: AuditSection,
    #[serde(default)]
    pub normalizer: NormalizerSection,
    #[serde(default)]
    pub sizing: SizingSection,
    #[serde(default)]
    pub execution: ExecutionSection,
}

impl GatewayConfig {
    /// Load configuration, falling back to defaults when no file exists.
    ///
    /// Path resolution: SIGGATE_CONFIG env var, then `config/default.toml`.
    pub fn load() -> AppResult<Self> {
        let config_path =
            std::env::var("SIGGATE_CONFIG").unwrap_or_else(|_| "config/default.toml".to_string());

        if Path::new(&config_path).exists() {
            Self::from_file(&config_path)
        } else {
            tracing::warn!(path = %config_path, "Config file not found, using defaults");
            Ok(Self::default().with_env_overrides())
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config: {e}")))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))?;

        Ok(config.with_env_overrides())
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(secret) = std::env::var("SIGGATE_WEBHOOK_SECRET") {
            if !secret.is_empty() {
                self.webhook.secret = Some(secret);
            }
        }
        self
    }

    /// Reject inconsistent values before any component is constructed.
    pub fn validate(&self) -> AppResult<()> {
        if self.webhook.require_signature && self.webhook.secret.is_none() {
            return Err(AppError::Config(
                "require_signature is set but no webhook secret is configured".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.webhook.min_confidence) {
            return Err(AppError::Config(format!(
                "min_confidence must be in [0, 1], got {}",
                self.webhook.min_confidence
            )));
        }
        if self.rate_limit.max_requests == 0 {
            return Err(AppError::Config(
                "rate_limit.max_requests must be positive".to_string(),
            ));
        }
        if self.rate_limit.window_secs == 0 {
            return Err(AppError::Config(
                "rate_limit.window_secs must be positive".to_string(),
            ));
        }
        if self.circuit_breaker.failure_threshold == 0 {
            return Err(AppError::Config(
                "circuit_breaker.failure_threshold must be positive".to_string(),
            ));
        }
        if self.circuit_breaker.success_threshold == 0 {
            return Err(AppError::Config(
                "circuit_breaker.success_threshold must be positive".to_string(),
            ));
        }
        if self.audit.capacity == 0 {
            return Err(AppError::Config(
                "audit.capacity must be positive".to_string(),
            ));
        }
        if self.normalizer.max_price_deviation <= 0.0 {
            return Err(AppError::Config(
                "normalizer.max_price_deviation must be positive".to_string(),
            ));
        }
        if self.normalizer.min_quantity <= 0.0
            || self.normalizer.min_quantity >= self.normalizer.max_quantity
        {
            return Err(AppError::Config(format!(
                "normalizer quantity bounds are inconsistent: min={}, max={}",
                self.normalizer.min_quantity, self.normalizer.max_quantity
            )));
        }
        if self.execution.timeout_secs == 0 {
            return Err(AppError::Config(
                "execution.timeout_secs must be positive".to_string(),
            ));
        }
        // CIDR syntax and sizing fractions fail here rather than at first use.
        IpWhitelist::new(&self.ip_whitelist)?;
        if self.sizing.enabled {
            siggate_pipeline::PositionSizer::new(self.sizing_config())?;
        }
        Ok(())
    }

    // ===== Component config conversions =====

    pub fn validator_config(&self) -> ValidatorConfig {
        ValidatorConfig {
            min_confidence: self.webhook.min_confidence,
            max_quantity: self.webhook.max_quantity,
            max_order_value: self.webhook.max_order_value,
            symbol_whitelist: self
                .webhook
                .symbol_whitelist
                .as_ref()
                .map(|symbols| symbols.iter().cloned().collect::<HashSet<_>>()),
            stale_timeout_secs: self.webhook.stale_timeout_secs,
        }
    }

    pub fn rate_limit_config(&self) -> RateLimitConfig {
        RateLimitConfig {
            max_requests: self.rate_limit.max_requests,
            window: Duration::from_secs(self.rate_limit.window_secs),
            burst_allowance: self.rate_limit.burst_allowance,
        }
    }

    pub fn breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.circuit_breaker.failure_threshold,
            timeout: Duration::from_secs(self.circuit_breaker.timeout_secs),
            success_threshold: self.circuit_breaker.success_threshold,
        }
    }

    pub fn normalizer_config(&self) -> NormalizerConfig {
        NormalizerConfig {
            max_price_deviation: self.normalizer.max_price_deviation,
            min_quantity: self.normalizer.min_quantity,
            max_quantity: self.normalizer.max_quantity,
            price_precision: self.normalizer.price_precision,
            quantity_precision: self.normalizer.quantity_precision,
        }
    }

    pub fn sizing_config(&self) -> PositionSizingConfig {
        PositionSizingConfig {
            account_balance: self.sizing.account_balance,
            max_risk_per_trade: self.sizing.max_risk_per_trade,
            max_position_size: self.sizing.max_position_size,
        }
    }

    pub fn execution_timeout(&self) -> Duration {
        Duration::from_secs(self.execution.timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = GatewayConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.server.port, 8000);
        assert!(!config.webhook.require_signature);
    }

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [webhook]
            secret = "s3cret"
            require_signature = true

            [rate_limit]
            max_requests = 5
            "#,
        )
        .unwrap();

        assert!(config.validate().is_ok());
        assert_eq!(config.webhook.secret.as_deref(), Some("s3cret"));
        assert_eq!(config.rate_limit.max_requests, 5);
        assert_eq!(config.rate_limit.window_secs, 60);
        assert_eq!(config.circuit_breaker.failure_threshold, 5);
    }

    #[test]
    fn test_logging_section_parses_level_and_format() {
        use siggate_telemetry::LogFormat;

        let config: GatewayConfig = toml::from_str(
            r#"
            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();
        assert_eq!(config.logging.level, "debug");
        assert_eq!(config.logging.format, LogFormat::Json);

        let defaults = GatewayConfig::default();
        assert_eq!(defaults.logging.level, "info,siggate=debug");
        assert_eq!(defaults.logging.format, LogFormat::Pretty);
    }

    #[test]
    fn test_require_signature_without_secret_rejected() {
        let config: GatewayConfig = toml::from_str(
            r#"
            [webhook]
            require_signature = true
            "#,
        )
        .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_cidr_entry_rejected() {
        let mut config = GatewayConfig::default();
        config.ip_whitelist = vec!["10.0.0.0/33".to_string()];
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_bad_sizing_fraction_rejected_only_when_enabled() {
        let mut config = GatewayConfig::default();
        config.sizing.max_risk_per_trade = 1.5;
        assert!(config.validate().is_ok());

        config.sizing.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_window_rejected() {
        let mut config = GatewayConfig::default();
        config.rate_limit.window_secs = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_serialization_round_trip() {
        let config = GatewayConfig::default();
        let toml_str = toml::to_string(&config).unwrap();
        let parsed: GatewayConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.server.port, config.server.port);
        assert_eq!(parsed.normalizer.max_quantity, config.normalizer.max_quantity);
    }
}

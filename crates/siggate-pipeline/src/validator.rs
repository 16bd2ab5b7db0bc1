//! Structural and policy validation of inbound signals.

use chrono::Utc;
use siggate_core::{OrderType, Signal, ValidationError};
use std::collections::HashSet;
use tracing::debug;

/// Allowed clock skew for future-dated timestamps.
const CLOCK_SKEW_TOLERANCE_SECS: i64 = 60;

/// Validation policy.
#[derive(Debug, Clone)]
pub struct ValidatorConfig {
    /// Minimum confidence; lower-conviction signals are rejected.
    pub min_confidence: f64,
    /// Maximum order quantity. `None` = unlimited.
    pub max_quantity: Option<f64>,
    /// Maximum order value (price x quantity). `None` = unlimited.
    pub max_order_value: Option<f64>,
    /// Allowed symbols. `None` = all symbols.
    pub symbol_whitelist: Option<HashSet<String>>,
    /// Reject signals older than this many seconds.
    pub stale_timeout_secs: u64,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            min_confidence: 0.6,
            max_quantity: None,
            max_order_value: None,
            symbol_whitelist: None,
            stale_timeout_secs: 300,
        }
    }
}

/// Enforces the admission policy on a parsed [`Signal`].
///
/// Checks run in a fixed order and the first failure wins. A signal that
/// passes here is structurally sound but not yet normalized; numeric
/// hygiene (NaN, infinity, precision) belongs to the normalizer.
pub struct PayloadValidator {
    config: ValidatorConfig,
}

impl PayloadValidator {
    pub fn new(config: ValidatorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Validate against policy, using the current wall clock for staleness.
    pub fn validate(&self, signal: &Signal) -> Result<(), ValidationError> {
        self.validate_at(signal, Utc::now().timestamp_millis())
    }

    fn validate_at(&self, signal: &Signal, now_ms: i64) -> Result<(), ValidationError> {
        if signal.symbol.trim().is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        // Quantity sanity; precision and NaN handling come later in the
        // normalizer, but an obviously bad quantity fails fast here.
        if !(signal.quantity > 0.0) {
            return Err(ValidationError::NonPositiveQuantity(signal.quantity));
        }
        if let Some(max) = self.config.max_quantity {
            if signal.quantity > max {
                return Err(ValidationError::QuantityAboveMax {
                    quantity: signal.quantity,
                    max,
                });
            }
        }

        if signal.order_type == OrderType::Limit && signal.price.is_none() {
            return Err(ValidationError::LimitOrderWithoutPrice);
        }

        if !(0.0..=1.0).contains(&signal.confidence) {
            return Err(ValidationError::ConfidenceOutOfRange(signal.confidence));
        }
        if signal.confidence < self.config.min_confidence {
            debug!(
                symbol = %signal.symbol,
                confidence = signal.confidence,
                min = self.config.min_confidence,
                "Signal filtered on confidence"
            );
            return Err(ValidationError::LowConfidence {
                confidence: signal.confidence,
                min: self.config.min_confidence,
            });
        }

        if let Some(timestamp_ms) = signal.timestamp {
            let age_secs = (now_ms - timestamp_ms) / 1000;
            if age_secs > self.config.stale_timeout_secs as i64 {
                return Err(ValidationError::StaleSignal {
                    age_secs,
                    max_secs: self.config.stale_timeout_secs,
                });
            }
            if age_secs < -CLOCK_SKEW_TOLERANCE_SECS {
                return Err(ValidationError::FutureTimestamp {
                    skew_secs: -age_secs - CLOCK_SKEW_TOLERANCE_SECS,
                });
            }
        }

        if let (Some(max), Some(price)) = (self.config.max_order_value, signal.price) {
            let value = price * signal.quantity;
            if value > max {
                return Err(ValidationError::OrderValueExceeded { value, max });
            }
        }

        if let Some(whitelist) = &self.config.symbol_whitelist {
            if !whitelist.contains(&signal.symbol) {
                return Err(ValidationError::SymbolNotWhitelisted {
                    symbol: signal.symbol.clone(),
                });
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use siggate_core::Side;

    fn signal() -> Signal {
        Signal {
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: 0.5,
            price: None,
            stop_loss: None,
            take_profit: None,
            confidence: 1.0,
            exchange: None,
            timestamp: None,
        }
    }

    fn validator(config: ValidatorConfig) -> PayloadValidator {
        PayloadValidator::new(config)
    }

    #[test]
    fn test_valid_signal_passes() {
        let v = validator(ValidatorConfig::default());
        assert!(v.validate(&signal()).is_ok());
    }

    #[test]
    fn test_non_positive_quantity_rejected() {
        let v = validator(ValidatorConfig::default());
        let mut s = signal();
        s.quantity = 0.0;
        assert_eq!(
            v.validate(&s),
            Err(ValidationError::NonPositiveQuantity(0.0))
        );
        s.quantity = -1.0;
        assert!(v.validate(&s).is_err());
    }

    #[test]
    fn test_quantity_above_max_rejected() {
        let v = validator(ValidatorConfig {
            max_quantity: Some(1.0),
            ..Default::default()
        });
        let mut s = signal();
        s.quantity = 1.5;
        assert!(matches!(
            v.validate(&s),
            Err(ValidationError::QuantityAboveMax { .. })
        ));
    }

    #[test]
    fn test_limit_order_requires_price() {
        let v = validator(ValidatorConfig::default());
        let mut s = signal();
        s.order_type = OrderType::Limit;
        assert_eq!(v.validate(&s), Err(ValidationError::LimitOrderWithoutPrice));

        s.price = Some(67_000.0);
        assert!(v.validate(&s).is_ok());
    }

    #[test]
    fn test_confidence_out_of_range_vs_low_confidence() {
        let v = validator(ValidatorConfig {
            min_confidence: 0.6,
            ..Default::default()
        });

        let mut s = signal();
        s.confidence = 1.5;
        assert_eq!(v.validate(&s), Err(ValidationError::ConfidenceOutOfRange(1.5)));

        s.confidence = 0.3;
        // Distinct rejection reason, never reaches later stages.
        assert!(matches!(
            v.validate(&s),
            Err(ValidationError::LowConfidence { .. })
        ));

        s.confidence = 0.6;
        assert!(v.validate(&s).is_ok());
    }

    #[test]
    fn test_stale_signal_rejected() {
        let v = validator(ValidatorConfig {
            stale_timeout_secs: 300,
            ..Default::default()
        });
        let now_ms = 1_700_000_000_000;

        let mut s = signal();
        s.timestamp = Some(now_ms - 301_000);
        assert!(matches!(
            v.validate_at(&s, now_ms),
            Err(ValidationError::StaleSignal { age_secs: 301, .. })
        ));

        s.timestamp = Some(now_ms - 299_000);
        assert!(v.validate_at(&s, now_ms).is_ok());
    }

    #[test]
    fn test_future_timestamp_rejected_beyond_skew() {
        let v = validator(ValidatorConfig::default());
        let now_ms = 1_700_000_000_000;

        let mut s = signal();
        // 60s skew is tolerated.
        s.timestamp = Some(now_ms + 59_000);
        assert!(v.validate_at(&s, now_ms).is_ok());

        s.timestamp = Some(now_ms + 120_000);
        assert!(matches!(
            v.validate_at(&s, now_ms),
            Err(ValidationError::FutureTimestamp { .. })
        ));
    }

    #[test]
    fn test_order_value_ceiling() {
        let v = validator(ValidatorConfig {
            max_order_value: Some(10_000.0),
            ..Default::default()
        });
        let mut s = signal();
        s.price = Some(67_000.0);
        s.quantity = 0.5;
        assert!(matches!(
            v.validate(&s),
            Err(ValidationError::OrderValueExceeded { .. })
        ));

        s.quantity = 0.1;
        assert!(v.validate(&s).is_ok());

        // No price present: ceiling cannot apply to market orders.
        s.price = None;
        s.quantity = 100.0;
        assert!(v.validate(&s).is_ok());
    }

    #[test]
    fn test_symbol_whitelist() {
        let v = validator(ValidatorConfig {
            symbol_whitelist: Some(
                ["BTC/USDT".to_string(), "ETH/USDT".to_string()]
                    .into_iter()
                    .collect(),
            ),
            ..Default::default()
        });

        assert!(v.validate(&signal()).is_ok());

        let mut s = signal();
        s.symbol = "DOGE/USDT".to_string();
        assert!(matches!(
            v.validate(&s),
            Err(ValidationError::SymbolNotWhitelisted { .. })
        ));
    }

    #[test]
    fn test_empty_symbol_rejected() {
        let v = validator(ValidatorConfig::default());
        let mut s = signal();
        s.symbol = "  ".to_string();
        assert_eq!(v.validate(&s), Err(ValidationError::EmptySymbol));
    }
}

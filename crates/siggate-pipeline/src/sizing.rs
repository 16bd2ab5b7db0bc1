//! Risk-based position sizing.

use siggate_core::SizingError;

/// Relative volatility at which the volatility-adjusted strategy applies the
/// full base percentage; higher relative volatility shrinks size.
const REFERENCE_VOLATILITY: f64 = 0.01;

/// Sizing limits. Both fractions must lie in (0, 1] and balance must be
/// positive; construction fails fast otherwise.
#[derive(Debug, Clone)]
pub struct PositionSizingConfig {
    /// Total account balance in quote currency.
    pub account_balance: f64,
    /// Max fraction of capital risked per trade.
    pub max_risk_per_trade: f64,
    /// Max fraction of capital per position.
    pub max_position_size: f64,
}

impl Default for PositionSizingConfig {
    fn default() -> Self {
        Self {
            account_balance: 10_000.0,
            max_risk_per_trade: 0.01,
            max_position_size: 0.1,
        }
    }
}

/// Computes order quantities from risk parameters.
///
/// Three strategies, selectable per call: fixed percentage of capital,
/// risk-based (capital fraction at risk between entry and stop), and
/// volatility-adjusted. All reject non-positive price or balance inputs.
pub struct PositionSizer {
    config: PositionSizingConfig,
}

impl PositionSizer {
    pub fn new(config: PositionSizingConfig) -> Result<Self, SizingError> {
        if config.account_balance <= 0.0 {
            return Err(SizingError::NonPositiveBalance(config.account_balance));
        }
        Self::check_fraction("max_risk_per_trade", config.max_risk_per_trade)?;
        Self::check_fraction("max_position_size", config.max_position_size)?;
        Ok(Self { config })
    }

    fn check_fraction(name: &'static str, value: f64) -> Result<(), SizingError> {
        if !(value > 0.0 && value <= 1.0) {
            return Err(SizingError::FractionOutOfRange { name, value });
        }
        Ok(())
    }

    pub fn config(&self) -> &PositionSizingConfig {
        &self.config
    }

    /// Position size as a fixed percentage of capital, capped at the
    /// configured maximum position fraction.
    pub fn fixed_percentage(&self, percentage: f64, price: f64) -> Result<f64, SizingError> {
        Self::check_fraction("percentage", percentage)?;
        if price <= 0.0 {
            return Err(SizingError::NonPositivePrice(price));
        }

        let fraction = percentage.min(self.config.max_position_size);
        Ok(self.config.account_balance * fraction / price)
    }

    /// Size so that the loss from entry to stop equals the risked capital
    /// fraction:
    /// `size = (balance x risk_pct) / |entry - stop|`, capped by the
    /// fixed-percentage result at the max position fraction.
    ///
    /// Entry price equal to stop loss is a hard error (zero risk distance).
    pub fn risk_based(
        &self,
        entry_price: f64,
        stop_loss: f64,
        risk_percentage: Option<f64>,
    ) -> Result<f64, SizingError> {
        if entry_price <= 0.0 {
            return Err(SizingError::NonPositivePrice(entry_price));
        }
        if stop_loss <= 0.0 {
            return Err(SizingError::NonPositivePrice(stop_loss));
        }

        let risk_per_unit = (entry_price - stop_loss).abs();
        if risk_per_unit == 0.0 {
            return Err(SizingError::ZeroStopDistance);
        }

        let risk_pct = match risk_percentage {
            Some(pct) => {
                Self::check_fraction("risk_percentage", pct)?;
                pct.min(self.config.max_risk_per_trade)
            }
            None => self.config.max_risk_per_trade,
        };

        let size = self.config.account_balance * risk_pct / risk_per_unit;
        let max_size = self.fixed_percentage(self.config.max_position_size, entry_price)?;
        Ok(size.min(max_size))
    }

    /// Scale a base percentage down as relative volatility rises:
    /// `factor = min(1, reference_vol / (volatility / price))`. The result
    /// shrinks monotonically with volatility and delegates to
    /// [`Self::fixed_percentage`].
    pub fn volatility_adjusted(
        &self,
        price: f64,
        volatility: f64,
        base_percentage: f64,
    ) -> Result<f64, SizingError> {
        if price <= 0.0 {
            return Err(SizingError::NonPositivePrice(price));
        }
        if volatility < 0.0 {
            return Err(SizingError::NegativeVolatility(volatility));
        }
        Self::check_fraction("base_percentage", base_percentage)?;

        let relative_vol = if volatility > 0.0 {
            volatility / price
        } else {
            REFERENCE_VOLATILITY
        };
        let factor = (REFERENCE_VOLATILITY / relative_vol).min(1.0);

        self.fixed_percentage(base_percentage * factor, price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sizer() -> PositionSizer {
        PositionSizer::new(PositionSizingConfig {
            account_balance: 10_000.0,
            max_risk_per_trade: 0.02,
            max_position_size: 0.1,
        })
        .unwrap()
    }

    #[test]
    fn test_construction_fails_fast_on_bad_config() {
        assert!(matches!(
            PositionSizer::new(PositionSizingConfig {
                account_balance: 0.0,
                ..Default::default()
            }),
            Err(SizingError::NonPositiveBalance(_))
        ));
        assert!(matches!(
            PositionSizer::new(PositionSizingConfig {
                max_risk_per_trade: 1.5,
                ..Default::default()
            }),
            Err(SizingError::FractionOutOfRange { .. })
        ));
        assert!(matches!(
            PositionSizer::new(PositionSizingConfig {
                max_position_size: 0.0,
                ..Default::default()
            }),
            Err(SizingError::FractionOutOfRange { .. })
        ));
    }

    #[test]
    fn test_fixed_percentage() {
        let sizer = sizer();
        // 5% of 10_000 at price 100 -> 5 units.
        assert_eq!(sizer.fixed_percentage(0.05, 100.0).unwrap(), 5.0);
        // Requested 50% is capped at max_position_size 10%.
        assert_eq!(sizer.fixed_percentage(0.5, 100.0).unwrap(), 10.0);
    }

    #[test]
    fn test_fixed_percentage_rejects_bad_inputs() {
        let sizer = sizer();
        assert!(sizer.fixed_percentage(0.0, 100.0).is_err());
        assert!(sizer.fixed_percentage(0.05, 0.0).is_err());
        assert!(sizer.fixed_percentage(0.05, -1.0).is_err());
    }

    #[test]
    fn test_risk_based_reference_case() {
        let sizer = sizer();
        // balance=10000, risk=2%, entry=100, stop=95 -> 200 / 5 = 40 units,
        // larger than the 10% cap of 10 units, so the cap wins.
        let size = sizer.risk_based(100.0, 95.0, Some(0.02)).unwrap();
        assert_eq!(size, 10.0);
    }

    #[test]
    fn test_risk_based_uncapped() {
        let sizer = PositionSizer::new(PositionSizingConfig {
            account_balance: 10_000.0,
            max_risk_per_trade: 0.02,
            max_position_size: 1.0,
        })
        .unwrap();
        // Cap of 100% (100 units at price 100) leaves the risk formula:
        // (10000 x 0.02) / 5 = 40 units.
        let size = sizer.risk_based(100.0, 95.0, Some(0.02)).unwrap();
        assert_eq!(size, 40.0);
    }

    #[test]
    fn test_risk_based_clamps_requested_risk() {
        let sizer = sizer(); // max risk 2%
        let clamped = sizer.risk_based(100.0, 90.0, Some(0.5)).unwrap();
        let at_max = sizer.risk_based(100.0, 90.0, Some(0.02)).unwrap();
        assert_eq!(clamped, at_max);
    }

    #[test]
    fn test_risk_based_defaults_to_max_risk() {
        let sizer = sizer();
        assert_eq!(
            sizer.risk_based(100.0, 90.0, None).unwrap(),
            sizer.risk_based(100.0, 90.0, Some(0.02)).unwrap()
        );
    }

    #[test]
    fn test_zero_stop_distance_is_hard_error() {
        let sizer = sizer();
        assert_eq!(
            sizer.risk_based(100.0, 100.0, None),
            Err(SizingError::ZeroStopDistance)
        );
    }

    #[test]
    fn test_risk_based_rejects_non_positive_prices() {
        let sizer = sizer();
        assert!(sizer.risk_based(0.0, 95.0, None).is_err());
        assert!(sizer.risk_based(100.0, -95.0, None).is_err());
    }

    #[test]
    fn test_volatility_shrinks_size_monotonically() {
        let sizer = sizer();
        let calm = sizer.volatility_adjusted(100.0, 1.0, 0.05).unwrap();
        let rough = sizer.volatility_adjusted(100.0, 5.0, 0.05).unwrap();
        let wild = sizer.volatility_adjusted(100.0, 20.0, 0.05).unwrap();
        assert!(calm >= rough);
        assert!(rough >= wild);
    }

    #[test]
    fn test_volatility_factor_caps_at_one() {
        let sizer = sizer();
        // Volatility below reference must not inflate the base size.
        let tiny_vol = sizer.volatility_adjusted(100.0, 0.1, 0.05).unwrap();
        let base = sizer.fixed_percentage(0.05, 100.0).unwrap();
        assert_eq!(tiny_vol, base);
    }

    #[test]
    fn test_negative_volatility_rejected() {
        let sizer = sizer();
        assert_eq!(
            sizer.volatility_adjusted(100.0, -1.0, 0.05),
            Err(SizingError::NegativeVolatility(-1.0))
        );
    }
}

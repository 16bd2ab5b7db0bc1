//! Canonicalization of symbols, numerics and precision.
//!
//! Prices and quantities are rounded toward zero: rounding up could create an
//! order exceeding the intended risk or price deviation bound.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use siggate_core::{NormalizedOrder, Signal, ValidationError};

/// Known quote currencies, longer tickers first so that e.g. "USDT" wins
/// over "USD" when splitting "BTCUSDT".
const QUOTE_CURRENCIES: [&str; 7] = ["USDT", "BUSD", "USDC", "USD", "BTC", "ETH", "BNB"];

/// Normalization bounds and precision.
#[derive(Debug, Clone)]
pub struct NormalizerConfig {
    /// Max allowed fraction of deviation from the market reference price.
    pub max_price_deviation: f64,
    /// Minimum order quantity after normalization.
    pub min_quantity: f64,
    /// Maximum order quantity after normalization.
    pub max_quantity: f64,
    /// Decimal places kept on prices.
    pub price_precision: u32,
    /// Decimal places kept on quantities.
    pub quantity_precision: u32,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            max_price_deviation: 0.1,
            min_quantity: 0.0001,
            max_quantity: 1000.0,
            price_precision: 8,
            quantity_precision: 8,
        }
    }
}

/// Canonicalizes an accepted signal into a [`NormalizedOrder`].
pub struct DataNormalizer {
    config: NormalizerConfig,
}

impl DataNormalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    /// Normalize a symbol to canonical `BASE/QUOTE` form.
    ///
    /// Already-slashed pairs are upper-cased unchanged; otherwise separators
    /// are stripped and the longest known quote-currency suffix splits
    /// base from quote. No known quote suffix is a hard error.
    pub fn normalize_symbol(&self, symbol: &str) -> Result<String, ValidationError> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptySymbol);
        }

        if trimmed.contains('/') {
            return Ok(trimmed.to_uppercase());
        }

        let clean = trimmed.to_uppercase().replace(['-', '_'], "");
        for quote in QUOTE_CURRENCIES {
            if let Some(base) = clean.strip_suffix(quote) {
                if !base.is_empty() {
                    return Ok(format!("{base}/{quote}"));
                }
            }
        }

        Err(ValidationError::UnknownQuoteCurrency(symbol.to_string()))
    }

    /// Reject absent, NaN and infinite values with distinct reasons.
    pub fn clean_numeric(
        &self,
        value: Option<f64>,
        field: &'static str,
    ) -> Result<f64, ValidationError> {
        let value = value.ok_or(ValidationError::MissingValue { field })?;
        if value.is_nan() {
            return Err(ValidationError::NanValue { field });
        }
        if value.is_infinite() {
            return Err(ValidationError::InfiniteValue { field });
        }
        Ok(value)
    }

    /// Round toward zero to `precision` decimal places.
    fn round_down(
        &self,
        value: f64,
        precision: u32,
        field: &'static str,
    ) -> Result<Decimal, ValidationError> {
        let decimal = Decimal::from_f64(value).ok_or(ValidationError::NanValue { field })?;
        Ok(decimal.round_dp_with_strategy(precision, RoundingStrategy::ToZero))
    }

    /// Validate and round a price. When a market reference price is supplied,
    /// reject prices deviating from it by more than the configured fraction.
    pub fn normalize_price(
        &self,
        price: f64,
        market_price: Option<f64>,
    ) -> Result<Decimal, ValidationError> {
        let price = self.clean_numeric(Some(price), "price")?;
        if price <= 0.0 {
            return Err(ValidationError::NonPositivePrice(price));
        }

        if let Some(market_price) = market_price {
            let market_price = self.clean_numeric(Some(market_price), "market_price")?;
            if market_price > 0.0 {
                let deviation = (price - market_price).abs() / market_price;
                if deviation > self.config.max_price_deviation {
                    return Err(ValidationError::PriceDeviation {
                        price,
                        market_price,
                        deviation,
                        max_deviation: self.config.max_price_deviation,
                    });
                }
            }
        }

        self.round_down(price, self.config.price_precision, "price")
    }

    /// Validate and round a quantity against the configured range.
    pub fn normalize_quantity(&self, quantity: f64) -> Result<Decimal, ValidationError> {
        let quantity = self.clean_numeric(Some(quantity), "quantity")?;
        if quantity <= 0.0 {
            return Err(ValidationError::NonPositiveQuantity(quantity));
        }
        if quantity < self.config.min_quantity {
            return Err(ValidationError::QuantityBelowMin {
                quantity,
                min: self.config.min_quantity,
            });
        }
        if quantity > self.config.max_quantity {
            return Err(ValidationError::QuantityAboveMax {
                quantity,
                max: self.config.max_quantity,
            });
        }

        let rounded = self.round_down(quantity, self.config.quantity_precision, "quantity")?;
        if rounded <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveQuantity(quantity));
        }
        Ok(rounded)
    }

    /// Build a [`NormalizedOrder`] from a validated signal.
    ///
    /// Only the limit price is checked against the market reference;
    /// stop-loss and take-profit levels are intentionally distant from it.
    pub fn normalize(
        &self,
        signal: &Signal,
        market_price: Option<f64>,
    ) -> Result<NormalizedOrder, ValidationError> {
        let symbol = self.normalize_symbol(&signal.symbol)?;
        let quantity = self.normalize_quantity(signal.quantity)?;

        let price = signal
            .price
            .map(|p| self.normalize_price(p, market_price))
            .transpose()?;
        let stop_loss = signal
            .stop_loss
            .map(|p| self.normalize_price(p, None))
            .transpose()?;
        let take_profit = signal
            .take_profit
            .map(|p| self.normalize_price(p, None))
            .transpose()?;

        Ok(NormalizedOrder {
            symbol,
            side: signal.side,
            order_type: signal.order_type,
            quantity,
            price,
            stop_loss,
            take_profit,
            confidence: signal.confidence,
            exchange: signal.exchange.clone(),
        })
    }
}

impl Default for DataNormalizer {
    fn default() -> Self {
        Self::new(NormalizerConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use siggate_core::{OrderType, Side};

    fn normalizer() -> DataNormalizer {
        DataNormalizer::default()
    }

    #[test]
    fn test_symbol_variants_normalize_identically() {
        let n = normalizer();
        for raw in ["BTCUSDT", "BTC-USDT", "btc_usdt", "BTC/USDT", "btc/usdt"] {
            assert_eq!(n.normalize_symbol(raw).unwrap(), "BTC/USDT", "input {raw}");
        }
    }

    #[test]
    fn test_symbol_normalization_is_idempotent() {
        let n = normalizer();
        let once = n.normalize_symbol("eth-btc").unwrap();
        let twice = n.normalize_symbol(&once).unwrap();
        assert_eq!(once, twice);
        assert_eq!(once, "ETH/BTC");
    }

    #[test]
    fn test_longest_quote_suffix_wins() {
        let n = normalizer();
        // "USDT" must win over "USD" despite both matching as suffixes.
        assert_eq!(n.normalize_symbol("SOLUSDT").unwrap(), "SOL/USDT");
        assert_eq!(n.normalize_symbol("SOLUSD").unwrap(), "SOL/USD");
    }

    #[test]
    fn test_unknown_quote_is_hard_error() {
        let n = normalizer();
        assert!(matches!(
            n.normalize_symbol("BTCXYZ"),
            Err(ValidationError::UnknownQuoteCurrency(_))
        ));
    }

    #[test]
    fn test_bare_quote_has_no_base() {
        let n = normalizer();
        // "USDT" alone leaves an empty base and cannot be split.
        assert!(n.normalize_symbol("USDT").is_err());
    }

    #[test]
    fn test_clean_numeric_distinct_failures() {
        let n = normalizer();
        assert_eq!(
            n.clean_numeric(None, "price"),
            Err(ValidationError::MissingValue { field: "price" })
        );
        assert_eq!(
            n.clean_numeric(Some(f64::NAN), "price"),
            Err(ValidationError::NanValue { field: "price" })
        );
        assert_eq!(
            n.clean_numeric(Some(f64::INFINITY), "price"),
            Err(ValidationError::InfiniteValue { field: "price" })
        );
        assert_eq!(n.clean_numeric(Some(-1.5), "price"), Ok(-1.5));
    }

    #[test]
    fn test_price_rounds_toward_zero() {
        let n = DataNormalizer::new(NormalizerConfig {
            price_precision: 2,
            ..Default::default()
        });
        // 67000.999 must not round up to 67001.00.
        assert_eq!(n.normalize_price(67000.999, None).unwrap(), dec!(67000.99));
    }

    #[test]
    fn test_quantity_rounds_toward_zero() {
        let n = DataNormalizer::new(NormalizerConfig {
            quantity_precision: 4,
            ..Default::default()
        });
        assert_eq!(n.normalize_quantity(0.123456).unwrap(), dec!(0.1234));
    }

    #[test]
    fn test_price_deviation_check() {
        let n = normalizer(); // max deviation 10%
        assert!(n.normalize_price(105.0, Some(100.0)).is_ok());
        assert!(matches!(
            n.normalize_price(111.0, Some(100.0)),
            Err(ValidationError::PriceDeviation { .. })
        ));
        assert!(matches!(
            n.normalize_price(89.0, Some(100.0)),
            Err(ValidationError::PriceDeviation { .. })
        ));
    }

    #[test]
    fn test_non_positive_price_rejected() {
        let n = normalizer();
        assert!(matches!(
            n.normalize_price(0.0, None),
            Err(ValidationError::NonPositivePrice(_))
        ));
        assert!(n.normalize_price(-5.0, None).is_err());
    }

    #[test]
    fn test_quantity_range() {
        let n = DataNormalizer::new(NormalizerConfig {
            min_quantity: 0.01,
            max_quantity: 10.0,
            ..Default::default()
        });
        assert!(matches!(
            n.normalize_quantity(0.001),
            Err(ValidationError::QuantityBelowMin { .. })
        ));
        assert!(matches!(
            n.normalize_quantity(11.0),
            Err(ValidationError::QuantityAboveMax { .. })
        ));
        assert_eq!(n.normalize_quantity(5.0).unwrap(), dec!(5.0));
    }

    #[test]
    fn test_normalize_full_signal() {
        let n = normalizer();
        let signal = Signal {
            symbol: "btc_usdt".to_string(),
            side: Side::Sell,
            order_type: OrderType::Limit,
            quantity: 0.5,
            price: Some(67_000.0),
            stop_loss: Some(68_000.0),
            take_profit: Some(65_000.0),
            confidence: 0.8,
            exchange: Some("binance".to_string()),
            timestamp: None,
        };

        let order = n.normalize(&signal, Some(66_500.0)).unwrap();
        assert_eq!(order.symbol, "BTC/USDT");
        assert_eq!(order.side, Side::Sell);
        assert_eq!(order.quantity, dec!(0.5));
        assert_eq!(order.price, Some(dec!(67000)));
        assert_eq!(order.stop_loss, Some(dec!(68000)));
        assert_eq!(order.take_profit, Some(dec!(65000)));
        assert_eq!(order.exchange.as_deref(), Some("binance"));
    }

    #[test]
    fn test_normalize_propagates_first_failure() {
        let n = normalizer();
        let signal = Signal {
            symbol: "BTCXYZ".to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: 1.0,
            price: None,
            stop_loss: None,
            take_profit: None,
            confidence: 1.0,
            exchange: None,
            timestamp: None,
        };
        assert!(matches!(
            n.normalize(&signal, None),
            Err(ValidationError::UnknownQuoteCurrency(_))
        ));
    }
}

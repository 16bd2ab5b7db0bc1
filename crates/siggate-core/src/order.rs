//! Normalized order derived from an accepted signal.

use crate::signal::{OrderType, Side};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order that passed validation, normalization and sizing.
///
/// Created once per accepted [`crate::Signal`] and never mutated afterwards.
/// The symbol is canonical `BASE/QUOTE`, quantity and prices are rounded
/// toward zero to the configured precision and are guaranteed finite and
/// positive.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedOrder {
    /// Canonical symbol, e.g. "BTC/USDT".
    pub symbol: String,
    pub side: Side,
    pub order_type: OrderType,
    /// Quantity in asset units, rounded down.
    pub quantity: Decimal,
    /// Limit price, rounded down. Present for limit orders.
    pub price: Option<Decimal>,
    pub stop_loss: Option<Decimal>,
    pub take_profit: Option<Decimal>,
    /// Conviction score carried through for downstream bookkeeping.
    pub confidence: f64,
    pub exchange: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_normalized_order_serializes_decimals_as_strings() {
        let order = NormalizedOrder {
            symbol: "BTC/USDT".to_string(),
            side: Side::Buy,
            order_type: OrderType::Limit,
            quantity: dec!(0.01),
            price: Some(dec!(67000.0)),
            stop_loss: None,
            take_profit: None,
            confidence: 1.0,
            exchange: None,
        };

        let json = serde_json::to_string(&order).unwrap();
        assert!(json.contains("\"BTC/USDT\""));
        assert!(json.contains("\"buy\""));

        let back: NormalizedOrder = serde_json::from_str(&json).unwrap();
        assert_eq!(back.quantity, dec!(0.01));
        assert_eq!(back.price, Some(dec!(67000.0)));
    }
}

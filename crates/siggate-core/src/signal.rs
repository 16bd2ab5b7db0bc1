//! Raw inbound trading signal.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Order side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Buy,
    Sell,
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "buy"),
            Side::Sell => write!(f, "sell"),
        }
    }
}

/// Order type accepted from the alert source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderType {
    Market,
    Limit,
    StopLoss,
    TakeProfit,
}

impl fmt::Display for OrderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderType::Market => write!(f, "market"),
            OrderType::Limit => write!(f, "limit"),
            OrderType::StopLoss => write!(f, "stop_loss"),
            OrderType::TakeProfit => write!(f, "take_profit"),
        }
    }
}

/// Raw inbound alert as posted by the signal source.
///
/// Parsed once from the request body and never mutated afterwards. Numeric
/// fields stay `f64` until the normalizer has cleaned them; the normalized
/// representation lives in [`crate::NormalizedOrder`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signal {
    /// Trading symbol as sent (e.g. "BTCUSDT", "BTC-USDT", "BTC/USDT").
    pub symbol: String,
    /// Order side.
    pub side: Side,
    /// Order type.
    pub order_type: OrderType,
    /// Requested quantity in asset units.
    pub quantity: f64,
    /// Limit price (required for limit orders).
    #[serde(default)]
    pub price: Option<f64>,
    /// Stop-loss price.
    #[serde(default)]
    pub stop_loss: Option<f64>,
    /// Take-profit price.
    #[serde(default)]
    pub take_profit: Option<f64>,
    /// Caller-supplied conviction score in [0, 1]. Defaults to 1.0.
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// Target exchange id. The backend picks its default when absent.
    #[serde(default)]
    pub exchange: Option<String>,
    /// Alert creation time, epoch milliseconds.
    #[serde(default)]
    pub timestamp: Option<i64>,
}

fn default_confidence() -> f64 {
    1.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_deserialization_minimal() {
        let signal: Signal = serde_json::from_str(
            r#"{"symbol": "BTC/USDT", "side": "buy", "order_type": "market", "quantity": 0.01}"#,
        )
        .unwrap();

        assert_eq!(signal.symbol, "BTC/USDT");
        assert_eq!(signal.side, Side::Buy);
        assert_eq!(signal.order_type, OrderType::Market);
        assert_eq!(signal.confidence, 1.0);
        assert!(signal.price.is_none());
        assert!(signal.timestamp.is_none());
    }

    #[test]
    fn test_signal_deserialization_full() {
        let signal: Signal = serde_json::from_str(
            r#"{
                "symbol": "ETH/USDT",
                "side": "sell",
                "order_type": "limit",
                "quantity": 0.5,
                "price": 3500.0,
                "stop_loss": 3600.0,
                "take_profit": 3400.0,
                "confidence": 0.7,
                "exchange": "binance",
                "timestamp": 1699113600000
            }"#,
        )
        .unwrap();

        assert_eq!(signal.side, Side::Sell);
        assert_eq!(signal.order_type, OrderType::Limit);
        assert_eq!(signal.price, Some(3500.0));
        assert_eq!(signal.confidence, 0.7);
        assert_eq!(signal.timestamp, Some(1_699_113_600_000));
    }

    #[test]
    fn test_signal_rejects_unknown_side() {
        let result = serde_json::from_str::<Signal>(
            r#"{"symbol": "BTC/USDT", "side": "hold", "order_type": "market", "quantity": 1.0}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_signal_rejects_missing_quantity() {
        let result = serde_json::from_str::<Signal>(
            r#"{"symbol": "BTC/USDT", "side": "buy", "order_type": "market"}"#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_order_type_snake_case() {
        let signal: Signal = serde_json::from_str(
            r#"{"symbol": "BTC/USDT", "side": "sell", "order_type": "stop_loss", "quantity": 1.0}"#,
        )
        .unwrap();
        assert_eq!(signal.order_type, OrderType::StopLoss);
        assert_eq!(signal.order_type.to_string(), "stop_loss");
    }
}

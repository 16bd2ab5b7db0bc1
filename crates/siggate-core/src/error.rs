//! Error taxonomy for the admission pipeline.
//!
//! Every expected rejection is a typed error carried in a `Result`, never a
//! panic. Each `ValidationError` maps to a stable machine-readable reason
//! code used both in HTTP responses and as a metric label.

use thiserror::Error;

/// Webhook signature verification failure. Terminal for the request.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignatureError {
    #[error("webhook secret not configured but signature required")]
    SecretNotConfigured,

    #[error("signature missing from webhook")]
    MissingSignature,

    #[error("invalid webhook signature")]
    InvalidSignature,
}

/// Malformed or out-of-policy signal. Terminal for the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("invalid JSON payload: {0}")]
    InvalidJson(String),

    #[error("symbol {symbol} not in whitelist")]
    SymbolNotWhitelisted { symbol: String },

    #[error("cannot normalize symbol: {0}")]
    UnknownQuoteCurrency(String),

    #[error("symbol is empty")]
    EmptySymbol,

    #[error("{field} is missing")]
    MissingValue { field: &'static str },

    #[error("{field} is NaN")]
    NanValue { field: &'static str },

    #[error("{field} is infinite")]
    InfiniteValue { field: &'static str },

    #[error("price must be positive: {0}")]
    NonPositivePrice(f64),

    #[error("price {price} deviates {deviation:.4} from market {market_price} (max {max_deviation})")]
    PriceDeviation {
        price: f64,
        market_price: f64,
        deviation: f64,
        max_deviation: f64,
    },

    #[error("quantity must be positive: {0}")]
    NonPositiveQuantity(f64),

    #[error("quantity {quantity} below minimum {min}")]
    QuantityBelowMin { quantity: f64, min: f64 },

    #[error("quantity {quantity} exceeds maximum {max}")]
    QuantityAboveMax { quantity: f64, max: f64 },

    #[error("limit orders require a price")]
    LimitOrderWithoutPrice,

    #[error("confidence must be within [0, 1]: {0}")]
    ConfidenceOutOfRange(f64),

    #[error("confidence {confidence:.2} below threshold {min:.2}")]
    LowConfidence { confidence: f64, min: f64 },

    #[error("signal too old: {age_secs}s (max {max_secs}s)")]
    StaleSignal { age_secs: i64, max_secs: u64 },

    #[error("signal timestamp is in the future ({skew_secs}s beyond tolerance)")]
    FutureTimestamp { skew_secs: i64 },

    #[error("order value {value:.2} exceeds maximum {max:.2}")]
    OrderValueExceeded { value: f64, max: f64 },
}

impl ValidationError {
    /// Stable reason code for responses and metric labels.
    pub fn reason(&self) -> &'static str {
        match self {
            ValidationError::InvalidJson(_) => "invalid_json",
            ValidationError::SymbolNotWhitelisted { .. } => "symbol_not_whitelisted",
            ValidationError::UnknownQuoteCurrency(_) => "unknown_quote_currency",
            ValidationError::EmptySymbol => "empty_symbol",
            ValidationError::MissingValue { .. } => "missing_value",
            ValidationError::NanValue { .. } => "nan_value",
            ValidationError::InfiniteValue { .. } => "infinite_value",
            ValidationError::NonPositivePrice(_) => "non_positive_price",
            ValidationError::PriceDeviation { .. } => "price_deviation",
            ValidationError::NonPositiveQuantity(_) => "non_positive_quantity",
            ValidationError::QuantityBelowMin { .. } => "quantity_below_min",
            ValidationError::QuantityAboveMax { .. } => "quantity_above_max",
            ValidationError::LimitOrderWithoutPrice => "limit_order_without_price",
            ValidationError::ConfidenceOutOfRange(_) => "confidence_out_of_range",
            ValidationError::LowConfidence { .. } => "low_confidence",
            ValidationError::StaleSignal { .. } => "stale_signal",
            ValidationError::FutureTimestamp { .. } => "future_timestamp",
            ValidationError::OrderValueExceeded { .. } => "order_value_exceeded",
        }
    }
}

/// Degenerate risk inputs during position sizing. Terminal for the request.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SizingError {
    #[error("account balance must be positive: {0}")]
    NonPositiveBalance(f64),

    #[error("{name} must be within (0, 1]: {value}")]
    FractionOutOfRange { name: &'static str, value: f64 },

    #[error("price must be positive: {0}")]
    NonPositivePrice(f64),

    #[error("stop loss cannot equal entry price")]
    ZeroStopDistance,

    #[error("volatility cannot be negative: {0}")]
    NegativeVolatility(f64),
}

/// Opaque failure from the execution backend. Fed into the circuit breaker.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExecutionError {
    #[error("execution backend error: {0}")]
    Backend(String),

    #[error("execution timed out after {0}s")]
    Timeout(u64),
}

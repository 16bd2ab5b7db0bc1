//! Execution backend contract.
//!
//! The gateway treats order placement as an opaque capability: a backend
//! receives a [`NormalizedOrder`] and either fills it or fails. Failures are
//! distinguishable from successes so the orchestrator can feed the circuit
//! breaker. Retry policy, if any, lives behind this boundary.

use crate::error::ExecutionError;
use crate::order::NormalizedOrder;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::future::Future;

/// Successful execution report from a backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderResult {
    /// Exchange/broker order id.
    pub order_id: String,
    /// Filled quantity in asset units.
    pub filled_quantity: Decimal,
    /// Average fill price.
    pub average_price: Decimal,
}

/// External execution collaborator.
///
/// `execute` is the only genuinely blocking call in the request path; the
/// orchestrator awaits it while holding no locks and reports the outcome to
/// the circuit breaker exactly once per allowed attempt.
pub trait ExecutionBackend: Send + Sync {
    /// Backend name for logging and audit entries.
    fn name(&self) -> &str;

    /// Place the order. Errors are opaque to the gateway.
    fn execute(
        &self,
        order: NormalizedOrder,
    ) -> impl Future<Output = Result<OrderResult, ExecutionError>> + Send;

    /// Current reference price for a canonical symbol, when the backend has
    /// market data. Used for the normalizer's price-deviation check.
    fn reference_price(&self, symbol: &str) -> Option<f64> {
        let _ = symbol;
        None
    }
}

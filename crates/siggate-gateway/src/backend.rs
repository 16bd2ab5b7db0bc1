//! Paper trading backend.
//!
//! Fills every order instantly against an in-memory reference price table.
//! Used for dry runs and integration tests; a real exchange adapter
//! implements the same [`ExecutionBackend`] trait.

use dashmap::DashMap;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use siggate_core::{ExecutionBackend, ExecutionError, NormalizedOrder, OrderResult};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use tracing::info;
use uuid::Uuid;

/// Simulated execution backend with instant fills.
#[derive(Default)]
pub struct PaperBackend {
    prices: DashMap<String, f64>,
    fills: AtomicU64,
    failing: AtomicBool,
}

impl PaperBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the reference price for a canonical symbol.
    pub fn set_price(&self, symbol: &str, price: f64) {
        self.prices.insert(symbol.to_string(), price);
    }

    /// Force subsequent executions to fail. Used to exercise the failure path.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Total orders filled since startup.
    pub fn fill_count(&self) -> u64 {
        self.fills.load(Ordering::Relaxed)
    }

    fn fill_price(&self, order: &NormalizedOrder) -> Result<Decimal, ExecutionError> {
        if let Some(price) = order.price {
            return Ok(price);
        }
        self.prices
            .get(&order.symbol)
            .and_then(|p| Decimal::from_f64(*p))
            .ok_or_else(|| {
                ExecutionError::Backend(format!("no reference price for {}", order.symbol))
            })
    }
}

impl ExecutionBackend for PaperBackend {
    fn name(&self) -> &str {
        "paper"
    }

    async fn execute(&self, order: NormalizedOrder) -> Result<OrderResult, ExecutionError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(ExecutionError::Backend(
                "simulated backend failure".to_string(),
            ));
        }

        let average_price = self.fill_price(&order)?;
        let order_id = Uuid::new_v4().to_string();
        self.fills.fetch_add(1, Ordering::Relaxed);

        info!(
            order_id = %order_id,
            symbol = %order.symbol,
            side = %order.side,
            quantity = %order.quantity,
            price = %average_price,
            "Paper fill"
        );

        Ok(OrderResult {
            order_id,
            filled_quantity: order.quantity,
            average_price,
        })
    }

    fn reference_price(&self, symbol: &str) -> Option<f64> {
        self.prices.get(symbol).map(|p| *p)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use siggate_core::{OrderType, Side};

    fn market_order(symbol: &str) -> NormalizedOrder {
        NormalizedOrder {
            symbol: symbol.to_string(),
            side: Side::Buy,
            order_type: OrderType::Market,
            quantity: dec!(0.5),
            price: None,
            stop_loss: None,
            take_profit: None,
            confidence: 1.0,
            exchange: None,
        }
    }

    #[tokio::test]
    async fn test_market_order_fills_at_reference_price() {
        let backend = PaperBackend::new();
        backend.set_price("BTC/USDT", 50_000.0);

        let result = backend.execute(market_order("BTC/USDT")).await.unwrap();
        assert_eq!(result.average_price, dec!(50000));
        assert_eq!(result.filled_quantity, dec!(0.5));
        assert_eq!(backend.fill_count(), 1);
    }

    #[tokio::test]
    async fn test_limit_order_fills_at_limit_price() {
        let backend = PaperBackend::new();
        let mut order = market_order("BTC/USDT");
        order.order_type = OrderType::Limit;
        order.price = Some(dec!(49500));

        let result = backend.execute(order).await.unwrap();
        assert_eq!(result.average_price, dec!(49500));
    }

    #[tokio::test]
    async fn test_unknown_symbol_fails() {
        let backend = PaperBackend::new();
        let err = backend.execute(market_order("DOGE/USDT")).await.unwrap_err();
        assert!(matches!(err, ExecutionError::Backend(_)));
        assert_eq!(backend.fill_count(), 0);
    }

    #[tokio::test]
    async fn test_failure_mode() {
        let backend = PaperBackend::new();
        backend.set_price("BTC/USDT", 50_000.0);
        backend.set_failing(true);
        assert!(backend.execute(market_order("BTC/USDT")).await.is_err());

        backend.set_failing(false);
        assert!(backend.execute(market_order("BTC/USDT")).await.is_ok());
    }
}

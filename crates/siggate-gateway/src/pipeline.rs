//! Request admission pipeline.
//!
//! One [`WebhookGateway`] instance owns every stage and runs them in a fixed
//! order per request:
//!
//! 1. IP whitelist
//! 2. Per-client rate limit
//! 3. Circuit breaker admission
//! 4. HMAC signature verification (exact raw body bytes)
//! 5. JSON parse + payload validation
//! 6. Normalization against the backend's reference price
//! 7. Position sizing cap (optional)
//! 8. Backend execution under a timeout
//!
//! The breaker hears about exactly one success or failure per allowed
//! execution attempt; requests rejected before stage 8 never touch it.
//! All metrics are recorded here, never inside the stage components.

use crate::config::GatewayConfig;
use crate::error::AppResult;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use siggate_admission::{AuditLog, CircuitBreaker, CircuitState, IpWhitelist, RateLimiter};
use siggate_core::{
    ExecutionBackend, NormalizedOrder, Side, Signal, SizingError, ValidationError,
};
use siggate_pipeline::{DataNormalizer, PayloadValidator, PositionSizer, SignatureVerifier};
use siggate_telemetry::Metrics;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Why a request was turned away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectKind {
    IpDenied,
    RateLimited,
    CircuitOpen,
    Signature,
    Validation,
    Sizing,
    ExecutionFailed,
    ExecutionTimeout,
}

impl RejectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RejectKind::IpDenied => "ip_denied",
            RejectKind::RateLimited => "rate_limited",
            RejectKind::CircuitOpen => "circuit_open",
            RejectKind::Signature => "invalid_signature",
            RejectKind::Validation => "validation_failed",
            RejectKind::Sizing => "sizing_failed",
            RejectKind::ExecutionFailed => "execution_failed",
            RejectKind::ExecutionTimeout => "execution_timeout",
        }
    }
}

/// Result of one webhook request.
#[derive(Debug)]
pub enum WebhookOutcome {
    Accepted {
        order_id: String,
        symbol: String,
        side: Side,
        filled_quantity: Decimal,
        average_price: Decimal,
    },
    Rejected {
        kind: RejectKind,
        /// Machine-readable reason code, stable across releases.
        reason: String,
        /// Human-readable detail for the response body and logs.
        message: String,
    },
}

impl WebhookOutcome {
    fn rejected(kind: RejectKind, message: impl Into<String>) -> Self {
        WebhookOutcome::Rejected {
            kind,
            reason: kind.as_str().to_string(),
            message: message.into(),
        }
    }

    fn validation(err: ValidationError) -> Self {
        WebhookOutcome::Rejected {
            kind: RejectKind::Validation,
            reason: err.reason().to_string(),
            message: err.to_string(),
        }
    }
}

/// Monotonic request counters, exposed at `/stats`.
#[derive(Default)]
struct GatewayCounters {
    received: AtomicU64,
    accepted: AtomicU64,
    rejected_ip: AtomicU64,
    rejected_rate_limit: AtomicU64,
    rejected_circuit: AtomicU64,
    rejected_signature: AtomicU64,
    rejected_validation: AtomicU64,
    rejected_sizing: AtomicU64,
    failed_execution: AtomicU64,
    timed_out: AtomicU64,
}

/// Effective admission policy, exposed at `/stats` next to the counters.
///
/// Reports the configuration the running components actually hold, not the
/// file it was loaded from, so env overrides and defaults are visible.
#[derive(Debug, Clone, Serialize)]
pub struct ConfigSnapshot {
    pub backend: String,
    pub require_signature: bool,
    pub min_confidence: f64,
    pub max_quantity: Option<f64>,
    pub max_order_value: Option<f64>,
    pub symbol_whitelist: Option<Vec<String>>,
    pub stale_timeout_secs: u64,
    pub rate_limit: RateLimitSnapshot,
}

/// Rate limiter settings inside [`ConfigSnapshot`].
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitSnapshot {
    pub max_requests: usize,
    pub window_secs: u64,
    pub burst_allowance: usize,
}

/// Point-in-time view of the counters.
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub accepted: u64,
    pub rejected_ip: u64,
    pub rejected_rate_limit: u64,
    pub rejected_circuit: u64,
    pub rejected_signature: u64,
    pub rejected_validation: u64,
    pub rejected_sizing: u64,
    pub failed_execution: u64,
    pub timed_out: u64,
}

/// Orchestrates the full admission pipeline in front of one backend.
pub struct WebhookGateway<B> {
    whitelist: IpWhitelist,
    rate_limiter: RateLimiter,
    breaker: CircuitBreaker,
    verifier: SignatureVerifier,
    validator: PayloadValidator,
    normalizer: DataNormalizer,
    sizer: Option<PositionSizer>,
    audit: AuditLog,
    backend: B,
    execution_timeout: Duration,
    quantity_precision: u32,
    counters: GatewayCounters,
}

impl<B: ExecutionBackend> WebhookGateway<B> {
    /// Build every stage from a validated configuration.
    pub fn from_config(config: &GatewayConfig, backend: B) -> AppResult<Self> {
        let sizer = if config.sizing.enabled {
            Some(PositionSizer::new(config.sizing_config())?)
        } else {
            None
        };

        let breaker = CircuitBreaker::new("execution", config.breaker_config())
            .with_state_change_hook(Box::new(|from, to| {
                Metrics::circuit_transition(from.as_str(), to.as_str());
                Metrics::circuit_state_set(to.as_str());
            }));
        Metrics::circuit_state_set(CircuitState::Closed.as_str());

        Ok(Self {
            whitelist: IpWhitelist::new(&config.ip_whitelist)?,
            rate_limiter: RateLimiter::new(config.rate_limit_config()),
            breaker,
            verifier: SignatureVerifier::new(
                config.webhook.secret.clone(),
                config.webhook.require_signature,
            ),
            validator: PayloadValidator::new(config.validator_config()),
            normalizer: DataNormalizer::new(config.normalizer_config()),
            sizer,
            audit: AuditLog::new(config.audit.capacity),
            backend,
            execution_timeout: config.execution_timeout(),
            quantity_precision: config.normalizer.quantity_precision,
            counters: GatewayCounters::default(),
        })
    }

    /// Process one webhook request end to end.
    ///
    /// `payload` must be the exact raw request body; the signature is
    /// computed over those bytes, not over a re-serialization.
    pub async fn handle(
        &self,
        client_ip: &str,
        payload: &[u8],
        signature: Option<&str>,
    ) -> WebhookOutcome {
        let started = Instant::now();
        Metrics::active_requests_inc();
        self.counters.received.fetch_add(1, Ordering::Relaxed);

        let outcome = self.admit(client_ip, payload, signature).await;

        let status = match &outcome {
            WebhookOutcome::Accepted { .. } => {
                self.counters.accepted.fetch_add(1, Ordering::Relaxed);
                "accepted"
            }
            WebhookOutcome::Rejected { kind, .. } => {
                let counter = match kind {
                    RejectKind::IpDenied => &self.counters.rejected_ip,
                    RejectKind::RateLimited => &self.counters.rejected_rate_limit,
                    RejectKind::CircuitOpen => &self.counters.rejected_circuit,
                    RejectKind::Signature => &self.counters.rejected_signature,
                    RejectKind::Validation => &self.counters.rejected_validation,
                    RejectKind::Sizing => &self.counters.rejected_sizing,
                    RejectKind::ExecutionFailed => &self.counters.failed_execution,
                    RejectKind::ExecutionTimeout => &self.counters.timed_out,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                match kind {
                    RejectKind::ExecutionFailed | RejectKind::ExecutionTimeout => "error",
                    _ => "rejected",
                }
            }
        };

        Metrics::webhook_duration(status, started.elapsed().as_secs_f64());
        Metrics::active_requests_dec();
        outcome
    }

    async fn admit(
        &self,
        client_ip: &str,
        payload: &[u8],
        signature: Option<&str>,
    ) -> WebhookOutcome {
        // Stage 1: source IP
        let ip_allowed = self.whitelist.is_allowed(client_ip);
        Metrics::ip_check(ip_allowed);
        if !ip_allowed {
            self.record_audit(
                "ip_check",
                client_ip,
                false,
                serde_json::json!({}),
                Some("source address not whitelisted".to_string()),
            );
            return WebhookOutcome::rejected(RejectKind::IpDenied, "source address not allowed");
        }

        // Stage 2: rate limit
        let within_limit = self.rate_limiter.check(client_ip);
        Metrics::rate_limit_check(within_limit);
        if !within_limit {
            self.record_audit(
                "rate_limit",
                client_ip,
                false,
                serde_json::json!({}),
                Some("rate limit exceeded".to_string()),
            );
            return WebhookOutcome::rejected(RejectKind::RateLimited, "rate limit exceeded");
        }

        // Stage 3: circuit breaker admission
        if !self.breaker.allow() {
            Metrics::circuit_rejected();
            self.record_audit(
                "circuit_breaker",
                client_ip,
                false,
                serde_json::json!({ "state": self.breaker.state().as_str() }),
                Some("execution circuit open".to_string()),
            );
            return WebhookOutcome::rejected(
                RejectKind::CircuitOpen,
                "execution temporarily unavailable",
            );
        }

        // Stage 4: signature over the raw body
        if let Err(e) = self.verifier.verify(payload, signature) {
            Metrics::signature_failure();
            self.record_audit(
                "signature",
                client_ip,
                false,
                serde_json::json!({}),
                Some(e.to_string()),
            );
            return WebhookOutcome::rejected(RejectKind::Signature, e.to_string());
        }

        // Stage 5: parse + validate
        let signal: Signal = match serde_json::from_slice(payload) {
            Ok(signal) => signal,
            Err(e) => {
                let err = ValidationError::InvalidJson(e.to_string());
                Metrics::validation_failure(err.reason());
                self.record_audit(
                    "validation",
                    client_ip,
                    false,
                    serde_json::json!({}),
                    Some(err.to_string()),
                );
                return WebhookOutcome::validation(err);
            }
        };

        if let Err(e) = self.validator.validate(&signal) {
            self.record_validation_failure(client_ip, &signal, &e);
            return WebhookOutcome::validation(e);
        }

        // Stage 6: normalize against the backend's view of the market
        let market_price = self
            .normalizer
            .normalize_symbol(&signal.symbol)
            .ok()
            .and_then(|canonical| self.backend.reference_price(&canonical));

        let mut order = match self.normalizer.normalize(&signal, market_price) {
            Ok(order) => order,
            Err(e) => {
                self.record_validation_failure(client_ip, &signal, &e);
                return WebhookOutcome::validation(e);
            }
        };

        // Stage 7: sizing cap
        if let Err(e) = self.apply_sizing(&mut order) {
            self.record_audit(
                "sizing",
                client_ip,
                false,
                serde_json::json!({ "symbol": order.symbol }),
                Some(e.to_string()),
            );
            return WebhookOutcome::rejected(RejectKind::Sizing, e.to_string());
        }

        // Stage 8: execution
        self.execute(client_ip, order).await
    }

    /// Cap the order quantity by the configured sizing policy.
    ///
    /// With a stop-loss the cap is risk-based; without one it falls back to
    /// the fixed maximum position fraction. The cap only ever shrinks the
    /// requested quantity. Orders with no usable price context pass through.
    fn apply_sizing(&self, order: &mut NormalizedOrder) -> Result<(), SizingError> {
        let Some(sizer) = &self.sizer else {
            return Ok(());
        };

        let entry = order
            .price
            .and_then(|p| p.to_f64())
            .or_else(|| self.backend.reference_price(&order.symbol));
        let Some(entry) = entry else {
            return Ok(());
        };

        let cap = match order.stop_loss.and_then(|p| p.to_f64()) {
            Some(stop) => sizer.risk_based(entry, stop, None)?,
            None => sizer.fixed_percentage(sizer.config().max_position_size, entry)?,
        };

        if let Some(cap) = Decimal::from_f64(cap) {
            let cap =
                cap.round_dp_with_strategy(self.quantity_precision, RoundingStrategy::ToZero);
            if cap < order.quantity {
                debug!(
                    symbol = %order.symbol,
                    requested = %order.quantity,
                    capped = %cap,
                    "Quantity capped by position sizing"
                );
                order.quantity = cap;
            }
        }
        Ok(())
    }

    async fn execute(&self, client_ip: &str, order: NormalizedOrder) -> WebhookOutcome {
        let exchange = order
            .exchange
            .clone()
            .unwrap_or_else(|| self.backend.name().to_string());
        let started = Instant::now();

        // No gateway locks are held across this await.
        let result = tokio::time::timeout(self.execution_timeout, self.backend.execute(order.clone())).await;
        Metrics::order_execution_duration(started.elapsed().as_secs_f64());

        match result {
            Ok(Ok(fill)) => {
                self.breaker.record_success();
                Metrics::order_result(&exchange, "filled");
                Metrics::webhook_accepted(&order.symbol, &order.side.to_string());
                info!(
                    order_id = %fill.order_id,
                    symbol = %order.symbol,
                    side = %order.side,
                    quantity = %fill.filled_quantity,
                    price = %fill.average_price,
                    exchange = %exchange,
                    "Order filled"
                );
                self.record_audit(
                    "order",
                    client_ip,
                    true,
                    serde_json::json!({
                        "order_id": fill.order_id,
                        "symbol": order.symbol,
                        "side": order.side.to_string(),
                        "quantity": fill.filled_quantity.to_string(),
                        "price": fill.average_price.to_string(),
                        "exchange": exchange,
                    }),
                    None,
                );
                WebhookOutcome::Accepted {
                    order_id: fill.order_id,
                    symbol: order.symbol,
                    side: order.side,
                    filled_quantity: fill.filled_quantity,
                    average_price: fill.average_price,
                }
            }
            Ok(Err(e)) => {
                self.breaker.record_failure();
                Metrics::order_result(&exchange, "failed");
                warn!(symbol = %order.symbol, error = %e, "Order execution failed");
                self.record_audit(
                    "order",
                    client_ip,
                    false,
                    serde_json::json!({ "symbol": order.symbol, "exchange": exchange }),
                    Some(e.to_string()),
                );
                WebhookOutcome::rejected(RejectKind::ExecutionFailed, e.to_string())
            }
            Err(_) => {
                self.breaker.record_failure();
                Metrics::order_result(&exchange, "timeout");
                warn!(
                    symbol = %order.symbol,
                    timeout_secs = self.execution_timeout.as_secs(),
                    "Order execution timed out"
                );
                self.record_audit(
                    "order",
                    client_ip,
                    false,
                    serde_json::json!({ "symbol": order.symbol, "exchange": exchange }),
                    Some(format!(
                        "execution timed out after {}s",
                        self.execution_timeout.as_secs()
                    )),
                );
                WebhookOutcome::rejected(
                    RejectKind::ExecutionTimeout,
                    format!(
                        "execution timed out after {}s",
                        self.execution_timeout.as_secs()
                    ),
                )
            }
        }
    }

    fn record_validation_failure(&self, client_ip: &str, signal: &Signal, err: &ValidationError) {
        Metrics::validation_failure(err.reason());
        match err {
            ValidationError::LowConfidence { .. } => Metrics::confidence_filtered(&signal.symbol),
            ValidationError::StaleSignal { .. } | ValidationError::FutureTimestamp { .. } => {
                Metrics::stale_rejected(&signal.symbol)
            }
            _ => {}
        }
        self.record_audit(
            "validation",
            client_ip,
            false,
            serde_json::json!({ "symbol": signal.symbol }),
            Some(err.to_string()),
        );
    }

    fn record_audit(
        &self,
        action: &str,
        identifier: &str,
        success: bool,
        details: serde_json::Value,
        error: Option<String>,
    ) {
        self.audit.log(action, identifier, success, details, error);
        Metrics::audit_event(action, success);
    }

    // ===== Introspection =====

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn circuit_stats(&self) -> siggate_admission::CircuitBreakerStats {
        self.breaker.stats()
    }

    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn config_snapshot(&self) -> ConfigSnapshot {
        let validator = self.validator.config();
        let rate_limit = self.rate_limiter.config();
        // HashSet order is arbitrary; sort so the snapshot is stable.
        let symbol_whitelist = validator.symbol_whitelist.as_ref().map(|symbols| {
            let mut sorted: Vec<String> = symbols.iter().cloned().collect();
            sorted.sort();
            sorted
        });

        ConfigSnapshot {
            backend: self.backend.name().to_string(),
            require_signature: self.verifier.requires_signature(),
            min_confidence: validator.min_confidence,
            max_quantity: validator.max_quantity,
            max_order_value: validator.max_order_value,
            symbol_whitelist,
            stale_timeout_secs: validator.stale_timeout_secs,
            rate_limit: RateLimitSnapshot {
                max_requests: rate_limit.max_requests,
                window_secs: rate_limit.window.as_secs(),
                burst_allowance: rate_limit.burst_allowance,
            },
        }
    }

    pub fn stats(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.counters.received.load(Ordering::Relaxed),
            accepted: self.counters.accepted.load(Ordering::Relaxed),
            rejected_ip: self.counters.rejected_ip.load(Ordering::Relaxed),
            rejected_rate_limit: self.counters.rejected_rate_limit.load(Ordering::Relaxed),
            rejected_circuit: self.counters.rejected_circuit.load(Ordering::Relaxed),
            rejected_signature: self.counters.rejected_signature.load(Ordering::Relaxed),
            rejected_validation: self.counters.rejected_validation.load(Ordering::Relaxed),
            rejected_sizing: self.counters.rejected_sizing.load(Ordering::Relaxed),
            failed_execution: self.counters.failed_execution.load(Ordering::Relaxed),
            timed_out: self.counters.timed_out.load(Ordering::Relaxed),
        }
    }

    /// Clear rate limiter buckets and close the circuit. Operational escape
    /// hatch; audit history and counters are kept.
    pub fn reset(&self) {
        self.rate_limiter.reset(None);
        self.breaker.reset();
    }
}

//! Prometheus metrics for the webhook gateway.
//!
//! Covers the full admission pipeline:
//! - Webhook throughput and processing latency
//! - Validation failures by reason
//! - Rate-limit / IP-whitelist / circuit-breaker admission decisions
//! - Circuit breaker state and transitions
//! - Audit events by action and result
//! - Order outcomes per exchange
//!
//! # Panics
//!
//! Metric registration uses `unwrap()` intentionally. If registration fails,
//! it indicates a fatal configuration error (e.g., duplicate metric names)
//! that should cause an immediate crash at startup rather than silent failure.
//! These panics only occur during static initialization, never at runtime.

use once_cell::sync::Lazy;
use prometheus::{
    register_counter_vec, register_histogram, register_histogram_vec, register_int_counter,
    register_int_gauge, CounterVec, Histogram, HistogramVec, IntCounter, IntGauge,
};

/// Accepted webhook signals.
/// Labels: symbol, side
pub static WEBHOOK_REQUESTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_webhook_requests_total",
        "Total accepted webhook signals",
        &["symbol", "side"]
    )
    .unwrap()
});

/// Webhook processing latency in seconds.
/// Labels: status (accepted/rejected/error)
pub static WEBHOOK_PROCESSING_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    register_histogram_vec!(
        "gateway_webhook_processing_seconds",
        "Webhook processing duration in seconds",
        &["status"],
        vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0]
    )
    .unwrap()
});

/// Validation failures by machine-readable reason code.
pub static VALIDATION_FAILURES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_validation_failures_total",
        "Total payload validation failures",
        &["reason"]
    )
    .unwrap()
});

/// Signature verification failures.
pub static SIGNATURE_FAILURES_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gateway_signature_failures_total",
        "Total webhook signature verification failures"
    )
    .unwrap()
});

/// Signals filtered for low confidence.
pub static CONFIDENCE_FILTERED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_confidence_filtered_total",
        "Total signals rejected below the confidence threshold",
        &["symbol"]
    )
    .unwrap()
});

/// Signals rejected as stale.
pub static STALE_REJECTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_stale_rejected_total",
        "Total signals rejected as stale or future-dated",
        &["symbol"]
    )
    .unwrap()
});

/// Rate limiter decisions.
/// Labels: allowed (true/false)
pub static RATE_LIMIT_CHECKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_rate_limit_checks_total",
        "Total rate limit admission decisions",
        &["allowed"]
    )
    .unwrap()
});

/// IP whitelist decisions.
/// Labels: allowed (true/false)
pub static IP_WHITELIST_CHECKS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_ip_whitelist_checks_total",
        "Total IP whitelist admission decisions",
        &["allowed"]
    )
    .unwrap()
});

/// Circuit breaker state (1 = active state, 0 = inactive).
/// Labels: state (closed/open/half_open)
pub static CIRCUIT_STATE: Lazy<prometheus::GaugeVec> = Lazy::new(|| {
    prometheus::register_gauge_vec!(
        "gateway_circuit_state",
        "Circuit breaker current state (1=active)",
        &["state"]
    )
    .unwrap()
});

/// Circuit breaker transitions.
/// Labels: from_state, to_state
pub static CIRCUIT_TRANSITIONS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_circuit_transitions_total",
        "Total circuit breaker state transitions",
        &["from_state", "to_state"]
    )
    .unwrap()
});

/// Requests rejected because the circuit is open.
pub static CIRCUIT_REJECTIONS_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "gateway_circuit_rejections_total",
        "Total requests rejected by an open circuit breaker"
    )
    .unwrap()
});

/// Audit events by action and result.
/// Labels: action, result (success/failure)
pub static AUDIT_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_audit_events_total",
        "Total audit events recorded",
        &["action", "result"]
    )
    .unwrap()
});

/// Order outcomes per exchange.
/// Labels: exchange, status (filled/failed/timeout)
pub static ORDERS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "gateway_orders_total",
        "Total orders forwarded to the execution backend",
        &["exchange", "status"]
    )
    .unwrap()
});

/// Execution backend call latency in seconds.
pub static ORDER_EXECUTION_SECONDS: Lazy<Histogram> = Lazy::new(|| {
    register_histogram!(
        "gateway_order_execution_seconds",
        "Execution backend call duration in seconds",
        vec![0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0]
    )
    .unwrap()
});

/// Requests currently being processed.
pub static ACTIVE_REQUESTS: Lazy<IntGauge> = Lazy::new(|| {
    register_int_gauge!(
        "gateway_active_requests",
        "Webhook requests currently in flight"
    )
    .unwrap()
});

/// Metrics facade for easy access.
pub struct Metrics;

impl Metrics {
    /// Record an accepted webhook signal.
    pub fn webhook_accepted(symbol: &str, side: &str) {
        WEBHOOK_REQUESTS_TOTAL
            .with_label_values(&[symbol, side])
            .inc();
    }

    /// Record end-to-end processing duration.
    pub fn webhook_duration(status: &str, seconds: f64) {
        WEBHOOK_PROCESSING_SECONDS
            .with_label_values(&[status])
            .observe(seconds);
    }

    /// Record a validation failure by reason code.
    pub fn validation_failure(reason: &str) {
        VALIDATION_FAILURES_TOTAL.with_label_values(&[reason]).inc();
    }

    /// Record a signature verification failure.
    pub fn signature_failure() {
        SIGNATURE_FAILURES_TOTAL.inc();
    }

    /// Record a low-confidence rejection.
    pub fn confidence_filtered(symbol: &str) {
        CONFIDENCE_FILTERED_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a stale/future-dated rejection.
    pub fn stale_rejected(symbol: &str) {
        STALE_REJECTED_TOTAL.with_label_values(&[symbol]).inc();
    }

    /// Record a rate limit decision.
    pub fn rate_limit_check(allowed: bool) {
        RATE_LIMIT_CHECKS_TOTAL
            .with_label_values(&[if allowed { "true" } else { "false" }])
            .inc();
    }

    /// Record an IP whitelist decision.
    pub fn ip_check(allowed: bool) {
        IP_WHITELIST_CHECKS_TOTAL
            .with_label_values(&[if allowed { "true" } else { "false" }])
            .inc();
    }

    /// Set the circuit breaker state gauge.
    /// Only the active state is 1, all others 0.
    pub fn circuit_state_set(state: &str) {
        for s in &["closed", "open", "half_open"] {
            CIRCUIT_STATE.with_label_values(&[s]).set(0.0);
        }
        CIRCUIT_STATE.with_label_values(&[state]).set(1.0);
    }

    /// Record a circuit breaker transition.
    pub fn circuit_transition(from_state: &str, to_state: &str) {
        CIRCUIT_TRANSITIONS_TOTAL
            .with_label_values(&[from_state, to_state])
            .inc();
    }

    /// Record a rejection due to an open circuit.
    pub fn circuit_rejected() {
        CIRCUIT_REJECTIONS_TOTAL.inc();
    }

    /// Record an audit event.
    pub fn audit_event(action: &str, success: bool) {
        AUDIT_EVENTS_TOTAL
            .with_label_values(&[action, if success { "success" } else { "failure" }])
            .inc();
    }

    /// Record an order outcome.
    pub fn order_result(exchange: &str, status: &str) {
        ORDERS_TOTAL.with_label_values(&[exchange, status]).inc();
    }

    /// Record execution backend latency.
    pub fn order_execution_duration(seconds: f64) {
        ORDER_EXECUTION_SECONDS.observe(seconds);
    }

    /// Track in-flight requests.
    pub fn active_requests_inc() {
        ACTIVE_REQUESTS.inc();
    }

    pub fn active_requests_dec() {
        ACTIVE_REQUESTS.dec();
    }
}

/// Encode all registered metrics in Prometheus text exposition format.
pub fn gather() -> String {
    use prometheus::Encoder;
    let encoder = prometheus::TextEncoder::new();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&prometheus::gather(), &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
        return String::new();
    }
    String::from_utf8(buffer).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metrics_record_without_panicking() {
        Metrics::webhook_accepted("BTC/USDT", "buy");
        Metrics::webhook_duration("accepted", 0.003);
        Metrics::validation_failure("low_confidence");
        Metrics::signature_failure();
        Metrics::rate_limit_check(true);
        Metrics::ip_check(false);
        Metrics::circuit_state_set("open");
        Metrics::circuit_transition("closed", "open");
        Metrics::circuit_rejected();
        Metrics::audit_event("webhook_request", true);
        Metrics::order_result("paper", "filled");
        Metrics::active_requests_inc();
        Metrics::active_requests_dec();
    }

    #[test]
    fn test_gather_contains_gateway_metrics() {
        Metrics::validation_failure("stale_signal");
        let text = gather();
        assert!(text.contains("gateway_validation_failures_total"));
    }
}

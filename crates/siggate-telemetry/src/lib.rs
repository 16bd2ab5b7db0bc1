//! Prometheus metrics and structured logging for the webhook gateway.
//!
//! The metric (name, label) pairs defined here are a stable contract that
//! downstream observability consumers depend on.

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::{TelemetryError, TelemetryResult};
pub use logging::{init_logging, LogFormat, LoggingConfig};
pub use metrics::{gather, Metrics};

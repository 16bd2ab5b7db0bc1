//! Admission controls for the webhook gateway.
//!
//! Each component is an explicit service object constructed once at startup
//! and shared by handle; there is no ambient global state:
//! - `RateLimiter`: token bucket over a sliding window, per identifier
//! - `CircuitBreaker`: CLOSED/OPEN/HALF_OPEN failure-rate protection
//! - `IpWhitelist`: exact and CIDR-based source address filtering
//! - `AuditLog`: bounded, queryable security event trail

pub mod audit;
pub mod circuit;
pub mod error;
pub mod ip_filter;
pub mod rate_limit;

pub use audit::{AuditEntry, AuditLog, DEFAULT_AUDIT_CAPACITY};
pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use error::AdmissionError;
pub use ip_filter::{CidrBlock, IpWhitelist};
pub use rate_limit::{RateLimitConfig, RateLimitStats, RateLimiter};

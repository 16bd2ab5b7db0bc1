//! Core domain types for the siggate webhook order-admission gateway.
//!
//! This crate provides the types shared by every stage of the admission
//! pipeline:
//! - `Signal`: raw inbound alert, immutable once parsed
//! - `NormalizedOrder`: canonicalized, risk-sized order ready for execution
//! - `Side`, `OrderType`: trading enums
//! - `ExecutionBackend`: contract for the external execution collaborator
//! - Error taxonomy (`ValidationError`, `SignatureError`, `SizingError`,
//!   `ExecutionError`)

pub mod backend;
pub mod error;
pub mod order;
pub mod signal;

pub use backend::{ExecutionBackend, OrderResult};
pub use error::{ExecutionError, SignatureError, SizingError, ValidationError};
pub use order::NormalizedOrder;
pub use signal::{OrderType, Side, Signal};

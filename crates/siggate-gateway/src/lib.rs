//! Webhook order-admission gateway.
//!
//! Wires the admission components (IP whitelist, rate limiter, circuit
//! breaker), the payload pipeline (signature, validation, normalization,
//! sizing) and an execution backend behind a small HTTP surface.

pub mod backend;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod server;

pub use backend::PaperBackend;
pub use config::GatewayConfig;
pub use error::{AppError, AppResult};
pub use pipeline::{
    ConfigSnapshot, RateLimitSnapshot, RejectKind, StatsSnapshot, WebhookGateway, WebhookOutcome,
};
pub use server::{create_router, run_server, AppState, SIGNATURE_HEADER};

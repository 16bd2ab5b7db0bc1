//! HTTP surface using axum.
//!
//! - `POST /webhook/tradingview` runs the admission pipeline
//! - `GET /health` liveness
//! - `GET /ready` readiness, degraded while the execution circuit is open
//! - `GET /metrics` Prometheus exposition
//! - `GET /audit/recent?limit=N` recent audit entries
//! - `GET /stats` request counters, circuit state and the effective policy

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use axum::Router;
use serde::Deserialize;
use serde_json::json;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::pipeline::{RejectKind, WebhookGateway, WebhookOutcome};
use siggate_admission::CircuitState;
use siggate_core::ExecutionBackend;

/// Header carrying the hex-encoded HMAC of the raw request body.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

const MAX_AUDIT_PAGE: usize = 1000;

/// Shared application state for axum handlers.
pub struct AppState<B> {
    pub gateway: Arc<WebhookGateway<B>>,
}

impl<B> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            gateway: self.gateway.clone(),
        }
    }
}

/// Create the axum router.
pub fn create_router<B: ExecutionBackend + 'static>(state: AppState<B>) -> Router {
    Router::new()
        .route("/webhook/tradingview", post(handle_webhook::<B>))
        .route("/health", get(health))
        .route("/ready", get(ready::<B>))
        .route("/metrics", get(metrics))
        .route("/audit/recent", get(audit_recent::<B>))
        .route("/stats", get(stats::<B>))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn handle_webhook<B: ExecutionBackend + 'static>(
    State(state): State<AppState<B>>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    let client_ip = addr.ip().to_string();

    let outcome = state.gateway.handle(&client_ip, &body, signature).await;

    match outcome {
        WebhookOutcome::Accepted {
            order_id,
            symbol,
            side,
            filled_quantity,
            average_price,
        } => (
            StatusCode::OK,
            Json(json!({
                "success": true,
                "order_id": order_id,
                "symbol": symbol,
                "side": side.to_string(),
                "filled_quantity": filled_quantity.to_string(),
                "average_price": average_price.to_string(),
            })),
        )
            .into_response(),
        WebhookOutcome::Rejected {
            kind,
            reason,
            message,
        } => (
            reject_status(kind),
            Json(json!({
                "success": false,
                "error": reason,
                "message": message,
            })),
        )
            .into_response(),
    }
}

fn reject_status(kind: RejectKind) -> StatusCode {
    match kind {
        RejectKind::IpDenied => StatusCode::FORBIDDEN,
        RejectKind::RateLimited => StatusCode::TOO_MANY_REQUESTS,
        RejectKind::CircuitOpen => StatusCode::SERVICE_UNAVAILABLE,
        RejectKind::Signature => StatusCode::UNAUTHORIZED,
        RejectKind::Validation | RejectKind::Sizing => StatusCode::BAD_REQUEST,
        RejectKind::ExecutionFailed => StatusCode::BAD_GATEWAY,
        RejectKind::ExecutionTimeout => StatusCode::GATEWAY_TIMEOUT,
    }
}

async fn health() -> Json<serde_json::Value> {
    Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}

async fn ready<B: ExecutionBackend + 'static>(State(state): State<AppState<B>>) -> Response {
    let circuit = state.gateway.circuit_state();
    let body = Json(json!({
        "circuit": circuit.as_str(),
        "backend": state.gateway.backend().name(),
    }));
    // Half-open still admits probes, so only a fully open circuit degrades
    // readiness.
    let status = if circuit == CircuitState::Open {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    (status, body).into_response()
}

async fn metrics() -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        siggate_telemetry::gather(),
    )
        .into_response()
}

#[derive(Debug, Deserialize)]
struct AuditQuery {
    limit: Option<usize>,
}

async fn audit_recent<B: ExecutionBackend + 'static>(
    State(state): State<AppState<B>>,
    Query(query): Query<AuditQuery>,
) -> Json<serde_json::Value> {
    let limit = query.limit.unwrap_or(100).min(MAX_AUDIT_PAGE);
    let entries = state.gateway.audit().recent(limit);
    Json(json!({
        "count": entries.len(),
        "entries": entries,
    }))
}

async fn stats<B: ExecutionBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<serde_json::Value> {
    let circuit = state.gateway.circuit_stats();
    Json(json!({
        "requests": state.gateway.stats(),
        "circuit": {
            "state": circuit.state.as_str(),
            "failure_count": circuit.failure_count,
            "success_count": circuit.success_count,
            "failure_threshold": circuit.failure_threshold,
        },
        "audit_entries": state.gateway.audit().len(),
        "config": state.gateway.config_snapshot(),
    }))
}

/// Bind and serve until the process is stopped.
pub async fn run_server<B: ExecutionBackend + 'static>(
    state: AppState<B>,
    port: u16,
) -> std::io::Result<()> {
    let app = create_router(state);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!(port, "Starting webhook gateway server");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
}

//! Webhook gateway entry point.

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use siggate_gateway::{AppState, GatewayConfig, PaperBackend, WebhookGateway};

/// Webhook order-admission gateway
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via SIGGATE_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Config carries the logging settings, so load it before the subscriber.
    let config = match args.config {
        Some(path) => GatewayConfig::from_file(&path)?,
        None => GatewayConfig::load()?,
    };
    config.validate()?;

    siggate_telemetry::init_logging(&config.logging)?;

    info!("Starting siggate v{}", env!("CARGO_PKG_VERSION"));
    info!(port = config.server.port, "Configuration loaded");

    let backend = PaperBackend::new();
    let gateway = WebhookGateway::from_config(&config, backend)?;
    let state = AppState {
        gateway: Arc::new(gateway),
    };

    siggate_gateway::run_server(state, config.server.port).await?;

    Ok(())
}

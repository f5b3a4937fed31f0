//! Gatekeeper (v1)
//!
//! An access gateway built with Tokio and Axum that fronts a REST backend.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                    GATEKEEPER                    │
//!                        │                                                  │
//!     Client Request     │  ┌─────────┐    ┌──────────┐    ┌────────────┐   │
//!     ───────────────────┼─▶│  http   │───▶│ routing  │───▶│    gate    │   │
//!                        │  │ server  │    │  table   │    │  pipeline  │   │
//!                        │  └─────────┘    └──────────┘    └─────┬──────┘   │
//!                        │                                       │          │
//!                        │         rate limit → authenticate → authorize    │
//!                        │                                       │          │
//!     Client Response    │  ┌───────────┐                        ▼          │
//!     ◀──────────────────┼──│ rejection │◀── reject      admit ──▶ forward ─┼──▶ Upstream
//!                        │  └───────────┘                                   │
//!                        │                                                  │
//!                        │  ┌────────────────────────────────────────────┐  │
//!                        │  │           Cross-Cutting Concerns           │  │
//!                        │  │   config · observability · lifecycle       │  │
//!                        │  └────────────────────────────────────────────┘  │
//!                        └──────────────────────────────────────────────────┘
//! ```

use clap::Parser;
use std::path::PathBuf;
use tokio::net::TcpListener;

use gatekeeper::http::HttpServer;
use gatekeeper::lifecycle::{signals, startup, Shutdown};
use gatekeeper::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "gatekeeper")]
#[command(about = "Rate limiting and role-based access gateway", long_about = None)]
struct Args {
    /// Path to a TOML config file; defaults are used when omitted.
    #[arg(short, long, env = "GATEKEEPER_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = startup::load(args.config.as_deref())?;
    logging::init_logging(&config.observability);

    tracing::info!("gatekeeper v{} starting", env!("CARGO_PKG_VERSION"));
    match &args.config {
        Some(path) => tracing::info!(path = %path.display(), "Configuration file loaded"),
        None => tracing::info!("No config file given, using defaults"),
    }

    let key = startup::signing_key(&config.auth)?;

    tracing::info!(
        bind_address = %config.listener.bind_address,
        routes = config.routes.len(),
        limiters = config.rate_limits.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config, key)?;

    let shutdown = Shutdown::new();
    let trigger = shutdown.clone();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        tracing::info!("Shutting down");
        trigger.trigger();
    });

    server.run(listener, shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

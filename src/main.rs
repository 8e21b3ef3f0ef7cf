//! Service gateway
//!
//! Routes every inbound request to a backend picked by service name.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                     GATEWAY                      │
//!   Client Request       │  ┌──────────┐   ┌───────────┐   ┌────────────┐   │
//!   ─────────────────────┼─▶│   http   │──▶│  routing  │──▶│  rewrite   │   │
//!                        │  │ catch-all│   │ registry  │   │ cookies +  │   │
//!                        │  └──────────┘   └───────────┘   │ headers +  │   │
//!                        │                                 │ body       │   │
//!                        │                                 └─────┬──────┘   │
//!                        │                                       ▼          │
//!   Client Response      │  ┌──────────┐                   ┌────────────┐   │
//!   ◀────────────────────┼──│ response │◀──────────────────│ transport  │◀──┼── Backend
//!                        │  │  relay   │                   │  (reqwest) │   │
//!                        │  └──────────┘                   └────────────┘   │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use service_gateway::config::load_config;
use service_gateway::lifecycle::{signals, Shutdown};
use service_gateway::observability::{logging, metrics};
use service_gateway::HttpServer;

#[derive(Parser)]
#[command(name = "service-gateway")]
#[command(about = "Name-based HTTP reverse-proxy gateway", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        bind_address = %config.listener.bind_address,
        services = config.services.len(),
        allowed_cookies = config.cookies.allowed.len(),
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

    let shutdown = Shutdown::new();
    tokio::spawn(signals::shutdown_on_signal(shutdown.clone()));

    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}

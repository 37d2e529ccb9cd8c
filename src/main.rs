//! CV generation orchestrator service.
//!
//! ```text
//!     Client ──▶ http (correlation, version) ──▶ orchestrator
//!                                                   │
//!                         ┌─────────────────────────┼──────────────────────┐
//!                         ▼                         ▼                      ▼
//!                    normalizer            upstream::data (fan-out)   upstream::generation
//!                                                   │                      ▲
//!                                                   └──▶ stage0 ───────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use cv_orchestrator::config::load_config;
use cv_orchestrator::lifecycle::{signals, Shutdown};
use cv_orchestrator::observability::{logging, metrics};
use cv_orchestrator::HttpServer;

#[derive(Debug, Parser)]
#[command(name = "cv-orchestrator", version, about = "CV generation orchestrator")]
struct Cli {
    /// Optional TOML configuration file. Environment variables override it.
    #[arg(short, long, env = "EPORT_ORCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    logging::init_logging(&config.observability);
    tracing::info!(config_file = ?cli.config, "Configuration loaded");
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        service = %config.service.name,
        environment = %config.service.environment,
        data_api = config.data_api.base_url.as_deref().unwrap_or(""),
        generation_api = config.generation_api.base_url.as_deref().unwrap_or(""),
        max_retries = config.retries.max_retries,
        hydration_budget_secs = config.timeouts.hydration_budget_secs,
        request_deadline_secs = config.timeouts.request_secs,
        "cv-orchestrator starting"
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
    let server = HttpServer::new(config)?;
    let server_shutdown = shutdown.subscribe();

    let mut server_task = tokio::spawn(server.run(listener, server_shutdown));

    tokio::select! {
        result = &mut server_task => result??,
        _ = signals::wait_for_shutdown_signal() => {
            shutdown.trigger();
            server_task.await??;
        }
    }

    tracing::info!("Shutdown complete");
    Ok(())
}

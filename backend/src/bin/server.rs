//! Signal scheduler HTTP server.
//!
//! Loads configuration, replays persisted history and serves the REST API.
//!
//! # Usage
//!
//! ```bash
//! # In-memory history, defaults
//! cargo run --bin signal-server
//!
//! # File-backed history
//! SCHEDULER_HISTORY_PATH=/var/lib/scheduler/history.jsonl cargo run --bin signal-server
//! ```
//!
//! # Environment Variables
//!
//! - `SCHEDULER_CONFIG`: Path to a TOML config file (default: `scheduler.toml` if present)
//! - `SCHEDULER_HOST` / `SCHEDULER_PORT`: Bind address (default: 0.0.0.0:8080)
//! - `SCHEDULER_HISTORY_PATH`: Switches to the JSON-lines repository at this path
//! - `SCHEDULER_MAX_SAMPLES`: Per-section history ring size
//! - `RUST_LOG`: Log level (default: info)

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;

use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use signal_scheduler::http::{create_router, AppState};
use signal_scheduler::{Orchestrator, SchedulerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    FmtSubscriber::builder()
        .with_max_level(
            env::var("RUST_LOG")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(Level::INFO),
        )
        .with_target(true)
        .with_thread_ids(true)
        .init();

    info!("Starting signal scheduler HTTP server");

    let config = SchedulerConfig::load()?;
    info!(
        repository = %config.repository.repo_type,
        max_samples = config.history.max_samples_per_section,
        green_wave = config.timing.green_wave_enabled,
        "configuration loaded"
    );

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;

    let orchestrator = Arc::new(Orchestrator::from_config(config)?);
    info!("Orchestrator initialized successfully");

    let app = create_router(AppState::new(orchestrator));

    info!("Server listening on http://{}", addr);
    info!("Health check: http://{}/health", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

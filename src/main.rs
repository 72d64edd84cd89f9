//! PresenceHub Server — presence staleness reconciliation host.
//!
//! Main entry point that wires the store and the sweep scheduler together.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use presencehub_core::config::AppConfig;
use presencehub_core::error::AppError;
use presencehub_store::{DocumentStore, MemoryDocumentStore};
use presencehub_worker::scheduler::SweepScheduler;
use presencehub_worker::sweep::StalenessSweep;

#[tokio::main]
async fn main() {
    let env = std::env::var("PRESENCEHUB_ENV").unwrap_or_else(|_| "development".to_string());

    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting PresenceHub v{}", env!("CARGO_PKG_VERSION"));

    let store = build_store(&config)?;

    if !config.worker.enabled {
        tracing::warn!("Staleness sweep disabled; stale online claims will not be corrected");
        wait_for_shutdown().await?;
        return Ok(());
    }

    let sweep = Arc::new(StalenessSweep::new(Arc::clone(&store), &config.worker));
    let mut scheduler = SweepScheduler::new(sweep, &config.worker).await?;
    scheduler.register_staleness_sweep().await?;
    scheduler.start().await?;

    tracing::info!(
        stale_window_minutes = config.worker.stale_window_minutes,
        sweep_interval_minutes = config.worker.sweep_interval_minutes,
        "PresenceHub server started"
    );

    wait_for_shutdown().await?;
    tracing::info!("Shutdown signal received");
    scheduler.shutdown().await?;

    Ok(())
}

/// Build the document store selected by configuration
fn build_store(config: &AppConfig) -> Result<Arc<dyn DocumentStore>, AppError> {
    match config.store.provider.as_str() {
        "memory" => Ok(Arc::new(MemoryDocumentStore::new())),
        other => Err(AppError::configuration(format!(
            "Unknown store provider: '{other}'"
        ))),
    }
}

async fn wait_for_shutdown() -> Result<(), AppError> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("Failed to listen for shutdown signal: {e}")))
}

//! Barsentry worker.
//!
//! Runs the full engine loop: poll bars, compute and cache indicators on
//! closed-bar boundaries, evaluate alerts, deliver triggers. Collaborator
//! seams are wired to the in-process implementations here; a deployment
//! swaps them for real transports.

use barsentry::config::Config;
use barsentry::core::EngineRuntime;
use barsentry::logging;
use barsentry::metrics::Metrics;
use barsentry::services::{InMemoryConfigStore, InMemoryMarketData, LogBroadcast, LogDelivery};
use dotenvy::dotenv;
use std::sync::Arc;
use tokio::signal;
use tracing::info;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let environment = barsentry::config::get_environment();
    let config = Config::from_env();
    info!("Starting Barsentry worker");
    info!(
        environment = %environment,
        symbols = ?config.symbols,
        timeframes = config.timeframes.len(),
        poll_interval = config.poll_interval_secs,
        "Configuration loaded"
    );

    let metrics = Arc::new(Metrics::new()?);
    let provider = Arc::new(InMemoryMarketData::new());
    let store = Arc::new(InMemoryConfigStore::new());

    let runtime = EngineRuntime::new(
        config,
        provider,
        store,
        Arc::new(LogDelivery),
        Arc::new(LogBroadcast),
        metrics,
    );
    runtime.start().await?;

    info!("Worker running, press Ctrl+C to stop");
    signal::ctrl_c().await?;

    info!("Shutdown signal received");
    runtime.stop().await;
    Ok(())
}

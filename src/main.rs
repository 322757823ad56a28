//! pulsewatch - health monitoring and uptime accounting daemon.

use pulsewatch::config::MonitorConfig;
use pulsewatch::db::Store;
use pulsewatch::history::HistoryStore;
use pulsewatch::monitor::Monitor;
use pulsewatch::provider::HttpConnectivityProvider;
use pulsewatch::uptime::UptimeTracker;

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("pulsewatch=info".parse()?))
        .init();

    // Load configuration
    let cfg = MonitorConfig::load();
    tracing::info!("Starting pulsewatch...");
    tracing::info!("Using database at {}", cfg.db_path);

    // Initialize database
    let store = Arc::new(Store::new(&cfg.db_path)?);
    tracing::info!("Database initialized successfully");

    let history = Arc::new(HistoryStore::new());
    let uptime = Arc::new(UptimeTracker::new(store.clone()));
    let provider = Arc::new(HttpConnectivityProvider::new(
        &cfg.connectivity_url,
        Duration::from_secs(cfg.probe_timeout_secs),
    ));

    // Start the scheduler loops
    let monitor = Monitor::new(cfg, store, history, uptime, provider);
    monitor.start().await;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    monitor.stop().await;

    Ok(())
}

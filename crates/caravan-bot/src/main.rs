//! Caravan Bot - coordinates group outings along a route of waypoints.
//!
//! Loads the configuration and waypoint catalog, then drives the caravan
//! engine from a console transport on stdin until end of input.

mod config;
mod console;

use std::io;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use caravan_core::{CaravanController, CaravanHub, ViewSynchronizer, WaypointCatalog};
use tokio::io::BufReader;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use config::{BotConfig, ChannelFilter};
use console::ConsolePlatform;

// ============================================================================
// Constants
// ============================================================================

/// Log level used when RUST_LOG is not set
const DEFAULT_LOG_FILTER: &str = "info";

/// File name prefix for the daily rolling log
const LOG_FILE_PREFIX: &str = "caravan-bot.log";

/// Initialize the tracing subscriber for logging.
///
/// Logs go to stderr, and to a daily rolling file when `log_dir` is set.
/// The returned guard must live until exit so buffered file output is flushed.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

fn load_catalog(config: &BotConfig) -> Result<WaypointCatalog> {
    let path = config.catalog_path.as_ref().ok_or_else(|| {
        anyhow::anyhow!("No waypoint catalog configured (set catalog_path or CARAVAN_CATALOG)")
    })?;
    WaypointCatalog::load(path)
        .with_context(|| format!("Failed to load waypoint catalog {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let config = BotConfig::load()?;
    let _log_guard = init_tracing(config.log_dir.as_deref());
    info!(version = env!("CARGO_PKG_VERSION"), "Caravan bot starting");

    let filter = ChannelFilter::from_config(&config)?;
    let catalog = Arc::new(load_catalog(&config)?);

    // Validate configuration and catalog, then exit
    let args: Vec<String> = std::env::args().collect();
    if args.len() > 1 && args[1] == "--check" {
        println!("Configuration OK: {} waypoints", catalog.len());
        return Ok(());
    }

    let settings = config.caravan_settings();
    let controller = Arc::new(CaravanController::new(Arc::clone(&catalog), settings.clone()));
    let sync = Arc::new(ViewSynchronizer::new(
        Arc::new(ConsolePlatform::new()),
        catalog,
        settings,
    ));
    let hub = CaravanHub::new(controller, sync);

    let dispatched = console::run(BufReader::new(tokio::io::stdin()), &hub, &filter).await?;
    hub.shutdown().await;

    info!(dispatched, "Caravan bot stopped");
    Ok(())
}

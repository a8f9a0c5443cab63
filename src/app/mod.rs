pub mod config;
pub mod logging_system;

pub use config::{Config, ConfigError, LogLevel};

use crate::domain::Level;
use crate::logger::Logger;
use crate::transport::{ConsoleTransport, HttpTransport, Transport};
use clap::Parser;
use tracing::info;

/// Entry point of the demo binary: ships a handful of records to the
/// configured collector and shuts the pipeline down cleanly.
pub async fn main() -> anyhow::Result<()> {
    let config = Config::try_parse()?;
    config.validate()?;
    logging_system::init_tracing(config.log_level, false)?;

    let http = HttpTransport::new(&config, [Level::Info, Level::Warn, Level::Error, Level::Access])?;
    let console = ConsoleTransport::new([Level::Debug]);
    let logger = Logger::new(
        &config,
        "remote-log-demo",
        30,
        vec![Transport::Http(http), Transport::Console(console)],
    )?;

    logger.init().await?;
    info!("Registered with collector at {}", config.api_url);

    logger.info("demo started");
    logger.warn("demo warning");
    logger.debug("printed to the console only");
    logger.error(std::io::Error::other("demo error"));

    let report = logger.shutdown().await;
    info!(
        "Shutdown complete: {} entries flushed, {} retries abandoned",
        report.flushed_entries, report.abandoned_retries
    );
    Ok(())
}

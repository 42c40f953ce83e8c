//! Beacon CLI
//!
//! Command-line interface for the API usage notification and health monitoring service.

use std::path::PathBuf;

use beacon::{load_config, Config};
use clap::Parser;
use tracing::Level;

#[derive(Parser)]
#[command(name = "beacon")]
#[command(about = "API usage notifications and health monitoring")]
#[command(version)]
struct Args {
    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Server port (overrides config file and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Log level
    #[arg(short, long, default_value = "info")]
    log_level: Level,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    tracing::debug!(
        "Parsed command line arguments: config={:?}, port={:?}, log_level={:?}",
        args.config,
        args.port,
        args.log_level
    );

    let mut config = if let Some(config_path) = &args.config {
        tracing::debug!("Loading configuration from {:?}", config_path);
        load_config(config_path)?
    } else {
        tracing::debug!("Using default configuration");
        Config::default()
    };

    config.apply_process_env()?;

    if let Some(port) = args.port {
        config.server.port = port;
    }

    tracing::info!("Starting beacon service");
    tracing::debug!(
        "Channels: {}, notification interval: {}s, check interval: {}s",
        config.enabled_channels().count(),
        config.notifications.interval_seconds,
        config.monitor.check_interval_seconds
    );

    beacon::run(config).await?;

    Ok(())
}

//! Liquidation auction bidder - Entry Point

use anyhow::Result;
use clap::Parser;
use tracing::info;

/// Liquidation auction bidder
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    /// Configuration file path (can also be set via AUCTION_BIDDER_CONFIG env var)
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    auction_telemetry::init_logging()?;

    info!("Starting auction bidder v{}", env!("CARGO_PKG_VERSION"));

    // CLI arg > AUCTION_BIDDER_CONFIG env var > default
    let config_path = args
        .config
        .or_else(|| std::env::var("AUCTION_BIDDER_CONFIG").ok())
        .unwrap_or_else(|| "config/default.toml".to_string());

    info!(config_path = %config_path, "Loading configuration");
    let config = auction_bot::AppConfig::from_file(&config_path)?;
    info!(network = ?config.network, markets = ?config.strategy.markets, "Configuration loaded");

    let mut app = auction_bot::Application::new(config)?;

    info!("Loading markets...");
    app.bootstrap().await?;

    app.run().await?;

    Ok(())
}

//! Decibel bot binary.
//!
//! Loads configuration, opens the state store and runs the Discord client
//! until it stops.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use decibel::{ObservabilityConfig, init_observability};
use decibel_database::Store;
use decibel_error::DecibelResult;
use decibel_discord::{DecibelBot, DecibelConfig};
use tracing::{error, info};

/// Decibel - measures the loudness of audio clips posted to Discord
#[derive(Parser, Debug)]
#[command(name = "decibel")]
#[command(about = "Discord bot that measures audio clip loudness", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file (default: ./decibel.toml if present)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

/// Load configuration and open the state store.
fn prepare(cli: &Cli) -> DecibelResult<(DecibelConfig, Store)> {
    let config = DecibelConfig::load(cli.config.as_deref())?;
    let store = Store::open(&config.database_path)?;
    info!(path = %config.database_path.display(), "Opened database");
    Ok((config, store))
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // .env is optional; real environment variables take precedence.
    let dotenv = dotenvy::dotenv();

    let log_level = if cli.verbose { "debug" } else { "info" };
    init_observability(
        &ObservabilityConfig::new()
            .with_log_level(log_level)
            .with_json_logs(cli.json_logs),
    )?;
    if let Ok(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let (config, store) = prepare(&cli).inspect_err(|e| {
        error!(error = %e, "Startup failed");
    })?;

    let mut bot = DecibelBot::new(&config, Arc::new(store)).await?;
    bot.start().await?;

    info!("Discord client stopped");
    Ok(())
}

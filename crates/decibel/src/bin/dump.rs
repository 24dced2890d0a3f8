//! Print every table of a Decibel database.

use std::path::PathBuf;

use clap::Parser;
use decibel::dump::render_snapshot;
use decibel_database::Store;

/// Inspect the Decibel state store
#[derive(Parser, Debug)]
#[command(name = "decibel-dump")]
#[command(about = "Print every table of a Decibel database", long_about = None)]
#[command(version)]
struct Cli {
    /// Database file
    #[arg(default_value = "bot.db")]
    database: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Opening a missing path would create an empty database.
    if !cli.database.exists() {
        return Err(format!("database not found: {}", cli.database.display()).into());
    }

    let snapshot = Store::open(&cli.database)?.snapshot().await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        print!("{}", render_snapshot(&snapshot));
    }
    Ok(())
}

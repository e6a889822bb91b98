//! phrasecut command-line entry point
//!
//! ```bash
//! phrasecut probe --input talk.mp4
//! phrasecut slice --input talk.mp4 --expression "break a leg" --start 1:02 --end 1:05
//! phrasecut repeat --input clip.mp4 --count 3 --output drill.mp4
//! ```

use anyhow::Result;
use clap::Parser;
use tracing::info;

use phrasecut::adapters::init_logging;
use phrasecut::cli::{commands, Cli};
use phrasecut::config_initialization::initialize_configuration;

/// Main entry point for the phrasecut CLI application
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = initialize_configuration(cli.config.as_deref(), &cli.overrides())?;
    init_logging(&config.logging);

    info!("Starting phrasecut {}", env!("CARGO_PKG_VERSION"));
    commands::execute(cli.command, config).await
}

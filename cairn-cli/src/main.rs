//! Cairn CLI
//!
//! Command-line interface for checking label templates and running
//! checkpoint steps by hand.

mod commands;
mod config;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, handle_command};
use config::Config;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "cairn")]
#[command(about = "Cairn SCM checkpoint CLI", long_about = None)]
struct Cli {
    /// TOML file holding the checkpoint defaults
    #[arg(long, global = true, env = "CAIRN_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Library warnings go to stderr so they never mix with command output
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config {
        defaults_path: cli.config,
    };

    handle_command(cli.command, &config).await
}

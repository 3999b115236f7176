//! Marquee CLI - Command-line interface
//!
//! Resolves catalog pages, metadata and streams against the configured
//! upstream and prints the JSON envelopes the front end would receive.

mod commands;

use std::path::PathBuf;

use clap::Parser;
use marquee_core::tracing_setup::{CliLogLevel, init_tracing};

#[derive(Parser)]
#[command(name = "marquee")]
#[command(about = "Catalog resolution for a media front end")]
struct Cli {
    /// Console log level
    #[arg(long, value_enum, default_value = "warn")]
    log_level: CliLogLevel,

    /// Also write a full trace to marquee-last-run.log in this directory
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: commands::Commands,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level.as_tracing_level(), cli.log_dir.as_deref())?;

    let result = commands::handle_command(cli.command).await;
    if let Err(e) = &result {
        tracing::error!("Command failed: {:#}", e);
    }
    result
}

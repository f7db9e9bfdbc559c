//! Marketscout - startup market research pipeline
//!
//! CLI entry point.

#![forbid(unsafe_code)]

use anyhow::Result;
use clap::Parser;
use tracing::{debug, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cli;
mod config;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "marketscout=info,marketscout_core=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = cli::Cli::parse();

    if cli.command.is_some() {
        debug!("Marketscout v{}", env!("CARGO_PKG_VERSION"));

        if !std::path::Path::new(".env").exists() {
            warn!(".env file not found; API keys must come from the environment");
        }
    }

    cli::run(cli).await
}

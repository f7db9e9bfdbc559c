//! CLI module for Marketscout
//!
//! Provides commands:
//! - `run`: generate segments and size the top ones
//! - `summary`: re-render the summary of a saved run
//! - `config`: print the effective configuration

use crate::config::Mode;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

pub mod config;
pub mod run;
pub mod summary;

/// Marketscout market research CLI
#[derive(Parser, Debug)]
#[command(name = "marketscout")]
#[command(about = "Segment generation and struggle-aware market sizing")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run the research pipeline
    Run(RunArgs),
    /// Print the summary of a saved run
    Summary {
        /// Result file written by `run`
        file: PathBuf,
    },
    /// Print the effective configuration (secrets masked)
    Config,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Startup idea
    #[arg(long, required_unless_present = "brief")]
    pub idea: Option<String>,

    /// Jobs-to-be-Done statement
    #[arg(long, required_unless_present = "brief")]
    pub jtbd: Option<String>,

    /// Target market
    #[arg(long)]
    pub location: Option<String>,

    /// JSON file with idea, jtbd and location
    #[arg(long, conflicts_with_all = ["idea", "jtbd"])]
    pub brief: Option<PathBuf>,

    /// Research backend
    #[arg(long, value_enum)]
    pub mode: Option<Mode>,

    /// Size every segment, not just primary and secondary
    #[arg(long)]
    pub size_all: bool,

    /// Concurrent sizing runs (1 = sequential)
    #[arg(long)]
    pub workers: Option<usize>,

    /// Directory for the result file
    #[arg(long)]
    pub output_dir: Option<PathBuf>,
}

/// Run the CLI command
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Some(Commands::Run(args)) => run::run(args).await,
        Some(Commands::Summary { file }) => summary::run(&file),
        Some(Commands::Config) => config::run(),
        None => {
            let mut cmd = <Cli as clap::CommandFactory>::command();
            cmd.print_help()?;
            println!();
            Ok(())
        }
    }
}

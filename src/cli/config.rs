//! `marketscout config` - print the effective configuration

use crate::config::load_config;
use anyhow::{Context, Result};

pub fn run() -> Result<()> {
    let config = load_config().context("Failed to load configuration")?;

    println!("{:#?}", config);
    println!();
    println!(
        "OpenRouter key: {}",
        if config.llm.resolved_key().is_some() { "set" } else { "missing" }
    );
    println!(
        "Firecrawl key:  {}",
        if config.firecrawl.resolved_key().is_some() { "set" } else { "missing" }
    );
    Ok(())
}

//! `marketscout summary` - re-render a saved run

use anyhow::{Context, Result};
use marketscout_core::{format_run_summary, PipelineResult, ResultStore};
use std::path::Path;

pub fn run(file: &Path) -> Result<()> {
    let result: PipelineResult = ResultStore::load(file)
        .with_context(|| format!("Failed to read run result {}", file.display()))?;
    print!("{}", format_run_summary(&result));
    Ok(())
}

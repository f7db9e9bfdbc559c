//! `marketscout run` - the research pipeline

use super::RunArgs;
use crate::config::{load_config, AppConfig, Mode};
use anyhow::{Context, Result};
use marketscout_core::{
    format_run_summary, AgentResearcher, ExtractionResearcher, MarketSizer, PipelineDriver,
    ResearchBrief, ResultStore, RunStatus, SegmentGenerator,
};
use marketscout_llm::{LlmProvider, OpenRouterProvider};
use marketscout_tools::{FirecrawlClient, ToolAdapter};
use std::sync::Arc;
use tracing::info;

type Researchers = (Arc<dyn SegmentGenerator>, Arc<dyn MarketSizer>);

pub async fn run(args: RunArgs) -> Result<()> {
    let mut config = load_config().context("Failed to load configuration")?;
    apply_overrides(&mut config, &args);

    let brief = read_brief(&args)?;
    let (generator, sizer) = build_researchers(&config)?;

    let store = ResultStore::new(&config.pipeline.output_dir)
        .with_prefix(&config.pipeline.output_prefix);
    let driver =
        PipelineDriver::new(generator, sizer, store).with_config(config.pipeline_config()?);

    info!(
        mode = config.pipeline.mode.as_str(),
        workers = config.pipeline.active_workers(),
        size_all = config.pipeline.size_all,
        "Starting research run"
    );

    let run = driver.run(&brief).await.context("Pipeline run failed")?;

    print!("{}", format_run_summary(&run.result));
    println!();
    println!("Results saved to {}", run.path.display());

    if run.result.status == RunStatus::Failed {
        anyhow::bail!(
            "{}",
            run.result.error.as_deref().unwrap_or("pipeline failed")
        );
    }
    Ok(())
}

fn apply_overrides(config: &mut AppConfig, args: &RunArgs) {
    if let Some(mode) = args.mode {
        config.pipeline.mode = mode;
    }
    if args.size_all {
        config.pipeline.size_all = true;
    }
    if let Some(workers) = args.workers {
        config.pipeline.set_active_workers(workers.max(1));
    }
    if let Some(dir) = &args.output_dir {
        config.pipeline.output_dir = dir.clone();
    }
}

fn read_brief(args: &RunArgs) -> Result<ResearchBrief> {
    let mut brief = match &args.brief {
        Some(path) => ResearchBrief::from_json_file(path)
            .with_context(|| format!("Failed to read brief {}", path.display()))?,
        None => ResearchBrief::new(
            args.idea.clone().unwrap_or_default(),
            args.jtbd.clone().unwrap_or_default(),
        ),
    };
    if let Some(location) = &args.location {
        brief = brief.with_location(location);
    }
    brief.validate().context("Invalid research brief")?;
    Ok(brief)
}

fn build_researchers(config: &AppConfig) -> Result<Researchers> {
    let firecrawl_key = config
        .firecrawl
        .resolved_key()
        .context("FIRECRAWL_API_KEY not set (or firecrawl.api_key in config)")?;
    let client = Arc::new(
        FirecrawlClient::new(config.firecrawl.client_config(firecrawl_key))
            .context("Failed to create Firecrawl client")?,
    );

    match config.pipeline.mode {
        Mode::Agent => {
            let llm_key = config
                .llm
                .resolved_key()
                .context("OPENROUTER_API_KEY not set (or llm.api_key in config)")?;
            let llm: Arc<dyn LlmProvider> = Arc::new(
                OpenRouterProvider::new(config.llm.provider_config(llm_key))
                    .context("Failed to create OpenRouter provider")?,
            );
            let tools = ToolAdapter::new(client).with_config(config.tools.adapter_config());
            let researcher = Arc::new(AgentResearcher::new(
                llm,
                tools,
                config.agent_config(config.agent.generation_tool_budget),
                config.agent_config(config.agent.sizing_tool_budget),
            ));
            let generator: Arc<dyn SegmentGenerator> = researcher.clone();
            let sizer: Arc<dyn MarketSizer> = researcher;
            Ok((generator, sizer))
        }
        Mode::Extract => {
            let researcher = Arc::new(
                ExtractionResearcher::new(client)
                    .with_cost_per_credit(config.ledger.cost_per_credit),
            );
            let generator: Arc<dyn SegmentGenerator> = researcher.clone();
            let sizer: Arc<dyn MarketSizer> = researcher;
            Ok((generator, sizer))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn args() -> RunArgs {
        RunArgs {
            idea: Some("Meal kits".to_string()),
            jtbd: Some("Cook dinner fast".to_string()),
            location: None,
            brief: None,
            mode: None,
            size_all: false,
            workers: None,
            output_dir: None,
        }
    }

    #[test]
    fn test_overrides_replace_config() {
        let mut config = load_config().unwrap();
        let mut args = args();
        args.mode = Some(Mode::Extract);
        args.size_all = true;
        args.workers = Some(0);
        args.output_dir = Some(PathBuf::from("out"));

        apply_overrides(&mut config, &args);
        assert_eq!(config.pipeline.mode, Mode::Extract);
        assert!(config.pipeline.size_all);
        assert_eq!(config.pipeline.extract_workers, 1);
        assert_eq!(config.pipeline.workers, 3);
        assert_eq!(config.pipeline.output_dir, PathBuf::from("out"));
    }

    #[test]
    fn test_workers_flag_applies_to_selected_mode() {
        let mut config = load_config().unwrap();
        let mut args = args();
        args.workers = Some(2);
        apply_overrides(&mut config, &args);
        assert_eq!(config.pipeline.workers, 2);
        assert_eq!(config.pipeline_config().unwrap().sizing.workers, 2);

        let mut config = load_config().unwrap();
        args.mode = Some(Mode::Extract);
        apply_overrides(&mut config, &args);
        assert_eq!(config.pipeline.extract_workers, 2);
        assert_eq!(config.pipeline_config().unwrap().sizing.workers, 2);
    }

    #[test]
    fn test_brief_from_flags() {
        let mut args = args();
        args.location = Some("Canada".to_string());
        let brief = read_brief(&args).unwrap();
        assert_eq!(brief.idea, "Meal kits");
        assert_eq!(brief.location, "Canada");
    }

    #[test]
    fn test_blank_brief_rejected() {
        let mut args = args();
        args.idea = Some("   ".to_string());
        assert!(read_brief(&args).is_err());
    }
}

//! Application configuration
//!
//! Contains the configuration sections and their conversion into the
//! library crates' settings. Loading lives in `loader`.

mod loader;

pub use loader::load_config;

use anyhow::{Context, Result};
use marketscout_core::{AgentConfig, PipelineConfig, SizingConfig};
use marketscout_llm::{mask_api_key, OpenRouterConfig};
use marketscout_tools::{AdapterConfig, FirecrawlConfig};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub llm: LlmSection,
    pub firecrawl: FirecrawlSection,
    pub agent: AgentSection,
    pub tools: ToolsSection,
    pub pipeline: PipelineSection,
    pub ledger: LedgerSection,
}

/// Research backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// LLM reasoning loop with search and scrape tools
    Agent,
    /// One structured extraction call per stage
    Extract,
}

impl Mode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Agent => "agent",
            Self::Extract => "extract",
        }
    }
}

/// OpenRouter settings
#[derive(Clone, Serialize, Deserialize)]
pub struct LlmSection {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
    #[serde(default)]
    pub app_name: Option<String>,
}

impl fmt::Debug for LlmSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmSection")
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .field("app_name", &self.app_name)
            .finish()
    }
}

impl LlmSection {
    /// Key from config, falling back to `OPENROUTER_API_KEY`
    pub fn resolved_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("OPENROUTER_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn provider_config(&self, api_key: String) -> OpenRouterConfig {
        let mut config = OpenRouterConfig::new(api_key)
            .with_base_url(&self.base_url)
            .with_model(&self.model)
            .with_timeout(Duration::from_secs(self.timeout_secs));
        config.app_name = self.app_name.clone();
        config
    }
}

/// Firecrawl settings
#[derive(Clone, Serialize, Deserialize)]
pub struct FirecrawlSection {
    #[serde(default)]
    pub api_key: Option<String>,
    pub base_url: String,
    pub timeout_secs: u64,
    pub agent_model: String,
    pub poll_interval_secs: u64,
    pub agent_timeout_secs: u64,
}

impl fmt::Debug for FirecrawlSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FirecrawlSection")
            .field("api_key", &self.api_key.as_deref().map(mask_api_key))
            .field("base_url", &self.base_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("agent_model", &self.agent_model)
            .field("poll_interval_secs", &self.poll_interval_secs)
            .field("agent_timeout_secs", &self.agent_timeout_secs)
            .finish()
    }
}

impl FirecrawlSection {
    /// Key from config, falling back to `FIRECRAWL_API_KEY`
    pub fn resolved_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| std::env::var("FIRECRAWL_API_KEY").ok())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn client_config(&self, api_key: String) -> FirecrawlConfig {
        FirecrawlConfig::new(api_key)
            .with_base_url(&self.base_url)
            .with_timeout(Duration::from_secs(self.timeout_secs))
            .with_agent_model(&self.agent_model)
            .with_agent_polling(
                Duration::from_secs(self.poll_interval_secs),
                Duration::from_secs(self.agent_timeout_secs),
            )
    }
}

/// Reasoning loop settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSection {
    pub max_turns: usize,
    pub generation_tool_budget: usize,
    pub sizing_tool_budget: usize,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Search/scrape tool settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsSection {
    pub max_search_results: usize,
    pub scrape_char_limit: usize,
    pub loop_window: usize,
    pub loop_threshold: usize,
}

impl ToolsSection {
    pub fn adapter_config(&self) -> AdapterConfig {
        AdapterConfig {
            max_search_results: self.max_search_results,
            scrape_char_limit: self.scrape_char_limit,
            ..AdapterConfig::default()
        }
    }
}

/// Pipeline settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineSection {
    pub mode: Mode,
    pub max_targets: usize,
    pub size_all: bool,
    pub workers: usize,
    #[serde(default = "default_extract_workers")]
    pub extract_workers: usize,
    pub request_delay_secs: f64,
    pub output_dir: PathBuf,
    pub output_prefix: String,
}

fn default_extract_workers() -> usize {
    1
}

impl PipelineSection {
    /// Worker count for the selected mode (at least 1)
    pub fn active_workers(&self) -> usize {
        match self.mode {
            Mode::Agent => self.workers,
            Mode::Extract => self.extract_workers,
        }
        .max(1)
    }

    /// Override the worker count of the selected mode
    pub fn set_active_workers(&mut self, workers: usize) {
        match self.mode {
            Mode::Agent => self.workers = workers,
            Mode::Extract => self.extract_workers = workers,
        }
    }

    /// Delay between sequential sizing calls
    pub fn request_delay(&self) -> Result<Duration> {
        Duration::try_from_secs_f64(self.request_delay_secs).with_context(|| {
            format!(
                "pipeline.request_delay_secs must be a finite, non-negative number of seconds (got {})",
                self.request_delay_secs
            )
        })
    }
}

/// Cost accounting settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerSection {
    pub cost_per_credit: f64,
}

impl AppConfig {
    /// Agent settings for one stage
    pub fn agent_config(&self, tool_budget: usize) -> AgentConfig {
        AgentConfig::generation()
            .with_model(&self.llm.model)
            .with_max_turns(self.agent.max_turns)
            .with_tool_budget(tool_budget)
            .with_guard(self.tools.loop_window, self.tools.loop_threshold)
            .with_cost_per_credit(self.ledger.cost_per_credit)
            .with_sampling(self.agent.temperature, self.agent.max_tokens)
    }

    pub fn pipeline_config(&self) -> Result<PipelineConfig> {
        Ok(PipelineConfig {
            max_targets: self.pipeline.max_targets,
            size_all: self.pipeline.size_all,
            sizing: SizingConfig {
                workers: self.pipeline.active_workers(),
                request_delay: self.pipeline.request_delay()?,
            },
            cost_per_credit: self.ledger.cost_per_credit,
            mode: self.pipeline.mode.as_str().to_string(),
        })
    }

    /// Reject values that cannot be turned into runtime settings
    pub fn validate(&self) -> Result<()> {
        self.pipeline.request_delay()?;
        Ok(())
    }
}

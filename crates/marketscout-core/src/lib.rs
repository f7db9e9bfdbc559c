//! Marketscout Core - research pipeline
//!
//! This crate provides the pipeline that turns a research brief into a
//! persisted market analysis:
//! - Model: segments, market sizing and stage outcomes
//! - Agent: tool-augmented reasoning loop
//! - Research: agent and extraction backends behind common traits
//! - Sizing: bounded parallel per-segment orchestration
//! - Pipeline: generation, target selection, sizing, assembly, persistence

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod agent;
pub mod brief;
pub mod error;
pub mod model;
pub mod pipeline;
pub mod prompts;
pub mod report;
pub mod research;
pub mod sizing;
pub mod stage;
pub mod store;

#[cfg(test)]
pub(crate) mod fixtures;

pub use agent::{AgentConfig, AgentRunner};
pub use brief::ResearchBrief;
pub use error::{Error, Result};
pub use model::{MarketSizing, Outcome, Priority, Segment, SegmentSet, StructuredOutput};
pub use pipeline::{
    select_targets, PipelineConfig, PipelineDriver, PipelineResult, PipelineRun, RunStatus,
};
pub use report::format_run_summary;
pub use research::{AgentResearcher, ExtractionResearcher, MarketSizer, SegmentGenerator};
pub use sizing::{SizingConfig, SizingEntry, SizingOrchestrator, SizingPhase};
pub use stage::{RunStats, StageOutput, ToolLogEntry};
pub use store::ResultStore;

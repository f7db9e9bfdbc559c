//! Pipeline driver
//!
//! generate segments -> select targets -> size them -> assemble -> persist.
//! A generation failure stops the run before sizing, but the failed run is
//! still assembled and persisted so spent credits are on record.

use crate::brief::ResearchBrief;
use crate::error::Result;
use crate::model::{Outcome, Priority, Segment, SegmentSet};
use crate::research::{MarketSizer, SegmentGenerator};
use crate::sizing::{SizingConfig, SizingEntry, SizingOrchestrator, SizingPhase};
use crate::stage::{RunStats, ToolLogEntry};
use crate::store::ResultStore;
use chrono::{DateTime, Utc};
use marketscout_llm::{LedgerSummary, UsageLedger, DEFAULT_COST_PER_CREDIT};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, info, instrument, warn};
use uuid::Uuid;

/// Segments sized when `size_all` is off
pub const DEFAULT_MAX_TARGETS: usize = 3;

// ============================================================================
// Configuration
// ============================================================================

/// Pipeline settings
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Cap on primary + secondary targets
    pub max_targets: usize,
    /// Size every generated segment instead
    pub size_all: bool,
    /// Orchestrator settings
    pub sizing: SizingConfig,
    /// Price per credit for the run ledger
    pub cost_per_credit: f64,
    /// Backend label written to the run metadata
    pub mode: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_targets: DEFAULT_MAX_TARGETS,
            size_all: false,
            sizing: SizingConfig::default(),
            cost_per_credit: DEFAULT_COST_PER_CREDIT,
            mode: "agent".to_string(),
        }
    }
}

// ============================================================================
// Result document
// ============================================================================

/// Final run status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Segments generated; sizing attempted
    Completed,
    /// Generation failed; nothing sized
    Failed,
}

/// Run identification and inputs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Unique run id
    pub run_id: Uuid,
    /// Startup idea
    pub idea: String,
    /// JTBD statement
    pub jtbd: String,
    /// Target market
    pub location: String,
    /// Research backend
    pub mode: String,
    /// Whether every segment was sized
    pub size_all: bool,
    /// Concurrent sizing workers
    pub workers: usize,
    /// Run start
    pub started_at: DateTime<Utc>,
    /// Run end
    pub finished_at: DateTime<Utc>,
    /// Wall time of the run
    pub duration_seconds: f64,
}

/// Phase timings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunTiming {
    /// Segment generation
    pub generation_seconds: f64,
    /// Sizing phase wall time
    pub sizing_seconds: f64,
    /// Whole run
    pub total_seconds: f64,
    /// Sum of per-segment sizing durations over sizing wall time
    pub parallel_speedup: f64,
}

/// Generation stage record
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GenerationRecord {
    /// parsed / unparsed / failed
    pub status: String,
    /// Run counters
    pub stats: RunStats,
    /// Tool observations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_log: Vec<ToolLogEntry>,
    /// Raw final answer when it did not parse
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

/// The persisted document for one run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineResult {
    /// Completed or failed
    pub status: RunStatus,
    /// Inputs and timestamps
    pub metadata: RunMetadata,
    /// Ledger summary of the whole run
    pub usage: LedgerSummary,
    /// Phase timings
    pub timing: RunTiming,
    /// Every generated segment
    pub segments: Vec<Segment>,
    /// Generation stage record
    pub generation: GenerationRecord,
    /// One entry per sized segment
    pub sizing_results: Vec<SizingEntry>,
    /// Shape deviations and other non-fatal findings
    #[serde(default)]
    pub warnings: Vec<String>,
    /// Why the run failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    /// Sizing entries with parsed data
    #[must_use]
    pub fn sized_count(&self) -> usize {
        self.sizing_results
            .iter()
            .filter(|e| e.market_sizing.is_parsed())
            .count()
    }
}

/// A finished run and where it was written
#[derive(Debug, Clone)]
pub struct PipelineRun {
    /// The result document
    pub result: PipelineResult,
    /// Path of the persisted file
    pub path: PathBuf,
}

// ============================================================================
// Target selection
// ============================================================================

/// Segments to size, in submission order.
///
/// Primary segments first, then secondary, capped at `max_targets`. With
/// `size_all` every segment is returned, still ordered by priority.
#[must_use]
pub fn select_targets(segments: &[Segment], max_targets: usize, size_all: bool) -> Vec<Segment> {
    let mut ordered: Vec<&Segment> = segments.iter().collect();
    // stable: generation order is kept within a tier
    ordered.sort_by_key(|s| s.priority);

    if size_all {
        return ordered.into_iter().cloned().collect();
    }
    ordered
        .into_iter()
        .filter(|s| s.priority != Priority::Alternative)
        .take(max_targets)
        .cloned()
        .collect()
}

// ============================================================================
// Driver
// ============================================================================

/// Runs the two-stage pipeline
pub struct PipelineDriver {
    generator: Arc<dyn SegmentGenerator>,
    sizer: Arc<dyn MarketSizer>,
    store: ResultStore,
    config: PipelineConfig,
}

impl PipelineDriver {
    /// Create a driver
    #[must_use]
    pub fn new(
        generator: Arc<dyn SegmentGenerator>,
        sizer: Arc<dyn MarketSizer>,
        store: ResultStore,
    ) -> Self {
        Self {
            generator,
            sizer,
            store,
            config: PipelineConfig::default(),
        }
    }

    /// Override settings
    #[must_use]
    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    /// Current settings
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run the pipeline and persist the result once.
    ///
    /// Only brief validation and persistence errors are returned as `Err`;
    /// research failures end up in the persisted document.
    #[instrument(skip(self, brief), fields(mode = %self.config.mode))]
    pub async fn run(&self, brief: &ResearchBrief) -> Result<PipelineRun> {
        brief.validate()?;
        let result = self.execute(brief).await;
        let path = self.store.persist(&result)?;
        Ok(PipelineRun { result, path })
    }

    /// Run the pipeline without persisting
    pub async fn execute(&self, brief: &ResearchBrief) -> PipelineResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let start = Instant::now();
        let mut ledger = UsageLedger::new().with_cost_per_credit(self.config.cost_per_credit);

        info!(run_id = %run_id, idea = %brief.idea, location = %brief.location, "Pipeline started");

        // Stage 1: segments
        let generation_start = Instant::now();
        let output = self.generator.generate(brief).await;
        let generation_seconds = generation_start.elapsed().as_secs_f64();
        ledger.merge(output.ledger);

        let mut generation = GenerationRecord {
            status: output.outcome.label().to_string(),
            stats: output.stats,
            tool_log: output.tool_log,
            raw_output: None,
        };

        let draft = Draft {
            brief,
            run_id,
            started_at,
            start,
            generation_seconds,
            mode: &self.config.mode,
            size_all: self.config.size_all,
            workers: self.config.sizing.workers.max(1),
        };

        let set = match output.outcome {
            Outcome::Parsed { data } => data,
            Outcome::Unparsed { raw, reason } => {
                generation.raw_output = Some(raw);
                let message = format!("segment generation output did not parse: {}", reason);
                error!(run_id = %run_id, error = %message, "Pipeline halted");
                return draft.failed(ledger, generation, Vec::new(), Vec::new(), message);
            }
            Outcome::Failed { error: e } => {
                let message = format!("segment generation failed: {}", e);
                error!(run_id = %run_id, error = %message, "Pipeline halted");
                return draft.failed(ledger, generation, Vec::new(), Vec::new(), message);
            }
        };

        let warnings = set.shape_warnings();
        for warning in &warnings {
            warn!(run_id = %run_id, warning = %warning, "Segment set deviates from expected shape");
        }
        log_segments(&set);

        if set.count(Priority::Primary) == 0 {
            let message = "segment generation returned no primary segment".to_string();
            error!(run_id = %run_id, "Pipeline halted: no primary segment");
            return draft.failed(ledger, generation, set.segments, warnings, message);
        }

        // Stage 2: sizing
        let targets = select_targets(&set.segments, self.config.max_targets, self.config.size_all);
        info!(
            run_id = %run_id,
            targets = targets.len(),
            skipped = set.segments.len() - targets.len(),
            "Selected segments for sizing"
        );
        let phase = SizingOrchestrator::new(Arc::clone(&self.sizer))
            .with_config(self.config.sizing.clone())
            .run(brief, &targets, &ledger)
            .await;

        draft.completed(ledger, generation, set.segments, warnings, phase)
    }
}

/// Inputs shared by both assembly paths
struct Draft<'a> {
    brief: &'a ResearchBrief,
    run_id: Uuid,
    started_at: DateTime<Utc>,
    start: Instant,
    generation_seconds: f64,
    mode: &'a str,
    size_all: bool,
    workers: usize,
}

impl Draft<'_> {
    fn metadata(&self) -> RunMetadata {
        RunMetadata {
            run_id: self.run_id,
            idea: self.brief.idea.clone(),
            jtbd: self.brief.jtbd.clone(),
            location: self.brief.location.clone(),
            mode: self.mode.to_string(),
            size_all: self.size_all,
            workers: self.workers,
            started_at: self.started_at,
            finished_at: Utc::now(),
            duration_seconds: self.start.elapsed().as_secs_f64(),
        }
    }

    fn failed(
        &self,
        ledger: UsageLedger,
        generation: GenerationRecord,
        segments: Vec<Segment>,
        warnings: Vec<String>,
        error: String,
    ) -> PipelineResult {
        let metadata = self.metadata();
        PipelineResult {
            status: RunStatus::Failed,
            timing: RunTiming {
                generation_seconds: self.generation_seconds,
                sizing_seconds: 0.0,
                total_seconds: metadata.duration_seconds,
                parallel_speedup: 0.0,
            },
            metadata,
            usage: ledger.summary(),
            segments,
            generation,
            sizing_results: Vec::new(),
            warnings,
            error: Some(error),
        }
    }

    fn completed(
        &self,
        mut ledger: UsageLedger,
        generation: GenerationRecord,
        segments: Vec<Segment>,
        warnings: Vec<String>,
        phase: SizingPhase,
    ) -> PipelineResult {
        ledger.merge(phase.ledger);
        let metadata = self.metadata();
        let result = PipelineResult {
            status: RunStatus::Completed,
            timing: RunTiming {
                generation_seconds: self.generation_seconds,
                sizing_seconds: phase.wall_seconds,
                total_seconds: metadata.duration_seconds,
                parallel_speedup: phase.speedup,
            },
            metadata,
            usage: ledger.summary(),
            segments,
            generation,
            sizing_results: phase.entries,
            warnings,
            error: None,
        };
        info!(
            run_id = %result.metadata.run_id,
            segments = result.segments.len(),
            sized = result.sized_count(),
            credits = result.usage.total_credits,
            cost_usd = result.usage.estimated_cost_usd,
            "Pipeline completed"
        );
        result
    }
}

fn log_segments(set: &SegmentSet) {
    for priority in [Priority::Primary, Priority::Secondary, Priority::Alternative] {
        let names: Vec<&str> = set.with_priority(priority).map(|s| s.name.as_str()).collect();
        info!(priority = %priority, count = names.len(), segments = ?names, "Generated segments");
    }
}

//! Sizing orchestrator - bounded parallel per-segment market sizing
//!
//! Each target segment gets its own tokio task. A semaphore caps how many
//! run at once. Every task returns its own ledger; ledgers are merged into
//! the phase ledger only after all tasks have joined, in submission order.
//! A task that fails or panics fills its own slot and nothing else.

use crate::brief::ResearchBrief;
use crate::model::{MarketSizing, Outcome, Priority, Segment};
use crate::research::MarketSizer;
use crate::stage::{RunStats, StageOutput, ToolLogEntry};
use futures::future::join_all;
use marketscout_llm::UsageLedger;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, error, info, warn};

/// Concurrent sizing runs
pub const DEFAULT_WORKERS: usize = 3;

/// Pause between sizing calls when running one at a time
pub const DEFAULT_REQUEST_DELAY: Duration = Duration::from_secs(2);

/// Orchestrator settings
#[derive(Debug, Clone)]
pub struct SizingConfig {
    /// Maximum concurrent sizing runs; 1 means sequential
    pub workers: usize,
    /// Delay between sequential calls
    pub request_delay: Duration,
}

impl Default for SizingConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            request_delay: DEFAULT_REQUEST_DELAY,
        }
    }
}

/// Sizing result for one segment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SizingEntry {
    /// Segment name
    pub segment: String,
    /// Segment priority
    pub priority: Priority,
    /// Sizing, unparsed text or error
    pub market_sizing: Outcome<MarketSizing>,
    /// Credits charged for this segment
    pub credits: u64,
    /// Tokens consumed for this segment
    pub tokens: u64,
    /// Time spent on this segment
    pub duration_seconds: f64,
    /// Run counters
    pub stats: RunStats,
    /// Tool observations
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_log: Vec<ToolLogEntry>,
}

/// Everything the sizing phase produced
#[derive(Debug, Clone)]
pub struct SizingPhase {
    /// One entry per target, in submission order
    pub entries: Vec<SizingEntry>,
    /// Merged worker ledgers
    pub ledger: UsageLedger,
    /// Wall time of the phase
    pub wall_seconds: f64,
    /// Sum of per-segment durations
    pub worker_seconds: f64,
    /// `worker_seconds / wall_seconds`
    pub speedup: f64,
}

impl SizingPhase {
    /// Entries with parsed sizing data
    #[must_use]
    pub fn completed(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.market_sizing.is_parsed())
            .count()
    }
}

/// Fans sizing runs out across a bounded worker pool
pub struct SizingOrchestrator {
    sizer: Arc<dyn MarketSizer>,
    config: SizingConfig,
}

impl SizingOrchestrator {
    /// Create an orchestrator with default settings
    #[must_use]
    pub fn new(sizer: Arc<dyn MarketSizer>) -> Self {
        Self {
            sizer,
            config: SizingConfig::default(),
        }
    }

    /// Override settings
    #[must_use]
    pub fn with_config(mut self, config: SizingConfig) -> Self {
        self.config = config;
        self
    }

    /// Size every target. `parent` supplies the pricing for the phase ledger.
    pub async fn run(
        &self,
        brief: &ResearchBrief,
        targets: &[Segment],
        parent: &UsageLedger,
    ) -> SizingPhase {
        let start = Instant::now();
        let workers = self.config.workers.max(1);
        info!(
            targets = targets.len(),
            workers,
            sizer = self.sizer.name(),
            "Starting market sizing"
        );

        let outputs = if workers == 1 {
            self.run_sequential(brief, targets).await
        } else {
            self.run_parallel(brief, targets, workers).await
        };

        // Join step: the only place the phase ledger is written
        let mut ledger = parent.fork();
        let mut entries = Vec::with_capacity(targets.len());
        for (segment, (output, elapsed)) in targets.iter().zip(outputs) {
            entries.push(entry_for(segment, &output, elapsed));
            ledger.merge(output.ledger);
        }

        let wall_seconds = start.elapsed().as_secs_f64();
        let worker_seconds: f64 = entries.iter().map(|e| e.duration_seconds).sum();
        let speedup = if wall_seconds > 0.0 {
            worker_seconds / wall_seconds
        } else {
            1.0
        };

        let phase = SizingPhase {
            entries,
            ledger,
            wall_seconds,
            worker_seconds,
            speedup,
        };
        info!(
            completed = phase.completed(),
            total = phase.entries.len(),
            credits = phase.ledger.total_credits(),
            wall_secs = wall_seconds,
            speedup,
            "Market sizing finished"
        );
        phase
    }

    async fn run_parallel(
        &self,
        brief: &ResearchBrief,
        targets: &[Segment],
        workers: usize,
    ) -> Vec<(StageOutput<MarketSizing>, Duration)> {
        let semaphore = Arc::new(Semaphore::new(workers));
        let brief = Arc::new(brief.clone());

        // Spawn in priority order; the semaphore admits them in that order
        let handles: Vec<_> = targets
            .iter()
            .map(|segment| {
                let sizer = Arc::clone(&self.sizer);
                let brief = Arc::clone(&brief);
                let segment = segment.clone();
                let semaphore = Arc::clone(&semaphore);
                tokio::spawn(async move {
                    let _permit = semaphore.acquire_owned().await;
                    size_one(sizer.as_ref(), &brief, &segment).await
                })
            })
            .collect();

        join_all(handles)
            .await
            .into_iter()
            .zip(targets)
            .map(|(joined, segment)| joined.unwrap_or_else(|e| crashed(segment, &e)))
            .collect()
    }

    async fn run_sequential(
        &self,
        brief: &ResearchBrief,
        targets: &[Segment],
    ) -> Vec<(StageOutput<MarketSizing>, Duration)> {
        let brief = Arc::new(brief.clone());
        let mut outputs = Vec::with_capacity(targets.len());

        for (i, segment) in targets.iter().enumerate() {
            if i > 0 && !self.config.request_delay.is_zero() {
                debug!(delay_ms = self.config.request_delay.as_millis() as u64, "Waiting before next segment");
                tokio::time::sleep(self.config.request_delay).await;
            }
            let sizer = Arc::clone(&self.sizer);
            let task_brief = Arc::clone(&brief);
            let task_segment = segment.clone();
            let joined = tokio::spawn(async move {
                size_one(sizer.as_ref(), &task_brief, &task_segment).await
            })
            .await;
            outputs.push(joined.unwrap_or_else(|e| crashed(segment, &e)));
        }
        outputs
    }
}

async fn size_one(
    sizer: &dyn MarketSizer,
    brief: &ResearchBrief,
    segment: &Segment,
) -> (StageOutput<MarketSizing>, Duration) {
    let start = Instant::now();
    info!(segment = %segment.name, priority = %segment.priority, "Sizing segment");
    let output = sizer.size(brief, segment).await;
    let elapsed = start.elapsed();
    match output.outcome.problem() {
        None => info!(
            segment = %segment.name,
            credits = output.ledger.total_credits(),
            duration_secs = elapsed.as_secs_f64(),
            "Segment sized"
        ),
        Some(problem) => warn!(segment = %segment.name, problem = %problem, "Segment sizing incomplete"),
    }
    (output, elapsed)
}

fn crashed(segment: &Segment, err: &tokio::task::JoinError) -> (StageOutput<MarketSizing>, Duration) {
    error!(segment = %segment.name, error = %err, "Sizing task crashed");
    (
        StageOutput::failed(
            format!("sizing task crashed: {}", err),
            UsageLedger::new(),
        ),
        Duration::ZERO,
    )
}

fn entry_for(segment: &Segment, output: &StageOutput<MarketSizing>, elapsed: Duration) -> SizingEntry {
    SizingEntry {
        segment: segment.name.clone(),
        priority: segment.priority,
        market_sizing: output.outcome.clone(),
        credits: output.ledger.total_credits(),
        tokens: output.ledger.total_tokens(),
        duration_seconds: elapsed.as_secs_f64(),
        stats: output.stats.clone(),
        tool_log: output.tool_log.clone(),
    }
}

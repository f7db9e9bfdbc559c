//! Stage output shared by both research backends

use crate::model::Outcome;
use marketscout_llm::UsageLedger;
use marketscout_tools::{ToolCallResult, ToolKind};
use serde::{Deserialize, Serialize};

/// Counters for one research stage run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStats {
    /// LLM turns taken
    pub turns: usize,
    /// Well-formed tool calls issued
    pub tool_calls: usize,
    /// Search calls, including loop-guarded ones
    pub search_count: usize,
    /// Scrape calls
    pub scrape_count: usize,
    /// Searches short-circuited by the loop guard
    pub loop_hits: usize,
    /// Credits charged
    pub credits: u64,
    /// Prompt tokens consumed
    pub input_tokens: u64,
    /// Completion tokens consumed
    pub output_tokens: u64,
    /// Wall time of the stage
    pub duration_seconds: f64,
    /// Whether the soft tool budget was overrun
    pub budget_exceeded: bool,
}

/// One tool observation, as logged for the run record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolLogEntry {
    /// Reasoning turn that issued the call
    pub turn: usize,
    /// Tool used
    pub tool: ToolKind,
    /// Query or URL
    pub target: String,
    /// Hits returned (1 for a scraped page)
    pub result_count: usize,
    /// Credits charged
    pub credits_used: u64,
    /// Call duration
    pub duration_seconds: f64,
    /// Explanatory note for empty results
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl ToolLogEntry {
    /// Log entry for a tool result
    #[must_use]
    pub fn new(turn: usize, result: &ToolCallResult) -> Self {
        Self {
            turn,
            tool: result.tool,
            target: result.target.clone(),
            result_count: result.result_count,
            credits_used: result.credits_used,
            duration_seconds: result.duration_seconds,
            note: result.note.clone(),
        }
    }
}

/// Everything a research stage hands back to its caller.
///
/// The ledger is returned even when the outcome is a failure so that spent
/// credits stay visible in the run record.
#[derive(Debug, Clone)]
pub struct StageOutput<T> {
    /// Parsed, unparsed or failed result
    pub outcome: Outcome<T>,
    /// Private ledger of this stage
    pub ledger: UsageLedger,
    /// Run counters
    pub stats: RunStats,
    /// Tool observations in call order
    pub tool_log: Vec<ToolLogEntry>,
}

impl<T> StageOutput<T> {
    /// A stage that failed before doing any work
    #[must_use]
    pub fn failed(error: impl Into<String>, ledger: UsageLedger) -> Self {
        Self {
            outcome: Outcome::Failed {
                error: error.into(),
            },
            ledger,
            stats: RunStats::default(),
            tool_log: Vec::new(),
        }
    }
}

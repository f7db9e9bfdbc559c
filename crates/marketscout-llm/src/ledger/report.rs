//! Ledger Reporting
//!
//! Serializable summary persisted with every run, and its text rendering.

use super::record::UsageRecord;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

/// Totals derived from a ledger, plus the records they were derived from
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LedgerSummary {
    /// Total credits charged
    pub total_credits: u64,
    /// Total input tokens
    pub total_input_tokens: u64,
    /// Total output tokens
    pub total_output_tokens: u64,
    /// Input plus output tokens
    pub total_tokens: u64,
    /// Credits times price per credit
    pub estimated_cost_usd: f64,
    /// USD per credit used for the estimate
    pub cost_per_credit: f64,
    /// Sum of recorded durations
    pub total_time_seconds: f64,
    /// Every record, in append order
    pub operations: Vec<UsageRecord>,
}

/// Number of operations listed in the text rendering
const MAX_LISTED_OPERATIONS: usize = 15;

/// Format a summary as text
#[must_use]
pub fn format_summary(summary: &LedgerSummary) -> String {
    let mut output = String::new();

    output.push_str("Usage Summary\n");
    let _ = writeln!(
        output,
        "  Credits:  {} (${:.2} at ${:.2}/credit)",
        summary.total_credits, summary.estimated_cost_usd, summary.cost_per_credit
    );
    let _ = writeln!(
        output,
        "  Tokens:   {} ({} input, {} output)",
        summary.total_tokens, summary.total_input_tokens, summary.total_output_tokens
    );
    let _ = writeln!(output, "  Time:     {:.1}s", summary.total_time_seconds);
    let _ = writeln!(output, "  Records:  {}", summary.operations.len());

    let charged: Vec<_> = summary
        .operations
        .iter()
        .filter(|r| r.credits > 0)
        .take(MAX_LISTED_OPERATIONS)
        .collect();
    if !charged.is_empty() {
        output.push_str("\nCharged operations:\n");
        for record in charged {
            let _ = writeln!(
                output,
                "  • {} - {} credits, {:.1}s",
                record.operation, record.credits, record.duration_seconds
            );
        }
    }

    output
}

//! Plain-text run summary, rendered by the coordinating task

use crate::model::{Outcome, Priority};
use crate::pipeline::{PipelineResult, RunStatus};
use marketscout_llm::format_summary;
use std::fmt::Write as _;

/// Render a run summary for the terminal
#[must_use]
pub fn format_run_summary(result: &PipelineResult) -> String {
    let mut out = String::new();
    let meta = &result.metadata;

    let status = match result.status {
        RunStatus::Completed => "completed",
        RunStatus::Failed => "FAILED",
    };
    let _ = writeln!(out, "Run {} ({}, {})", meta.run_id, status, meta.mode);
    let _ = writeln!(out, "  Location: {}", meta.location);
    let _ = writeln!(
        out,
        "  Duration: {:.1}s (generation {:.1}s, sizing {:.1}s, speedup {:.2}x)",
        result.timing.total_seconds,
        result.timing.generation_seconds,
        result.timing.sizing_seconds,
        result.timing.parallel_speedup
    );
    if let Some(error) = &result.error {
        let _ = writeln!(out, "  Error: {}", error);
    }

    if !result.segments.is_empty() {
        let _ = writeln!(out, "\nSegments ({}):", result.segments.len());
        let mut segments: Vec<_> = result.segments.iter().collect();
        segments.sort_by_key(|s| s.priority);
        for segment in segments {
            let marker = match segment.priority {
                Priority::Primary => "*",
                Priority::Secondary => "+",
                Priority::Alternative => "-",
            };
            let _ = writeln!(out, "  {} [{}] {}", marker, segment.priority, segment.name);
        }
    }

    if !result.sizing_results.is_empty() {
        let _ = writeln!(
            out,
            "\nMarket sizing ({}/{} complete):",
            result.sized_count(),
            result.sizing_results.len()
        );
        for entry in &result.sizing_results {
            match &entry.market_sizing {
                Outcome::Parsed { data } => {
                    let recommended = data
                        .pricing
                        .recommended()
                        .map(|s| format!("{} at ${:.0}/yr", s.tier, s.annual_price))
                        .unwrap_or_else(|| data.pricing.recommended_scenario.to_string());
                    let _ = writeln!(
                        out,
                        "  {}: {} struggle-aware, {} ({} credits, {:.1}s)",
                        entry.segment,
                        group_thousands(data.population.struggle_aware_count),
                        recommended,
                        entry.credits,
                        entry.duration_seconds
                    );
                }
                other => {
                    let _ = writeln!(
                        out,
                        "  {}: {} ({} credits)",
                        entry.segment,
                        other.problem().unwrap_or_default(),
                        entry.credits
                    );
                }
            }
        }
    }

    if !result.warnings.is_empty() {
        out.push_str("\nWarnings:\n");
        for warning in &result.warnings {
            let _ = writeln!(out, "  ! {}", warning);
        }
    }

    out.push('\n');
    out.push_str(&format_summary(&result.usage));
    out
}

/// `2700000` -> `2,700,000`
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_group_thousands() {
        assert_eq!(group_thousands(0), "0");
        assert_eq!(group_thousands(999), "999");
        assert_eq!(group_thousands(2_700_000), "2,700,000");
    }
}

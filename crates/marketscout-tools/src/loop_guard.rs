//! Repeated-query detection
//!
//! Agents sometimes get stuck re-issuing the same search. The guard keeps a
//! short FIFO window of recent queries; once a query shows up `threshold`
//! times inside the window it is answered with a free synthetic result
//! instead of reaching the provider.
//!
//! One guard belongs to one agent run. It is never shared between runs.

use std::collections::VecDeque;
use tracing::warn;

/// Number of recent queries remembered
pub const DEFAULT_WINDOW: usize = 10;

/// Occurrences within the window that count as a loop
pub const DEFAULT_THRESHOLD: usize = 3;

/// Outcome of checking a query
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardVerdict {
    /// Forward the query to the provider
    Proceed {
        /// Occurrences in the window including this one
        occurrences: usize,
    },
    /// Short-circuit the query
    Loop {
        /// Occurrences in the window including this one
        occurrences: usize,
    },
}

impl GuardVerdict {
    /// True when the query must not reach the provider
    #[must_use]
    pub fn is_loop(&self) -> bool {
        matches!(self, Self::Loop { .. })
    }
}

/// Sliding-window loop detector
#[derive(Debug, Clone)]
pub struct LoopGuard {
    window: VecDeque<String>,
    capacity: usize,
    threshold: usize,
    hits: usize,
}

impl Default for LoopGuard {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW, DEFAULT_THRESHOLD)
    }
}

impl LoopGuard {
    /// Create a guard. A zero capacity or threshold is raised to 1.
    #[must_use]
    pub fn new(capacity: usize, threshold: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            window: VecDeque::with_capacity(capacity),
            capacity,
            threshold: threshold.max(1),
            hits: 0,
        }
    }

    /// Record `query` and decide whether it is looping.
    ///
    /// The query enters the window before counting, so short-circuited
    /// repeats keep the loop alive until different queries push them out.
    /// Matching is exact: no trimming or case folding.
    pub fn check(&mut self, query: &str) -> GuardVerdict {
        self.window.push_back(query.to_string());
        while self.window.len() > self.capacity {
            self.window.pop_front();
        }

        let occurrences = self.window.iter().filter(|q| q.as_str() == query).count();
        if occurrences >= self.threshold {
            self.hits += 1;
            warn!(query = %query, occurrences, "Repeated search query short-circuited");
            GuardVerdict::Loop { occurrences }
        } else {
            GuardVerdict::Proceed { occurrences }
        }
    }

    /// Number of queries short-circuited so far
    #[must_use]
    pub fn loop_hits(&self) -> usize {
        self.hits
    }

    /// Queries currently in the window, oldest first
    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.window.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_third_repeat_is_a_loop() {
        let mut guard = LoopGuard::default();
        assert_eq!(guard.check("X"), GuardVerdict::Proceed { occurrences: 1 });
        assert_eq!(guard.check("X"), GuardVerdict::Proceed { occurrences: 2 });
        assert_eq!(guard.check("X"), GuardVerdict::Loop { occurrences: 3 });
        assert_eq!(guard.check("X"), GuardVerdict::Loop { occurrences: 4 });
        assert_eq!(guard.loop_hits(), 2);
    }

    #[test]
    fn test_exact_match_only() {
        let mut guard = LoopGuard::default();
        guard.check("dentists texas");
        guard.check("Dentists Texas");
        guard.check("dentists texas ");
        assert!(!guard.check("dentists texas").is_loop());
    }

    #[test]
    fn test_window_forgets_old_queries() {
        let mut guard = LoopGuard::new(4, 3);
        guard.check("X");
        guard.check("X");
        for q in ["a", "b", "c"] {
            guard.check(q);
        }
        // window is now [X, a, b, c] after one X was evicted
        assert!(!guard.check("X").is_loop());
        assert_eq!(guard.recent().count(), 4);
    }

    #[test]
    fn test_interleaved_queries_still_detected() {
        let mut guard = LoopGuard::default();
        guard.check("X");
        guard.check("Y");
        guard.check("X");
        guard.check("Z");
        assert!(guard.check("X").is_loop());
        assert!(!guard.check("Y").is_loop());
    }

    #[test]
    fn test_degenerate_settings_are_clamped() {
        let mut guard = LoopGuard::new(0, 0);
        assert!(guard.check("q").is_loop());
        assert_eq!(guard.recent().count(), 1);
    }
}

//! Usage Ledger
//!
//! Append-only record list with derived totals.

use super::record::UsageRecord;
use super::report::LedgerSummary;
use std::time::Duration;

/// USD charged per provider credit unless configured otherwise
pub const DEFAULT_COST_PER_CREDIT: f64 = 0.03;

/// Append-only usage ledger
#[derive(Debug, Clone)]
pub struct UsageLedger {
    records: Vec<UsageRecord>,
    cost_per_credit: f64,
}

impl Default for UsageLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl UsageLedger {
    /// Create an empty ledger with the default credit price
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
            cost_per_credit: DEFAULT_COST_PER_CREDIT,
        }
    }

    /// Override the USD price of one credit
    #[must_use]
    pub fn with_cost_per_credit(mut self, cost_per_credit: f64) -> Self {
        self.cost_per_credit = cost_per_credit.max(0.0);
        self
    }

    /// An empty ledger priced like this one, for handing to a worker
    #[must_use]
    pub fn fork(&self) -> Self {
        Self {
            records: Vec::new(),
            cost_per_credit: self.cost_per_credit,
        }
    }

    /// Append a record for a plain credit-charged operation
    pub fn record(&mut self, operation: impl Into<String>, credits: u64, duration: Duration) {
        self.push(UsageRecord::new(operation, credits, duration));
    }

    /// Append a fully built record
    pub fn push(&mut self, record: UsageRecord) {
        self.records.push(record);
    }

    /// Absorb another ledger's records, preserving their order
    pub fn merge(&mut self, other: UsageLedger) {
        self.records.extend(other.records);
    }

    /// Records in append order
    #[must_use]
    pub fn records(&self) -> &[UsageRecord] {
        &self.records
    }

    /// Number of records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been recorded
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// USD price of one credit
    #[must_use]
    pub fn cost_per_credit(&self) -> f64 {
        self.cost_per_credit
    }

    /// Sum of credits over all records
    #[must_use]
    pub fn total_credits(&self) -> u64 {
        self.records.iter().map(|r| r.credits).sum()
    }

    /// Sum of input tokens
    #[must_use]
    pub fn total_input_tokens(&self) -> u64 {
        self.records.iter().map(|r| r.input_tokens).sum()
    }

    /// Sum of output tokens
    #[must_use]
    pub fn total_output_tokens(&self) -> u64 {
        self.records.iter().map(|r| r.output_tokens).sum()
    }

    /// Input plus output tokens
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.total_input_tokens() + self.total_output_tokens()
    }

    /// Sum of recorded durations in seconds
    #[must_use]
    pub fn total_duration_seconds(&self) -> f64 {
        self.records.iter().map(|r| r.duration_seconds).sum()
    }

    /// Credits converted to USD
    #[must_use]
    pub fn estimated_cost(&self) -> f64 {
        self.total_credits() as f64 * self.cost_per_credit
    }

    /// Snapshot of totals plus the ordered records
    #[must_use]
    pub fn summary(&self) -> LedgerSummary {
        LedgerSummary {
            total_credits: self.total_credits(),
            total_input_tokens: self.total_input_tokens(),
            total_output_tokens: self.total_output_tokens(),
            total_tokens: self.total_tokens(),
            estimated_cost_usd: self.estimated_cost(),
            cost_per_credit: self.cost_per_credit,
            total_time_seconds: self.total_duration_seconds(),
            operations: self.records.clone(),
        }
    }
}

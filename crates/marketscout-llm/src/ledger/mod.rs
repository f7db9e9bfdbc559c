//! Usage Ledger - credit, token and timing accounting
//!
//! Every billable step of a research run (LLM turns, web searches, page
//! scrapes, extraction calls) appends a [`UsageRecord`] to a ledger.
//!
//! Ledgers are plain owned values, not shared handles. Each concurrent
//! worker owns a private ledger and hands it back when it finishes; the
//! coordinator folds it into the run ledger with [`UsageLedger::merge`].
//!
//! # Module Structure
//!
//! - `record`: Single usage record
//! - `usage`: UsageLedger implementation
//! - `report`: Serializable summary and text rendering

mod record;
mod report;
mod usage;


pub use record::UsageRecord;
pub use report::{format_summary, LedgerSummary};
pub use usage::{UsageLedger, DEFAULT_COST_PER_CREDIT};

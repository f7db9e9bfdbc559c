//! Usage Records
//!
//! This module contains the record type appended to a ledger.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// A single usage record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Operation name (e.g. `search:<query>`, `llm_turn`)
    pub operation: String,
    /// Credits charged by the service
    pub credits: u64,
    /// Input (prompt) tokens
    #[serde(default)]
    pub input_tokens: u64,
    /// Output (completion) tokens
    #[serde(default)]
    pub output_tokens: u64,
    /// Elapsed time in seconds
    pub duration_seconds: f64,
    /// When the record was appended
    pub timestamp: DateTime<Utc>,
    /// Free-form context (segment name, url, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
}

impl UsageRecord {
    /// Create a record stamped with the current time
    #[must_use]
    pub fn new(operation: impl Into<String>, credits: u64, duration: Duration) -> Self {
        Self {
            operation: operation.into(),
            credits,
            input_tokens: 0,
            output_tokens: 0,
            duration_seconds: duration.as_secs_f64(),
            timestamp: Utc::now(),
            metadata: None,
        }
    }

    /// Attach token counts
    #[must_use]
    pub fn with_tokens(mut self, input_tokens: u64, output_tokens: u64) -> Self {
        self.input_tokens = input_tokens;
        self.output_tokens = output_tokens;
        self
    }

    /// Attach metadata
    #[must_use]
    pub fn with_metadata(mut self, metadata: serde_json::Value) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Input plus output tokens
    #[must_use]
    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens
    }
}

//! Structured extraction service abstraction
//!
//! An extraction service takes a prompt plus a JSON schema and returns a
//! JSON document conforming (ideally) to that schema, along with the
//! credits the call consumed. The research pipeline uses it as the
//! single-call alternative to the tool-calling agent.

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// Output of one extraction call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    /// Structured payload returned by the service
    pub data: serde_json::Value,
    /// Credits charged for the call
    pub credits_used: u64,
}

/// Trait for schema-driven extraction services
#[async_trait::async_trait]
pub trait StructuredExtractor: Send + Sync {
    /// Service name, used in ledger records
    fn name(&self) -> &str;

    /// Run one extraction
    async fn extract(&self, prompt: &str, schema: &serde_json::Value) -> Result<Extraction>;
}

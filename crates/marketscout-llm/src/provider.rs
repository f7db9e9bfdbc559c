//! LLM Provider trait definition
//!
//! This module defines the core trait that all LLM providers must implement.

use crate::completion::{ToolCompletionRequest, ToolCompletionResponse};
use crate::error::Result;

/// Trait for tool-calling LLM providers
#[async_trait::async_trait]
pub trait LlmProvider: Send + Sync {
    /// Get the provider name
    fn name(&self) -> &str;

    /// Get the default model
    fn default_model(&self) -> &str;

    /// Run one conversation turn with tools available
    async fn complete_with_tools(
        &self,
        request: ToolCompletionRequest,
    ) -> Result<ToolCompletionResponse>;
}

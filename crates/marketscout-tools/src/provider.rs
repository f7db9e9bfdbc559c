//! Web provider trait
//!
//! Providers return the raw JSON body of their responses. Shape
//! normalization happens in [`crate::adapter::ToolAdapter`] and nowhere else.

use crate::error::Result;

/// Trait for web search / scrape backends
#[async_trait::async_trait]
pub trait WebProvider: Send + Sync {
    /// Provider name
    fn name(&self) -> &str;

    /// Search the web, returning the provider's raw response body
    async fn search(&self, query: &str, limit: usize) -> Result<serde_json::Value>;

    /// Fetch one page as markdown, returning the provider's raw response body
    async fn scrape(&self, url: &str) -> Result<serde_json::Value>;
}

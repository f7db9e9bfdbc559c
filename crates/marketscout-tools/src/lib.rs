//! Marketscout Tools - web research tooling
//!
//! This crate provides the tools research agents call:
//! - Provider: raw web search/scrape backend trait
//! - Firecrawl: HTTP client for search, scrape and agent extraction
//! - Adapter: non-failing wrapper that normalizes provider output
//! - LoopGuard: repeated-query short-circuit
//! - Mock: in-memory provider for tests and dry runs

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod adapter;
pub mod envelope;
pub mod error;
pub mod firecrawl;
pub mod loop_guard;
pub mod mock;
pub mod provider;

pub use adapter::{
    tool_definitions, AdapterConfig, ToolAdapter, ToolRequest, SCRAPE_TOOL, SEARCH_TOOL,
    TRUNCATION_MARKER,
};
pub use envelope::{SearchHit, ToolCallResult, ToolKind, ToolPayload};
pub use error::{Error, Result};
pub use firecrawl::{FirecrawlClient, FirecrawlConfig};
pub use loop_guard::{GuardVerdict, LoopGuard};
pub use mock::MockWebProvider;
pub use provider::WebProvider;

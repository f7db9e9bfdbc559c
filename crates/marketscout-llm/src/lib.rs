//! Marketscout LLM - model access and usage accounting
//!
//! This crate provides the model-facing layer of Marketscout:
//! - Provider: tool-calling provider trait
//! - OpenRouter: OpenAI-compatible chat gateway
//! - Mock: scripted provider for tests and dry runs
//! - Extract: schema-driven extraction service trait
//! - Ledger: credit/token/timing records with fork/merge

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod completion;
pub mod error;
pub mod extract;
pub mod ledger;
pub mod message;
pub mod mock;
pub mod openrouter;
pub mod provider;
pub mod tools;

pub use completion::{TokenUsage, ToolCompletionRequest, ToolCompletionResponse};
pub use error::{Error, Result};
pub use extract::{Extraction, StructuredExtractor};
pub use ledger::{format_summary, LedgerSummary, UsageLedger, UsageRecord, DEFAULT_COST_PER_CREDIT};
pub use message::{Message, MessageRole};
pub use mock::MockProvider;
pub use openrouter::{mask_api_key, OpenRouterConfig, OpenRouterProvider};
pub use provider::LlmProvider;
pub use tools::{ToolCall, ToolChoice, ToolDefinition};

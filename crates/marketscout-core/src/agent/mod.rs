//! Agent runner - tool-augmented reasoning loop
//!
//! Drives one LLM conversation with web search and scrape tools until the
//! model produces a final answer or the turn ceiling is reached.
//!
//! # Module Structure
//!
//! - `config`: turn ceiling, tool budget and guard settings
//! - `runner`: the reasoning loop and tool dispatch
//! - `parse`: final-answer extraction and validation

mod config;
mod parse;
mod runner;


pub use config::{AgentConfig, DEFAULT_MAX_TURNS, GENERATION_TOOL_BUDGET, SIZING_TOOL_BUDGET};
pub use parse::{extract_json, parse_final};
pub use runner::AgentRunner;

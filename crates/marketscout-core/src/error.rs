//! Error types for marketscout-core

use thiserror::Error;

/// Core error type
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid configuration
    #[error("invalid configuration: {field}: {message}")]
    InvalidConfig {
        /// Config field name
        field: String,
        /// Detailed message
        message: String,
    },

    /// Research brief could not be loaded
    #[error("invalid brief: {0}")]
    InvalidBrief(String),

    /// LLM provider error
    #[error("llm error: {0}")]
    Llm(#[from] marketscout_llm::Error),

    /// Tool error
    #[error("tool error: {0}")]
    Tool(#[from] marketscout_tools::Error),

    /// Result file could not be read or written
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

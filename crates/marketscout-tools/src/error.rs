//! Error types for marketscout-tools

use thiserror::Error;

/// Tool error type
#[derive(Debug, Error)]
pub enum Error {
    /// Provider not configured
    #[error("provider not configured: {0}")]
    NotConfigured(String),

    /// Invalid input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Permission denied
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Remote API returned an error status
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code
        status: u16,
        /// Error message from the body, if any
        message: String,
    },

    /// Response body did not have the expected shape
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// Timeout
    #[error("timeout after {0}ms")]
    Timeout(u64),

    /// Network error
    #[error("network error: {0}")]
    Network(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

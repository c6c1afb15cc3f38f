//! Error types for jsonl2csv
//!
//! Centralized error handling using thiserror.

use thiserror::Error;

/// All error types that can occur in jsonl2csv
#[derive(Debug, Error)]
pub enum ConvertError {
    /// Invalid or incomplete configuration at startup
    #[error("Config error: {0}")]
    Config(String),

    /// Credential acquisition failed
    #[error("Auth error: {0}")]
    Auth(String),

    /// Object storage upload or signing error
    #[error("Storage error: {0}")]
    Storage(String),

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parse error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Result type alias for jsonl2csv operations
pub type Result<T> = std::result::Result<T, ConvertError>;

//! Error types for Garmin Analyze

use thiserror::Error;

/// Errors that can occur while classifying sleep or rolling up statistics
#[derive(Debug, Error)]
pub enum AnalyzeError {
    #[error("Missing required attribute: {0}")]
    MissingAttribute(String),

    #[error("Invalid value {value:?} for attribute {name}")]
    InvalidAttribute { name: String, value: String },

    #[error("Invalid time of day: {0}")]
    InvalidTime(String),

    #[error("Invalid date: {0}")]
    InvalidDate(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

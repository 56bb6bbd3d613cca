//! Error types for MedSynapse Insight

use thiserror::Error;

/// Errors that can occur during analysis
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Rendered verbatim so callers see e.g. "No timestamp column found"
    #[error("{0}")]
    MissingField(String),

    #[error("Timestamp parse error: {0}")]
    TimestampParse(String),

    #[error("Degenerate input: {0}")]
    DegenerateInput(String),

    #[error("Invalid configuration: {0}")]
    Config(String),
}

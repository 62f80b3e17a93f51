//! Error types for the typing load pipeline.

use thiserror::Error;

/// Errors that can occur while producing, classifying or storing features.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Input was rejected before any computation happened.
    #[error("Invalid input: {0}")]
    Input(String),

    /// Persisted session or summary data is malformed.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The classifier could not produce a decision.
    #[error("Classifier failed: {0}")]
    Capability(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, PipelineError>;

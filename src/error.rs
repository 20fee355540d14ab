//! Error taxonomy for the analysis engine
//!
//! Only hard precondition violations and cancellation surface as errors.
//! Per-candidate evaluation failures become `ExcludedCandidate` records in
//! the report, and non-convergence is a `degraded` flag on the affected
//! candidate's score. Neither ever aborts a batch.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed context or empty candidate set; nothing was computed.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The caller cancelled the in-flight analysis.
    #[error("analysis cancelled")]
    Cancelled,

    /// Rejected configuration values.
    #[error("invalid configuration: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;

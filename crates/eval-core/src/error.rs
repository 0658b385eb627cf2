//! Error types for eval-core

use thiserror::Error;

/// Result type alias for eval-core
pub type Result<T> = std::result::Result<T, Error>;

/// Request-level errors
///
/// Agent failures never show up here: they are recovered by the dispatcher and
/// reported as [`crate::FailureReason`] values. Only broken invariants, bad
/// input at intake and configuration problems surface as errors.
#[derive(Error, Debug)]
pub enum Error {
    /// A canonical record violated its own invariants
    #[error("Structural error: {0}")]
    Structural(String),

    /// The query context cannot describe anything to evaluate
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// Configuration failed validation or could not be loaded
    #[error("Configuration error: {0}")]
    Config(String),

    /// A background task could not be joined
    #[error("Internal error: {0}")]
    Internal(String),
}

//! Error types for the sweep engine

use thiserror::Error;
use uuid::Uuid;

/// Result type alias for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors surfaced to callers of the engine's boundary operations.
///
/// Launch failures and abnormal scanner exits are not here: they are
/// job-state transitions (the record moves to `error` with a detail
/// string). History persistence failures are logged and swallowed.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Start parameters were missing or malformed
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No job with this id exists
    #[error("scan {0} not found")]
    NotFound(Uuid),

    /// Stop was requested for a job that has no live process
    #[error("scan {0} is not running")]
    NotRunning(Uuid),
}

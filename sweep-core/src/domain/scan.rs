//! Scan domain types

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Execution status of a scan job.
///
/// Transitions are monotonic: `Pending -> Running -> {Completed, Error,
/// Stopped}`. The three terminal states never change once reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Pending,
    Running,
    Completed,
    Error,
    Stopped,
}

impl ScanStatus {
    /// Whether this status is terminal (no further transitions allowed).
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Error | Self::Stopped)
    }
}

/// Durable metadata for one scan job.
///
/// This is exactly the shape persisted to the history snapshot: no
/// process handle, no log buffer, no report body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanRecord {
    pub id: Uuid,
    pub target: String,
    pub extensions: String,
    pub status: ScanStatus,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

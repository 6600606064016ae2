//! DTOs for the engine's boundary operations

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::scan::{ScanRecord, ScanStatus};

fn default_extensions() -> String {
    "php,html,js".to_string()
}

/// Request to start a new scan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartScanRequest {
    pub target: String,
    #[serde(default = "default_extensions")]
    pub extensions: String,
}

/// Response to a successful start request
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartScanResponse {
    pub scan_id: Uuid,
}

/// Full status view of one scan.
///
/// `results` is populated lazily from the on-disk report and only when
/// the scan completed; historical jobs never hold their report in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanStatusResponse {
    pub id: Uuid,
    pub status: ScanStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub results: Option<serde_json::Value>,
    pub error: Option<String>,
}

/// One row of the scan history listing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub id: Uuid,
    pub target: String,
    pub status: ScanStatus,
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub error: Option<String>,
}

impl From<&ScanRecord> for HistoryEntry {
    fn from(record: &ScanRecord) -> Self {
        Self {
            id: record.id,
            target: record.target.clone(),
            status: record.status,
            timestamp: record.created_at,
            error: record.error.clone(),
        }
    }
}

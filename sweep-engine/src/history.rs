//! History snapshot persistence
//!
//! Serializes the metadata of every job to a single JSON file and
//! restores it at startup. Persistence is best-effort and advisory: a
//! failed write is logged and never aborts the operation that
//! triggered it, and a missing or malformed file loads as empty.

use std::collections::BTreeMap;
use std::path::PathBuf;

use sweep_core::domain::scan::ScanRecord;
use tracing::warn;
use uuid::Uuid;

/// Durable store for job metadata snapshots.
pub struct HistoryStore {
    path: PathBuf,
}

impl HistoryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Rewrite the snapshot file in full.
    ///
    /// Failures are logged, not returned; losing a snapshot must never
    /// fail the scan operation that requested it.
    pub async fn save(&self, snapshot: &BTreeMap<Uuid, ScanRecord>) {
        let json = match serde_json::to_string_pretty(snapshot) {
            Ok(json) => json,
            Err(e) => {
                warn!("Failed to serialize scan history: {e}");
                return;
            }
        };

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
            && let Err(e) = tokio::fs::create_dir_all(parent).await
        {
            warn!("Failed to create history directory: {e}");
            return;
        }

        if let Err(e) = tokio::fs::write(&self.path, json).await {
            warn!("Failed to write scan history to {}: {e}", self.path.display());
        }
    }

    /// Load the snapshot written by a previous run.
    ///
    /// Missing or unreadable storage yields an empty map.
    pub async fn load(&self) -> BTreeMap<Uuid, ScanRecord> {
        let contents = match tokio::fs::read_to_string(&self.path).await {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return BTreeMap::new(),
            Err(e) => {
                warn!("Failed to read scan history from {}: {e}", self.path.display());
                return BTreeMap::new();
            }
        };

        match serde_json::from_str(&contents) {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Malformed scan history in {}: {e}", self.path.display());
                BTreeMap::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use sweep_core::domain::scan::ScanStatus;
    use tempfile::TempDir;

    fn record(status: ScanStatus) -> ScanRecord {
        ScanRecord {
            id: Uuid::new_v4(),
            target: "example.com".into(),
            extensions: "php,html".into(),
            status,
            created_at: Utc::now(),
            error: None,
        }
    }

    #[tokio::test]
    async fn save_then_load_roundtrips() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("history.json"));

        let mut snapshot = BTreeMap::new();
        let completed = record(ScanStatus::Completed);
        let errored = ScanRecord {
            error: Some("process failed".into()),
            ..record(ScanStatus::Error)
        };
        snapshot.insert(completed.id, completed.clone());
        snapshot.insert(errored.id, errored.clone());

        store.save(&snapshot).await;
        let loaded = store.load().await;

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[&completed.id].status, ScanStatus::Completed);
        assert_eq!(
            loaded[&errored.id].error.as_deref(),
            Some("process failed")
        );
    }

    #[tokio::test]
    async fn missing_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("does-not-exist.json"));
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn malformed_file_loads_empty() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("history.json");
        tokio::fs::write(&path, "{ not json").await.unwrap();

        let store = HistoryStore::new(path);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = HistoryStore::new(dir.path().join("state/history.json"));

        let mut snapshot = BTreeMap::new();
        let rec = record(ScanStatus::Stopped);
        snapshot.insert(rec.id, rec);
        store.save(&snapshot).await;

        assert_eq!(store.load().await.len(), 1);
    }

    #[tokio::test]
    async fn save_failure_is_swallowed() {
        // Point the history at a path whose parent is a regular file.
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        tokio::fs::write(&blocker, "x").await.unwrap();

        let store = HistoryStore::new(blocker.join("history.json"));
        store.save(&BTreeMap::new()).await;
        assert!(store.load().await.is_empty());
    }
}

//! Engine facade
//!
//! [`ScanEngine`] wires the store, the history persister, the process
//! supervisor, and the cancellation driver together and exposes the
//! boundary operations consumed by the HTTP layer: start, status,
//! history, stop, and the log stream.

use std::sync::Arc;

use sweep_core::domain::scan::ScanStatus;
use sweep_core::dto::{HistoryEntry, ScanStatusResponse};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::history::HistoryStore;
use crate::stop::stop_scan;
use crate::store::JobStore;
use crate::stream::LogSubscription;
use crate::supervisor::{Supervisor, persist};

/// The scan orchestration engine.
pub struct ScanEngine {
    config: EngineConfig,
    store: Arc<JobStore>,
    history: Arc<HistoryStore>,
    supervisor: Supervisor,
}

impl ScanEngine {
    /// Build an engine, restoring the persisted history snapshot.
    pub async fn new(config: EngineConfig) -> Self {
        let store = Arc::new(JobStore::new());
        let history = Arc::new(HistoryStore::new(config.history_path.clone()));

        let restored = history.load().await;
        if !restored.is_empty() {
            info!("Restored {} scan(s) from history", restored.len());
        }
        for (_, record) in restored {
            store.restore(record);
        }

        let supervisor = Supervisor::new(
            config.clone(),
            Arc::clone(&store),
            Arc::clone(&history),
        );

        Self {
            config,
            store,
            history,
            supervisor,
        }
    }

    /// Start a new scan and hand it off to the supervisor.
    ///
    /// Rejects an empty target before any record is created. The job is
    /// persisted as `pending` and transitions asynchronously from there.
    pub async fn start_scan(&self, target: &str, extensions: &str) -> Result<Uuid> {
        if target.trim().is_empty() {
            return Err(EngineError::InvalidArgument(
                "target is required".to_string(),
            ));
        }

        let job = self
            .store
            .create(target.trim().to_string(), extensions.to_string());
        info!("Created scan {} for {}", job.id, job.target);
        persist(&self.store, &self.history).await;

        self.supervisor.launch(Arc::clone(&job));
        Ok(job.id)
    }

    /// Current status of one scan.
    ///
    /// `results` is read from the on-disk report only for completed
    /// scans; an unreadable or malformed report degrades to `None`
    /// rather than an error.
    pub async fn status(&self, id: Uuid) -> Result<ScanStatusResponse> {
        let job = self.store.get(id).ok_or(EngineError::NotFound(id))?;

        let status = job.status();
        let results = if status == ScanStatus::Completed {
            self.load_results(id).await
        } else {
            None
        };

        Ok(ScanStatusResponse {
            id,
            status,
            timestamp: job.created_at,
            results,
            error: job.error(),
        })
    }

    async fn load_results(&self, id: Uuid) -> Option<serde_json::Value> {
        let path = self.config.report_path(id);
        let contents = match tokio::fs::read_to_string(&path).await {
            Ok(contents) => contents,
            Err(e) => {
                debug!("No readable report for scan {id}: {e}");
                return None;
            }
        };

        match serde_json::from_str::<serde_json::Value>(&contents) {
            Ok(report) => Some(
                report
                    .get("results")
                    .cloned()
                    .unwrap_or_else(|| serde_json::Value::Array(Vec::new())),
            ),
            Err(e) => {
                debug!("Malformed report for scan {id}: {e}");
                None
            }
        }
    }

    /// All known scans, newest first.
    pub fn history(&self) -> Vec<HistoryEntry> {
        self.store
            .list()
            .iter()
            .map(|entry| HistoryEntry::from(&entry.record()))
            .collect()
    }

    /// Run the cancellation protocol against a running scan.
    pub async fn stop_scan(&self, id: Uuid) -> Result<()> {
        let job = self.store.get(id).ok_or(EngineError::NotFound(id))?;
        stop_scan(&self.config.stop, &self.store, &self.history, &job).await
    }

    /// Subscribe to a scan's log stream from the beginning.
    ///
    /// An unknown id yields a subscription that ends immediately.
    pub fn subscribe(&self, id: Uuid) -> LogSubscription {
        LogSubscription::new(self.store.get(id), self.config.stream_poll_interval)
    }
}

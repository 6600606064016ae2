//! In-memory job registry
//!
//! The [`JobStore`] is the single source of truth shared by the
//! supervisor, the cancellation driver, and log subscribers. The store
//! itself is only a map of `Arc<JobEntry>`; all mutable per-job state
//! lives inside the entry behind its own locks, so the map lock is held
//! just long enough to insert or look up an entry.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, RwLock};

use chrono::{DateTime, Utc};
use sweep_core::domain::scan::{ScanRecord, ScanStatus};
use tokio::process::Child;
use tokio::sync::Notify;
use uuid::Uuid;

/// Live lifecycle of one job.
///
/// The process handle can only exist inside `Running`. Whichever
/// component takes the child for reaping (the supervisor at stream end,
/// or the stop driver) swaps the state to `Exiting` under the lock, so
/// the completed-vs-stopped race is decided by a single atomic move:
/// whoever gets the child decides the terminal status.
pub(crate) enum Lifecycle {
    Pending,
    Running { child: Child },
    Exiting,
    Terminal {
        status: ScanStatus,
        error: Option<String>,
    },
}

/// One job record: immutable parameters plus guarded mutable state.
pub struct JobEntry {
    pub id: Uuid,
    pub target: String,
    pub extensions: String,
    pub created_at: DateTime<Utc>,
    state: Mutex<Lifecycle>,
    logs: RwLock<Vec<String>>,
    notify: Notify,
}

impl JobEntry {
    fn new(target: String, extensions: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            target,
            extensions,
            created_at: Utc::now(),
            state: Mutex::new(Lifecycle::Pending),
            logs: RwLock::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    fn restored(record: ScanRecord) -> Self {
        // A restored record has no live process and no log buffer. A
        // non-terminal status cannot be resumed after a restart, and a
        // terminal status must never go backwards, so stale
        // pending/running rows are demoted to error here.
        let (status, error) = if record.status.is_terminal() {
            (record.status, record.error)
        } else {
            (
                ScanStatus::Error,
                Some("interrupted by restart".to_string()),
            )
        };

        Self {
            id: record.id,
            target: record.target,
            extensions: record.extensions,
            created_at: record.created_at,
            state: Mutex::new(Lifecycle::Terminal { status, error }),
            logs: RwLock::new(Vec::new()),
            notify: Notify::new(),
        }
    }

    /// Current status derived from the lifecycle.
    ///
    /// `Exiting` still reports `Running`: the terminal status appears
    /// only once the owner of the child finishes reaping it.
    pub fn status(&self) -> ScanStatus {
        match &*self.state.lock().unwrap() {
            Lifecycle::Pending => ScanStatus::Pending,
            Lifecycle::Running { .. } | Lifecycle::Exiting => ScanStatus::Running,
            Lifecycle::Terminal { status, .. } => *status,
        }
    }

    /// Diagnostic detail, present only in the `error` terminal state.
    pub fn error(&self) -> Option<String> {
        match &*self.state.lock().unwrap() {
            Lifecycle::Terminal { error, .. } => error.clone(),
            _ => None,
        }
    }

    /// Metadata snapshot of this entry (never includes the handle, the
    /// log buffer, or the report body).
    pub fn record(&self) -> ScanRecord {
        let (status, error) = match &*self.state.lock().unwrap() {
            Lifecycle::Pending => (ScanStatus::Pending, None),
            Lifecycle::Running { .. } | Lifecycle::Exiting => (ScanStatus::Running, None),
            Lifecycle::Terminal { status, error } => (*status, error.clone()),
        };

        ScanRecord {
            id: self.id,
            target: self.target.clone(),
            extensions: self.extensions.clone(),
            status,
            created_at: self.created_at,
            error,
        }
    }

    /// Store the spawned child and flip `Pending -> Running`.
    ///
    /// Returns the child back if the entry was not pending, in which
    /// case the caller must dispose of the process itself.
    pub(crate) fn set_running(&self, child: Child) -> std::result::Result<(), Child> {
        let mut state = self.state.lock().unwrap();
        match *state {
            Lifecycle::Pending => {
                *state = Lifecycle::Running { child };
                Ok(())
            }
            _ => Err(child),
        }
    }

    /// Take exclusive ownership of the live child, `Running -> Exiting`.
    ///
    /// Returns `None` if the job is not running, including when another
    /// component already took the child.
    pub(crate) fn take_child(&self) -> Option<Child> {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, Lifecycle::Running { .. }) {
            match std::mem::replace(&mut *state, Lifecycle::Exiting) {
                Lifecycle::Running { child } => Some(child),
                // unreachable: matched Running above while holding the lock
                other => {
                    *state = other;
                    None
                }
            }
        } else {
            None
        }
    }

    /// Move to a terminal state and wake subscribers.
    ///
    /// Returns false (and changes nothing) if the entry is already
    /// terminal; status transitions are monotonic.
    pub(crate) fn set_terminal(&self, status: ScanStatus, error: Option<String>) -> bool {
        debug_assert!(status.is_terminal());
        {
            let mut state = self.state.lock().unwrap();
            if matches!(*state, Lifecycle::Terminal { .. }) {
                return false;
            }
            *state = Lifecycle::Terminal { status, error };
        }
        self.notify.notify_waiters();
        true
    }

    /// Append one line to the log buffer and wake subscribers.
    pub(crate) fn append_line(&self, line: String) {
        self.logs.write().unwrap().push(line);
        self.notify.notify_waiters();
    }

    /// Current length of the log buffer.
    pub fn log_len(&self) -> usize {
        self.logs.read().unwrap().len()
    }

    /// The line at a subscriber's offset, if it exists yet.
    pub(crate) fn line_at(&self, offset: usize) -> Option<String> {
        self.logs.read().unwrap().get(offset).cloned()
    }

    pub(crate) fn notify(&self) -> &Notify {
        &self.notify
    }
}

/// Registry mapping job ids to their entries.
pub struct JobStore {
    jobs: RwLock<HashMap<Uuid, std::sync::Arc<JobEntry>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self {
            jobs: RwLock::new(HashMap::new()),
        }
    }

    /// Create a fresh pending job.
    pub fn create(&self, target: String, extensions: String) -> std::sync::Arc<JobEntry> {
        let entry = std::sync::Arc::new(JobEntry::new(target, extensions));
        self.jobs
            .write()
            .unwrap()
            .insert(entry.id, std::sync::Arc::clone(&entry));
        entry
    }

    pub fn get(&self, id: Uuid) -> Option<std::sync::Arc<JobEntry>> {
        self.jobs.read().unwrap().get(&id).cloned()
    }

    /// All entries, newest first.
    pub fn list(&self) -> Vec<std::sync::Arc<JobEntry>> {
        let mut entries: Vec<_> = self.jobs.read().unwrap().values().cloned().collect();
        entries.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        entries
    }

    /// Metadata-only snapshot of every job, for persistence.
    pub fn snapshot(&self) -> BTreeMap<Uuid, ScanRecord> {
        self.jobs
            .read()
            .unwrap()
            .values()
            .map(|entry| (entry.id, entry.record()))
            .collect()
    }

    /// Merge a persisted record at startup.
    pub fn restore(&self, record: ScanRecord) {
        let entry = std::sync::Arc::new(JobEntry::restored(record));
        self.jobs
            .write()
            .unwrap()
            .insert(entry.id, entry);
    }
}

impl Default for JobStore {
    fn default() -> Self {
        Self::new()
    }
}

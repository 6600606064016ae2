//! Process supervision
//!
//! One detached task per scan owns the external process from spawn to
//! reap: it pumps the merged stdout/stderr line stream into the job's
//! log buffer and computes the terminal status on exit. The stop driver
//! can take the child away mid-run; in that case the supervisor backs
//! off and lets the stop outcome stand.

use std::process::Stdio;
use std::sync::Arc;

use sweep_core::domain::scan::ScanStatus;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::history::HistoryStore;
use crate::store::{JobEntry, JobStore};

/// Launches and supervises scanner processes.
pub(crate) struct Supervisor {
    config: EngineConfig,
    store: Arc<JobStore>,
    history: Arc<HistoryStore>,
}

impl Supervisor {
    pub(crate) fn new(
        config: EngineConfig,
        store: Arc<JobStore>,
        history: Arc<HistoryStore>,
    ) -> Self {
        Self {
            config,
            store,
            history,
        }
    }

    /// Hand a pending job off to its own supervision task.
    pub(crate) fn launch(&self, job: Arc<JobEntry>) -> tokio::task::JoinHandle<()> {
        let config = self.config.clone();
        let store = Arc::clone(&self.store);
        let history = Arc::clone(&self.history);

        tokio::spawn(async move {
            run_scan(config, store, history, job).await;
        })
    }
}

/// Build the scanner invocation for one job.
///
/// stdin stays writable for the interactive quit protocol; stdout and
/// stderr are piped so the pump can merge them. `kill_on_drop` keeps a
/// panicking supervision task from leaking the OS process.
fn scan_command(config: &EngineConfig, job: &JobEntry) -> Command {
    let report_path = config.report_path(job.id);

    let mut cmd = Command::new(&config.scanner_program);
    cmd.args(&config.scanner_base_args)
        .arg("-u")
        .arg(&job.target)
        .arg("-e")
        .arg(&job.extensions)
        .args(["--output-formats", "json"])
        .arg("-o")
        .arg(&report_path)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    cmd
}

/// High-frequency progress-bar line from the scanner.
///
/// These are suppressed from the log buffer to keep it from flooding;
/// suppression never affects status or exit handling.
fn is_progress_line(line: &str) -> bool {
    line.contains("job:") && line.contains('%')
}

async fn run_scan(
    config: EngineConfig,
    store: Arc<JobStore>,
    history: Arc<HistoryStore>,
    job: Arc<JobEntry>,
) {
    info!("Starting scan {} against {}", job.id, job.target);

    if let Err(e) = tokio::fs::create_dir_all(&config.reports_dir).await {
        fail(&store, &history, &job, format!("failed to create reports dir: {e}")).await;
        return;
    }

    let mut child = match scan_command(&config, &job).spawn() {
        Ok(child) => child,
        Err(e) => {
            fail(&store, &history, &job, format!("failed to launch scanner: {e}")).await;
            return;
        }
    };

    let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
        let _ = child.kill().await;
        fail(&store, &history, &job, "scanner stdio was not captured".to_string()).await;
        return;
    };

    if let Err(mut rejected) = job.set_running(child) {
        // The entry went terminal before the handle could be stored;
        // nothing may own a process outside the running state.
        let _ = rejected.kill().await;
        return;
    }

    pump_lines(&job, stdout, stderr).await;

    // Stream ended: reap the child unless the stop driver already owns
    // it, in which case the stop outcome takes precedence.
    let Some(mut child) = job.take_child() else {
        debug!("Scan {} handed over to the stop driver", job.id);
        return;
    };

    let (status, error) = match child.wait().await {
        Ok(exit) => {
            let report_written = tokio::fs::try_exists(&config.report_path(job.id))
                .await
                .unwrap_or(false);
            if exit.success() || report_written {
                (ScanStatus::Completed, None)
            } else {
                (ScanStatus::Error, Some(format!("process failed ({exit})")))
            }
        }
        Err(e) => (
            ScanStatus::Error,
            Some(format!("failed to reap scanner: {e}")),
        ),
    };

    info!("Scan {} finished: {:?}", job.id, status);

    if job.set_terminal(status, error) {
        persist(&store, &history).await;
    }
}

/// Merge the child's stdout and stderr into the log buffer.
///
/// A single task reads both pipes, preserving the one-writer invariant
/// on the buffer. Read errors close the affected pipe and are otherwise
/// treated as end of stream.
async fn pump_lines(job: &JobEntry, stdout: ChildStdout, stderr: ChildStderr) {
    let mut out_lines = BufReader::new(stdout).lines();
    let mut err_lines = BufReader::new(stderr).lines();
    let mut out_open = true;
    let mut err_open = true;

    while out_open || err_open {
        let line = tokio::select! {
            res = out_lines.next_line(), if out_open => match res {
                Ok(Some(line)) => Some(line),
                Ok(None) => {
                    out_open = false;
                    None
                }
                Err(e) => {
                    debug!("Scan {} stdout read failed: {e}", job.id);
                    out_open = false;
                    None
                }
            },
            res = err_lines.next_line(), if err_open => match res {
                Ok(Some(line)) => Some(line),
                Ok(None) => {
                    err_open = false;
                    None
                }
                Err(e) => {
                    debug!("Scan {} stderr read failed: {e}", job.id);
                    err_open = false;
                    None
                }
            },
        };

        if let Some(line) = line {
            if is_progress_line(&line) {
                continue;
            }
            job.append_line(line);
        }
    }
}

async fn fail(store: &JobStore, history: &HistoryStore, job: &JobEntry, detail: String) {
    warn!("Scan {} failed: {detail}", job.id);
    if job.set_terminal(ScanStatus::Error, Some(detail)) {
        persist(store, history).await;
    }
}

/// Rewrite the history snapshot after a terminal transition.
pub(crate) async fn persist(store: &JobStore, history: &HistoryStore) {
    history.save(&store.snapshot()).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn progress_lines_are_filtered() {
        assert!(is_progress_line("job: 42% - errors: 0"));
        assert!(!is_progress_line("[200] /index.php"));
        assert!(!is_progress_line("job: queued"));
        assert!(!is_progress_line("100% unrelated"));
    }

    #[test]
    fn command_maps_target_and_options() {
        let config = EngineConfig::default();
        let store = JobStore::new();
        let job = store.create("example.com".into(), "php,html".into());

        let cmd = scan_command(&config, &job);
        let std_cmd = cmd.as_std();
        assert_eq!(std_cmd.get_program(), "python3");

        let args: Vec<String> = std_cmd
            .get_args()
            .map(|a| a.to_string_lossy().into_owned())
            .collect();
        let expected_report = config.report_path(job.id);

        assert_eq!(args[0], "-u");
        assert_eq!(args[1], "dirsearch.py");
        assert_eq!(args[2], "-u");
        assert_eq!(args[3], "example.com");
        assert_eq!(args[4], "-e");
        assert_eq!(args[5], "php,html");
        assert_eq!(args[6], "--output-formats");
        assert_eq!(args[7], "json");
        assert_eq!(args[8], "-o");
        assert_eq!(args[9], expected_report.to_string_lossy());
    }
}

//! Cancellation protocol driver
//!
//! Terminates a running scan through the scanner's interactive shutdown
//! sequence: a terminate signal, a grace delay for the confirmation
//! prompt to appear, two scripted `q` keystrokes, and a bounded wait
//! with a forced kill as the fallback. The script is blind; the driver
//! never parses the child's prompts.

use std::sync::Arc;

use sweep_core::domain::scan::ScanStatus;
use tokio::io::AsyncWriteExt;
use tokio::process::Child;
use tokio::time::{sleep, timeout};
use tracing::{debug, info, warn};

use crate::config::StopConfig;
use crate::error::{EngineError, Result};
use crate::history::HistoryStore;
use crate::store::{JobEntry, JobStore};
use crate::supervisor::persist;

/// The synthetic line appended to the log after a successful stop.
pub(crate) const STOPPED_LINE: &str = "Scan stopped by user.";

/// Stop a running scan.
///
/// Takes the child out of the job under the lifecycle lock; if the
/// supervisor got there first (natural exit racing the stop) this fails
/// with `NotRunning` and changes nothing. Once the driver owns the
/// child the job is guaranteed to reach `stopped` within
/// grace + 2 * settle + exit_timeout, even if the scanner ignores
/// everything short of a kill.
pub(crate) async fn stop_scan(
    config: &StopConfig,
    store: &Arc<JobStore>,
    history: &Arc<HistoryStore>,
    job: &Arc<JobEntry>,
) -> Result<()> {
    let mut child = job.take_child().ok_or(EngineError::NotRunning(job.id))?;

    info!("Stopping scan {}", job.id);

    // Step 1: ask nicely, then give the scanner time to print its
    // interactive confirmation prompt.
    terminate(&child);
    sleep(config.grace).await;

    // Step 2: play the quit script. First `q` answers [q]uit/[c]ontinue,
    // second `q` answers save/[q]uit-without-saving. A closed stdin
    // means the process is already going down; that is fine.
    if let Some(stdin) = child.stdin.as_mut() {
        for _ in 0..2 {
            if let Err(e) = stdin.write_all(b"q\n").await {
                debug!("Scan {} stdin closed during quit script: {e}", job.id);
                break;
            }
            if let Err(e) = stdin.flush().await {
                debug!("Scan {} stdin flush failed: {e}", job.id);
                break;
            }
            sleep(config.settle).await;
        }
    }

    // Step 3: bounded wait, forced kill on overrun.
    match timeout(config.exit_timeout, child.wait()).await {
        Ok(Ok(exit)) => debug!("Scan {} exited after stop script ({exit})", job.id),
        Ok(Err(e)) => warn!("Failed to reap scan {} after stop: {e}", job.id),
        Err(_) => {
            warn!("Scan {} ignored the shutdown script, killing", job.id);
            if let Err(e) = child.kill().await {
                warn!("Failed to kill scan {}: {e}", job.id);
            }
        }
    }

    // The line goes in before the terminal flip so every subscriber
    // sees it ahead of the end-of-stream sentinel.
    job.append_line(STOPPED_LINE.to_string());
    job.set_terminal(ScanStatus::Stopped, None);
    persist(store, history).await;

    Ok(())
}

#[cfg(unix)]
fn terminate(child: &Child) {
    use nix::sys::signal::{Signal, kill};
    use nix::unistd::Pid;

    if let Some(pid) = child.id()
        && let Err(e) = kill(Pid::from_raw(pid as i32), Signal::SIGTERM)
    {
        debug!("SIGTERM failed: {e}");
    }
}

#[cfg(not(unix))]
fn terminate(_child: &Child) {
    // No graceful signal available; the quit script and the kill
    // fallback still apply.
}

//! Log fan-out
//!
//! Every subscriber owns its own cursor into a job's append-only log
//! buffer: it replays from offset zero, follows new lines as the pump
//! appends them, and receives a single end-of-stream sentinel once the
//! job is terminal and the cursor caught up. Subscribers only ever take
//! the buffer's read lock; the pump never waits on subscriber pace.

use std::sync::Arc;
use std::time::Duration;

use sweep_core::domain::log::LogEvent;

use crate::store::JobEntry;

/// One subscriber's view of a job's log stream.
pub struct LogSubscription {
    job: Option<Arc<JobEntry>>,
    offset: usize,
    poll_interval: Duration,
    finished: bool,
}

impl LogSubscription {
    pub(crate) fn new(job: Option<Arc<JobEntry>>, poll_interval: Duration) -> Self {
        Self {
            job,
            offset: 0,
            poll_interval,
            finished: false,
        }
    }

    /// Next event for this subscriber.
    ///
    /// Returns `Line` for each buffered line in order, `Eof` exactly
    /// once after the job went terminal and every line was delivered,
    /// and `None` from then on. A subscription for an unknown job id
    /// yields `None` immediately, without a sentinel.
    pub async fn next_event(&mut self) -> Option<LogEvent> {
        if self.finished {
            return None;
        }

        let Some(job) = self.job.as_ref() else {
            self.finished = true;
            return None;
        };

        loop {
            let notified = job.notify().notified();

            if let Some(line) = job.line_at(self.offset) {
                self.offset += 1;
                return Some(LogEvent::Line(line));
            }

            // Caught up. Only now may the sentinel fire, so a job that
            // finished between two polls still drains its tail first.
            if job.status().is_terminal() {
                self.finished = true;
                return Some(LogEvent::Eof);
            }

            // The notify future above was created before the re-checks,
            // but only registers once polled; the fallback tick covers
            // a wakeup slipping into that window.
            tokio::select! {
                _ = notified => {}
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    /// Lines delivered so far.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

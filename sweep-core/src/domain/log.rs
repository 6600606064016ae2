//! Log stream event types

use serde::{Deserialize, Serialize};

/// One event delivered to a log stream subscriber.
///
/// A subscription replays every buffered line from offset zero and then
/// follows new lines as the scanner produces them; `Eof` is emitted
/// exactly once, after the job reached a terminal state and the
/// subscriber caught up with the buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "line", rename_all = "lowercase")]
pub enum LogEvent {
    Line(String),
    Eof,
}

//! Sweep Engine
//!
//! The scan orchestration core: launches external scan processes,
//! tracks their lifecycle, fans their output out to any number of
//! concurrent subscribers, and keeps a durable history snapshot.
//!
//! Components:
//! - [`store::JobStore`]: in-memory registry of job records, the single
//!   source of truth shared by every other component
//! - [`history::HistoryStore`]: best-effort JSON snapshot persistence
//! - [`supervisor`]: per-job process supervision and output pumping
//! - [`stop`]: the scripted cancellation protocol driver
//! - [`stream::LogSubscription`]: per-subscriber log replay and follow
//! - [`engine::ScanEngine`]: the facade exposing the boundary operations

pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod store;
pub mod stream;

pub(crate) mod stop;
pub(crate) mod supervisor;

pub use config::{EngineConfig, StopConfig};
pub use engine::ScanEngine;
pub use error::{EngineError, Result};
pub use stream::LogSubscription;

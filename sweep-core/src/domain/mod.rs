//! Domain types for the sweep system

pub mod log;
pub mod scan;

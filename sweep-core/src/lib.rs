//! Sweep Core
//!
//! Core types shared across the sweep scan-orchestration system.
//!
//! This crate contains:
//! - Domain types: scan records, statuses, and log stream events
//! - DTOs: request/response types for the engine's boundary operations

pub mod domain;
pub mod dto;

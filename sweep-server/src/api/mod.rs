//! API Module
//!
//! HTTP surface over the scan engine. This layer stays thin: it maps
//! requests to engine operations and engine errors to status codes;
//! all orchestration lives in `sweep-engine`.

pub mod error;
pub mod health;
pub mod scan;

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use sweep_engine::ScanEngine;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

/// Create the main API router with all endpoints
pub fn create_router(engine: Arc<ScanEngine>) -> Router {
    Router::new()
        // Health check
        .route("/health", get(health::health_check))
        // Scan endpoints
        .route("/scan", post(scan::start_scan))
        .route("/status/{id}", get(scan::get_status))
        .route("/history", get(scan::get_history))
        .route("/stop/{id}", post(scan::stop_scan))
        .route("/stream/{id}", get(scan::stream_logs))
        // Add state and middleware
        .with_state(engine)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

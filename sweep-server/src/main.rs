use std::sync::Arc;

use sweep_engine::{EngineConfig, ScanEngine};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sweep_server=debug,sweep_engine=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting sweep server...");

    let config = EngineConfig::from_env().expect("Invalid engine configuration");
    let engine = Arc::new(ScanEngine::new(config).await);

    // Build router with all API endpoints
    let app = api::create_router(engine);

    // Get bind address
    let addr = std::env::var("SWEEP_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());

    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}

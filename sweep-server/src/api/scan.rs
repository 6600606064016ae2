//! Scan API Handlers
//!
//! HTTP endpoints for the scan lifecycle: start, status, history, stop,
//! and the live log stream.

use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    Json,
    extract::{Path, State},
    response::{
        Sse,
        sse::{Event, KeepAlive},
    },
};
use futures::stream::{self, Stream};
use sweep_core::domain::log::LogEvent;
use sweep_core::dto::{HistoryEntry, ScanStatusResponse, StartScanRequest, StartScanResponse};
use sweep_engine::ScanEngine;
use uuid::Uuid;

use crate::api::error::ApiResult;

/// POST /scan
/// Start a new scan
pub async fn start_scan(
    State(engine): State<Arc<ScanEngine>>,
    Json(req): Json<StartScanRequest>,
) -> ApiResult<Json<StartScanResponse>> {
    tracing::info!("Start requested for target: {}", req.target);

    let scan_id = engine.start_scan(&req.target, &req.extensions).await?;

    Ok(Json(StartScanResponse { scan_id }))
}

/// GET /status/{id}
/// Current status of one scan; results are attached once it completed
pub async fn get_status(
    State(engine): State<Arc<ScanEngine>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ScanStatusResponse>> {
    tracing::debug!("Status requested for scan: {}", id);

    let status = engine.status(id).await?;

    Ok(Json(status))
}

/// GET /history
/// All known scans, newest first
pub async fn get_history(
    State(engine): State<Arc<ScanEngine>>,
) -> ApiResult<Json<Vec<HistoryEntry>>> {
    tracing::debug!("Listing scan history");

    Ok(Json(engine.history()))
}

/// POST /stop/{id}
/// Run the cancellation protocol against a running scan
pub async fn stop_scan(
    State(engine): State<Arc<ScanEngine>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    tracing::info!("Stop requested for scan: {}", id);

    engine.stop_scan(id).await?;

    Ok(Json(serde_json::json!({ "status": "stopped" })))
}

/// GET /stream/{id}
/// Server-sent log stream: one event per log line, then a `[DONE]`
/// sentinel once the scan is terminal and the stream caught up
pub async fn stream_logs(
    State(engine): State<Arc<ScanEngine>>,
    Path(id): Path<Uuid>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    tracing::debug!("SSE connection requested for scan {}", id);

    let subscription = engine.subscribe(id);

    let stream = stream::unfold(subscription, |mut subscription| async move {
        match subscription.next_event().await {
            Some(LogEvent::Line(line)) => {
                // Lines are JSON-encoded so the payload survives SSE framing.
                let data =
                    serde_json::to_string(&line).unwrap_or_else(|_| "\"\"".to_string());
                Some((Ok(Event::default().data(data)), subscription))
            }
            Some(LogEvent::Eof) => Some((Ok(Event::default().data("[DONE]")), subscription)),
            None => None,
        }
    });

    // Add keepalive to prevent connection timeout
    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(30))
            .text("keepalive"),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::create_router;
    use axum::body::Body;
    use axum::http::{Request, StatusCode, header};
    use sweep_core::domain::scan::ScanStatus;
    use sweep_engine::{EngineConfig, StopConfig};
    use tempfile::TempDir;
    use tower::ServiceExt;

    async fn router_with_script(dir: &TempDir, script: &str) -> axum::Router {
        let script_path = dir.path().join("scanner.sh");
        std::fs::write(
            &script_path,
            format!(
                r#"
report=""
while [ "$#" -gt 0 ]; do
  case "$1" in
    -o) report="$2"; shift 2 ;;
    *) shift ;;
  esac
done
{script}
"#
            ),
        )
        .unwrap();

        let config = EngineConfig {
            scanner_program: "sh".to_string(),
            scanner_base_args: vec![script_path.to_string_lossy().into_owned()],
            reports_dir: dir.path().join("reports"),
            history_path: dir.path().join("history.json"),
            stream_poll_interval: Duration::from_millis(20),
            stop: StopConfig {
                grace: Duration::from_millis(50),
                settle: Duration::from_millis(20),
                exit_timeout: Duration::from_millis(500),
            },
        };

        create_router(Arc::new(ScanEngine::new(config).await))
    }

    fn post_json(uri: &str, body: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    async fn body_json(response: axum::response::Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn missing_target_is_a_bad_request() {
        let dir = TempDir::new().unwrap();
        let app = router_with_script(&dir, "exit 0").await;

        let response = app
            .oneshot(post_json("/scan", r#"{"target": ""}"#))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn unknown_scan_is_not_found() {
        let dir = TempDir::new().unwrap();
        let app = router_with_script(&dir, "exit 0").await;

        let uri = format!("/status/{}", Uuid::new_v4());
        let response = app.oneshot(get(&uri)).await.unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn scan_lifecycle_over_http() {
        let dir = TempDir::new().unwrap();
        let app = router_with_script(
            &dir,
            r#"
echo "[200] /index.php"
printf '{"results": [{"path": "/index.php"}]}' > "$report"
exit 0
"#,
        )
        .await;

        // Start
        let response = app
            .clone()
            .oneshot(post_json(
                "/scan",
                r#"{"target": "example.com", "extensions": "php,html"}"#,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let started = body_json(response).await;
        let id: Uuid = serde_json::from_value(started["scan_id"].clone()).unwrap();

        // Poll until terminal
        let status_uri = format!("/status/{id}");
        let status = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                let response = app.clone().oneshot(get(&status_uri)).await.unwrap();
                assert_eq!(response.status(), StatusCode::OK);
                let body = body_json(response).await;
                let status: ScanStatus =
                    serde_json::from_value(body["status"].clone()).unwrap();
                if status.is_terminal() {
                    return body;
                }
                tokio::time::sleep(Duration::from_millis(20)).await;
            }
        })
        .await
        .unwrap();

        assert_eq!(status["status"], "completed");
        assert_eq!(status["results"][0]["path"], "/index.php");

        // History includes the scan
        let response = app.clone().oneshot(get("/history")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let history = body_json(response).await;
        assert_eq!(history[0]["id"], id.to_string());

        // Stopping a finished scan is a client error
        let response = app
            .clone()
            .oneshot(post_json(&format!("/stop/{id}"), "{}"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        // The stream replays the log and ends with the sentinel
        let response = app
            .clone()
            .oneshot(get(&format!("/stream/{id}")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "text/event-stream"
        );
        let bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .unwrap();
        let body = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(body.contains("data: \"[200] /index.php\""));
        assert!(body.ends_with("data: [DONE]\n\n"));
    }

    #[tokio::test]
    async fn health_endpoint_responds() {
        let dir = TempDir::new().unwrap();
        let app = router_with_script(&dir, "exit 0").await;

        let response = app.oneshot(get("/health")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

//! HTTP server for serving stress readings.
//!
//! This module provides an HTTP server that:
//! - Serves the latest stress reading via GET/POST /reading
//! - Reports model and source status via GET /status
//! - Appends simulated records to the source via POST /simulate
//!
//! # Architecture
//!
//! ```text
//! Dashboard ──→ GET /reading ──→ StressService ──→ ReadingStore ◀── SourceReader ◀── CSV
//! ```
//!
//! The `/api/emotibit*` routes are aliases kept for existing dashboard clients.

use crate::api::{
    ErrorResponse, HealthResponse, ReadingErrorResponse, ReadingResponse, SimulateResponse,
};
use crate::core::Reading;
use crate::service::{ServiceStatus, SharedStressService};
use crate::telemetry::StatsSnapshot;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub host: IpAddr,
    /// Port to bind to (0 for random)
    pub port: u16,
}

impl ServerConfig {
    /// Create a new server configuration
    pub fn new(host: IpAddr, port: u16) -> Self {
        Self { host, port }
    }

    /// Loopback-only configuration
    pub fn local(port: u16) -> Self {
        Self::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port)
    }
}

/// Handle to a running server.
pub struct ServerHandle {
    /// Address the server is listening on
    pub addr: SocketAddr,
    shutdown_tx: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Stop accepting requests, stop the poller and wait for both.
    pub async fn shutdown(self) {
        let _ = self.shutdown_tx.send(());
        if let Err(e) = self.task.await {
            tracing::error!("Server task failed: {}", e);
        }
    }
}

/// GET /health
async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// GET|POST /reading
async fn reading(State(service): State<SharedStressService>) -> Response {
    reading_response(&service.current_reading(), service.now_millis())
}

/// Render `current`. If it cannot be rendered the response is a 500 carrying
/// the safe default reading stamped with `now_millis`.
fn reading_response(current: &Reading, now_millis: i64) -> Response {
    match ReadingResponse::render(current) {
        Ok(body) => Json(body).into_response(),
        Err(e) => {
            tracing::error!("Failed to render reading: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ReadingErrorResponse {
                    error: e.to_string(),
                    reading: ReadingResponse::fallback(now_millis),
                }),
            )
                .into_response()
        }
    }
}

/// GET /status
async fn status(State(service): State<SharedStressService>) -> Json<ServiceStatus> {
    Json(service.status())
}

/// GET /stats
async fn stats(State(service): State<SharedStressService>) -> Json<StatsSnapshot> {
    Json(service.stats())
}

/// POST /simulate
///
/// Appends a simulated record to the source; the next poll picks it up.
async fn simulate(
    State(service): State<SharedStressService>,
) -> Result<Json<SimulateResponse>, (StatusCode, Json<ErrorResponse>)> {
    let internal_error = |error: String| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorResponse { error }),
        )
    };

    let injected = tokio::task::spawn_blocking(move || service.inject_simulated_reading())
        .await
        .map_err(|e| internal_error(format!("Simulation task failed: {e}")))?
        .map_err(|e| internal_error(e.to_string()))?;

    let data = ReadingResponse::render(&injected).map_err(|e| internal_error(e.to_string()))?;

    Ok(Json(SimulateResponse {
        success: true,
        data,
    }))
}

/// Build the router for a service.
pub fn router(service: SharedStressService) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/reading", get(reading).post(reading))
        .route("/status", get(status))
        .route("/stats", get(stats))
        .route("/simulate", post(simulate))
        .route("/api/emotibit", get(reading).post(reading))
        .route("/api/emotibit/status", get(status))
        .route("/api/emotibit/simulate", post(simulate))
        .layer(TraceLayer::new_for_http())
        .with_state(service)
}

/// Start the poller and the HTTP server.
pub async fn run(
    config: ServerConfig,
    service: SharedStressService,
) -> anyhow::Result<ServerHandle> {
    let app = router(service.clone());

    let addr = SocketAddr::new(config.host, config.port);
    let listener = TcpListener::bind(addr).await?;
    let actual_addr = listener.local_addr()?;

    service.start();
    tracing::info!("Stress agent listening on http://{}", actual_addr);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
                tracing::info!("Server shutdown signal received");
            })
            .await
        {
            tracing::error!("Server error: {}", e);
        }
        service.shutdown().await;
    });

    Ok(ServerHandle {
        addr: actual_addr,
        shutdown_tx,
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{BiometricSample, ReadingSource};

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_reading_response_renders_reading() {
        let sample = BiometricSample::new(0.41, 88.0, 31.0, 35.2);
        let reading = Reading::from_sample(&sample, 6.04, 1_000, ReadingSource::Heuristic);

        let response = reading_response(&reading, 2_000);
        assert_eq!(response.status(), StatusCode::OK);

        let body = body_json(response).await;
        assert_eq!(body["hr"], 88);
        assert_eq!(body["score"], 6.0);
        assert_eq!(body["timestamp"], 1_000);
        assert_eq!(body["source"], "heuristic");
        assert!(body.get("error").is_none());
    }

    #[tokio::test]
    async fn test_unrenderable_reading_serves_error_fallback() {
        let sample = BiometricSample::new(f64::INFINITY, 80.0, 40.0, 35.0);
        let reading = Reading::from_sample(&sample, 5.0, 1_000, ReadingSource::Model);

        let response = reading_response(&reading, 1_700_000_000_000);
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert!(body["error"].as_str().unwrap().contains("eda"));
        assert_eq!(body["hr"], 75);
        assert_eq!(body["hrv"], 45);
        assert_eq!(body["eda"], 0.3);
        assert_eq!(body["temp"], 34.5);
        assert_eq!(body["score"], 5.0);
        assert_eq!(body["timestamp"], 1_700_000_000_000i64);
        assert_eq!(body["source"], "error_fallback");
    }
}

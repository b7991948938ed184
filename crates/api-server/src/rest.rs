//! Operational endpoints: health, readiness and liveness probes.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::time::Instant;

/// Shared state for the operational handlers.
#[derive(Clone)]
pub struct AppState {
    pub node_id: String,
    pub start_time: Instant,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}

/// GET /health: Health check endpoint.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready: Readiness probe.
pub async fn readiness() -> StatusCode {
    StatusCode::OK
}

/// GET /live: Liveness probe.
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

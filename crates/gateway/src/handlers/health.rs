//! Health check handlers

use crate::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;

/// Liveness probe
pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "ok",
        "version": arandu_common::VERSION,
    }))
}

/// Readiness probe: checks database connectivity
pub async fn ready(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    match state.repository.ping().await {
        Ok(()) => Ok(Json(serde_json::json!({ "status": "ready" }))),
        Err(_) => Err(StatusCode::SERVICE_UNAVAILABLE),
    }
}

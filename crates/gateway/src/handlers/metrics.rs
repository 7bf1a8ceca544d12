//! Metrics summary handler

use axum::Json;

/// GET /metrics - aggregated counts, averages, and per-step latencies
pub async fn get_metrics() -> Json<serde_json::Value> {
    Json(arandu_common::metrics::summary())
}

//! Health check endpoints.

use axum::{extract::State, http::StatusCode, Json};
use telemetry::{health, metrics};

use crate::response::HealthResponse;
use crate::state::AppState;

/// GET /health - Full health check.
pub async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = health().report();

    Json(HealthResponse {
        status: report.status,
        store: state.store.status().clone(),
        components: report.components,
        export_watermark: state.exporter.watermark(),
        metrics: metrics().snapshot(),
    })
}

/// GET /health/ready - Readiness probe (store connected and answering pings).
pub async fn ready_handler(State(state): State<AppState>) -> StatusCode {
    if health().is_ready() && state.store.check_health().await {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /health/live - Liveness probe (service is running).
pub async fn live_handler() -> StatusCode {
    if health().is_alive() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

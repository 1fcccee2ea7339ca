//! Manual export trigger.

use axum::{extract::State, Json};
use worker::CycleOutcome;

use crate::response::ApiError;
use crate::state::AppState;

/// POST /export/trigger - runs one export cycle, 409 if one is running.
pub async fn trigger_export(State(state): State<AppState>) -> Result<Json<CycleOutcome>, ApiError> {
    let outcome = state.exporter.trigger_manual().await?;
    Ok(Json(outcome))
}

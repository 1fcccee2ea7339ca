//! Tracking endpoints.
//!
//! Every endpoint acknowledges with 202 once the payload is valid, whether or
//! not the store is connected. Malformed payloads are rejected with VALID_001.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use chrono::Utc;
use engine_core::{
    schema::{validate_event, validate_event_size},
    ClickEvent, CustomEvent, PageViewEvent, ScrollDepthEvent, SessionRecord, TrackedEvent,
};
use serde::de::DeserializeOwned;
use telemetry::metrics;
use tracing::{debug, warn};

use crate::extractors::ClientIp;
use crate::response::{ApiError, TrackResponse};
use crate::state::AppState;

type Accepted = (StatusCode, Json<TrackResponse>);

fn reject(err: impl Into<ApiError>) -> ApiError {
    metrics().events_rejected.inc();
    err.into()
}

/// Size-checks and decodes a tracking payload.
fn parse<T: DeserializeOwned>(body: &[u8]) -> Result<T, ApiError> {
    validate_event_size(body).map_err(reject)?;
    serde_json::from_slice(body).map_err(|e| {
        warn!(error = %e, "Malformed tracking payload");
        reject(ApiError::bad_request(format!("Invalid JSON: {}", e)))
    })
}

/// Fills the forwarded address, validates, stamps the receive time and
/// appends. The address is filled first so header values obey the same
/// length bound as payload values.
async fn accept(state: &AppState, mut event: TrackedEvent, client_ip: Option<String>) -> Result<Accepted, ApiError> {
    event.fill_ip_address(client_ip);
    validate_event(&event).map_err(|e| {
        warn!(stream = %event.stream(), error = %e, "Tracking payload failed validation");
        reject(e)
    })?;

    event.stamp_received(Utc::now());
    state.store.insert(event).await;

    Ok((StatusCode::ACCEPTED, Json(TrackResponse::accepted(1))))
}

/// POST /track/pageview
pub async fn track_pageview(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Accepted, ApiError> {
    let event: PageViewEvent = parse(&body)?;
    accept(&state, TrackedEvent::PageView(event), client_ip).await
}

/// POST /track/click
pub async fn track_click(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Accepted, ApiError> {
    let event: ClickEvent = parse(&body)?;
    accept(&state, TrackedEvent::Click(event), client_ip).await
}

/// POST /track/scroll
///
/// The stored milestone set is the cumulative set for the (session, page).
pub async fn track_scroll(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Accepted, ApiError> {
    let mut event: ScrollDepthEvent = parse(&body)?;
    if event.max_scroll_depth > 100 {
        return Err(reject(ApiError::bad_request("maxScrollDepth must be 0-100")));
    }

    let crossed = state.scroll_progress.apply(&mut event).await;
    if !crossed.is_empty() {
        debug!(
            session_id = %event.session_id,
            milestones = ?crossed,
            "Scroll milestones reached"
        );
    }
    accept(&state, TrackedEvent::ScrollDepth(event), client_ip).await
}

/// POST /track/session
pub async fn track_session(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Accepted, ApiError> {
    let record: SessionRecord = parse(&body)?;
    accept(&state, TrackedEvent::Session(record), client_ip).await
}

/// POST /track/event
pub async fn track_event(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    body: Bytes,
) -> Result<Accepted, ApiError> {
    let event: CustomEvent = parse(&body)?;
    accept(&state, TrackedEvent::Custom(event), client_ip).await
}

//! API routes.

pub mod analytics;
pub mod export;
pub mod health;
pub mod track;

use axum::{
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::state::AppState;

/// Prefix for tracking, dashboard and export routes.
pub const API_PREFIX: &str = "/api/analytics";

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let analytics = Router::new()
        .route("/track/pageview", post(track::track_pageview))
        .route("/track/click", post(track::track_click))
        .route("/track/scroll", post(track::track_scroll))
        .route("/track/session", post(track::track_session))
        .route("/track/event", post(track::track_event))
        .route(
            "/analytics/realtime/pageviews",
            get(analytics::realtime_pageviews),
        )
        .route("/analytics/heatmap/*page_url", get(analytics::heatmap))
        .route("/analytics/scroll/*page_url", get(analytics::scroll))
        .route("/analytics/dashboard", get(analytics::dashboard))
        .route("/export/trigger", post(export::trigger_export));

    Router::new()
        .nest(API_PREFIX, analytics)
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

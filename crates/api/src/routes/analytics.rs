//! Dashboard query endpoints.
//!
//! Responses are JSON rows, `[]`, or `null`. Store failures never surface as
//! HTTP errors here.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use clickhouse_client::{DashboardData, HeatmapCell, PageViewStat, ScrollStats};
use engine_core::limits::{
    DEFAULT_DASHBOARD_HOURS, DEFAULT_PAGE_WINDOW_MINUTES, DEFAULT_REALTIME_MINUTES,
    MAX_WINDOW_HOURS, MAX_WINDOW_MINUTES,
};
use serde::Deserialize;

use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct MinutesQuery {
    pub minutes: Option<u32>,
}

impl MinutesQuery {
    fn resolve(&self, default: u32) -> u32 {
        self.minutes.unwrap_or(default).clamp(1, MAX_WINDOW_MINUTES)
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct HoursQuery {
    pub hours: Option<u32>,
}

impl HoursQuery {
    fn resolve(&self) -> u32 {
        self.hours
            .unwrap_or(DEFAULT_DASHBOARD_HOURS)
            .clamp(1, MAX_WINDOW_HOURS)
    }
}

/// GET /analytics/realtime/pageviews
pub async fn realtime_pageviews(
    State(state): State<AppState>,
    Query(query): Query<MinutesQuery>,
) -> Json<Vec<PageViewStat>> {
    let minutes = query.resolve(DEFAULT_REALTIME_MINUTES);
    Json(state.store.realtime_page_views(minutes).await)
}

/// GET /analytics/heatmap/*page_url
pub async fn heatmap(
    State(state): State<AppState>,
    Path(page_url): Path<String>,
    Query(query): Query<MinutesQuery>,
) -> Json<Vec<HeatmapCell>> {
    let minutes = query.resolve(DEFAULT_PAGE_WINDOW_MINUTES);
    Json(state.store.click_heatmap(&page_url, minutes).await)
}

/// GET /analytics/scroll/*page_url
pub async fn scroll(
    State(state): State<AppState>,
    Path(page_url): Path<String>,
    Query(query): Query<MinutesQuery>,
) -> Json<Vec<ScrollStats>> {
    let minutes = query.resolve(DEFAULT_PAGE_WINDOW_MINUTES);
    Json(state.store.scroll_analytics(&page_url, minutes).await)
}

/// GET /analytics/dashboard
pub async fn dashboard(
    State(state): State<AppState>,
    Query(query): Query<HoursQuery>,
) -> Json<Option<DashboardData>> {
    Json(state.store.dashboard_summary(query.resolve()).await)
}

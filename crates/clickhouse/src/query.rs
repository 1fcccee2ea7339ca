//! Aggregation queries over the stream tables.
//!
//! Dashboard queries take a trailing window evaluated against the server's
//! `now64()`. Export queries take an explicit half-open `[start, end)` window.
//! Every caller-supplied value is a bound parameter; only table names, which
//! come from `StreamKind`, are formatted into the SQL.
//!
//! Result structs are decoded positionally, so field order must match the
//! SELECT list.

use crate::client::ClickHouseClient;
use crate::insert::{ClickRow, CustomEventRow, PageViewRow, ScrollDepthRow, SessionRow};
use clickhouse::Row;
use engine_core::limits::{DASHBOARD_TOP_PAGES, REALTIME_TOP_PAGES};
use engine_core::{Result, StreamKind, TimeWindow};
use serde::{Deserialize, Serialize};

const IN_WINDOW: &str = "timestamp >= fromUnixTimestamp64Milli(toInt64(?), 'UTC') \
     AND timestamp < fromUnixTimestamp64Milli(toInt64(?), 'UTC')";

fn query_error(e: clickhouse::error::Error) -> engine_core::Error {
    engine_core::Error::store(format!("Query error: {}", e))
}

// ============================================================================
// Dashboard rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct PageViewStat {
    pub page_url: String,
    pub views: u64,
    pub unique_users: u64,
    pub avg_time_on_page: f64,
}

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct HeatmapCell {
    pub click_x: u16,
    pub click_y: u16,
    pub click_count: u64,
    pub element_type: String,
    pub element_text: String,
}

#[derive(Debug, Clone, Default, PartialEq, Row, Serialize, Deserialize)]
pub struct ScrollStats {
    pub avg_scroll_depth: f64,
    pub total_sessions: u64,
    pub reached_25: u64,
    pub reached_50: u64,
    pub reached_75: u64,
    pub reached_100: u64,
}

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct TopPage {
    pub page_url: String,
    pub page_title: String,
    pub views: u64,
    pub unique_users: u64,
}

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct DeviceStat {
    pub device: String,
    pub count: u64,
    pub unique_users: u64,
}

// ============================================================================
// Export rows
// ============================================================================

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct PageViewAggregate {
    pub page_url: String,
    pub page_title: String,
    pub device: String,
    pub time_bucket: String,
    pub view_count: u64,
    pub unique_users: u64,
    pub unique_sessions: u64,
    pub avg_time_on_page: f64,
}

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct ClickAggregate {
    pub page_url: String,
    pub element_type: String,
    pub element_text: String,
    pub time_bucket: String,
    pub click_count: u64,
    pub unique_users: u64,
    pub unique_sessions: u64,
}

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: String,
    pub user_id: String,
    pub start_time: Option<i64>,
    pub end_time: Option<i64>,
    pub duration: u32,
    pub page_count: u32,
    pub initial_referrer: String,
    pub hour_bucket: String,
}

#[derive(Debug, Clone, PartialEq, Row, Serialize, Deserialize)]
pub struct ScrollAggregate {
    pub page_url: String,
    pub time_bucket: String,
    pub total_scroll_events: u64,
    pub unique_users: u64,
    pub unique_sessions: u64,
    pub avg_scroll_depth: f64,
    pub avg_time_to_max_scroll: f64,
    pub avg_page_height: f64,
    pub avg_viewport_height: f64,
    pub reached_25: u64,
    pub reached_50: u64,
    pub reached_75: u64,
    pub reached_100: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingMetrics {
    pub page_views: u64,
    pub click_events: u64,
    pub active_sessions: u64,
}

impl TrailingMetrics {
    pub fn is_zero(&self) -> bool {
        self.page_views == 0 && self.click_events == 0 && self.active_sessions == 0
    }
}

/// A raw row from any stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum StreamRecord {
    PageView(PageViewRow),
    Click(ClickRow),
    ScrollDepth(ScrollDepthRow),
    Session(SessionRow),
    Custom(CustomEventRow),
}

impl StreamRecord {
    /// Row timestamp in milliseconds since epoch.
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::PageView(r) => r.timestamp,
            Self::Click(r) => r.timestamp,
            Self::ScrollDepth(r) => r.timestamp,
            Self::Session(r) => r.timestamp,
            Self::Custom(r) => r.timestamp,
        }
    }
}

// ============================================================================
// Dashboard queries
// ============================================================================

/// Top pages over the last `minutes`, by views.
pub async fn realtime_page_views(client: &ClickHouseClient, minutes: u32) -> Result<Vec<PageViewStat>> {
    let sql = format!(
        "SELECT page_url, count() AS views, uniqExact(user_id) AS unique_users, \
         ifNotFinite(avg(time_on_page), 0) AS avg_time_on_page \
         FROM {} WHERE timestamp >= now64(3) - INTERVAL ? MINUTE \
         GROUP BY page_url ORDER BY views DESC LIMIT ?",
        client.table(StreamKind::PageViews)
    );

    client
        .inner()
        .query(&sql)
        .bind(minutes)
        .bind(REALTIME_TOP_PAGES)
        .fetch_all()
        .await
        .map_err(query_error)
}

/// Click frequency by position and element for one page.
pub async fn click_heatmap(client: &ClickHouseClient, page_url: &str, minutes: u32) -> Result<Vec<HeatmapCell>> {
    let sql = format!(
        "SELECT click_x, click_y, count() AS click_count, element_type, element_text \
         FROM {} WHERE page_url = ? AND timestamp >= now64(3) - INTERVAL ? MINUTE \
         GROUP BY click_x, click_y, element_type, element_text \
         ORDER BY click_count DESC",
        client.table(StreamKind::Clicks)
    );

    client
        .inner()
        .query(&sql)
        .bind(page_url)
        .bind(minutes)
        .fetch_all()
        .await
        .map_err(query_error)
}

/// Scroll depth distribution for one page.
pub async fn scroll_analytics(client: &ClickHouseClient, page_url: &str, minutes: u32) -> Result<ScrollStats> {
    let sql = format!(
        "SELECT ifNotFinite(avg(max_scroll_depth), 0) AS avg_scroll_depth, \
         count() AS total_sessions, \
         countIf(max_scroll_depth >= 25) AS reached_25, \
         countIf(max_scroll_depth >= 50) AS reached_50, \
         countIf(max_scroll_depth >= 75) AS reached_75, \
         countIf(max_scroll_depth >= 100) AS reached_100 \
         FROM {} WHERE page_url = ? AND timestamp >= now64(3) - INTERVAL ? MINUTE",
        client.table(StreamKind::ScrollDepth)
    );

    client
        .inner()
        .query(&sql)
        .bind(page_url)
        .bind(minutes)
        .fetch_one()
        .await
        .map_err(query_error)
}

pub async fn total_page_views(client: &ClickHouseClient, hours: u32) -> Result<u64> {
    let sql = format!(
        "SELECT count() FROM {} WHERE timestamp >= now64(3) - INTERVAL ? HOUR",
        client.table(StreamKind::PageViews)
    );

    client.inner().query(&sql).bind(hours).fetch_one().await.map_err(query_error)
}

pub async fn total_sessions(client: &ClickHouseClient, hours: u32) -> Result<u64> {
    let sql = format!(
        "SELECT uniqExact(session_id) FROM {} WHERE timestamp >= now64(3) - INTERVAL ? HOUR",
        client.table(StreamKind::PageViews)
    );

    client.inner().query(&sql).bind(hours).fetch_one().await.map_err(query_error)
}

pub async fn top_pages(client: &ClickHouseClient, hours: u32) -> Result<Vec<TopPage>> {
    let sql = format!(
        "SELECT page_url, page_title, count() AS views, uniqExact(user_id) AS unique_users \
         FROM {} WHERE timestamp >= now64(3) - INTERVAL ? HOUR \
         GROUP BY page_url, page_title ORDER BY views DESC LIMIT ?",
        client.table(StreamKind::PageViews)
    );

    client
        .inner()
        .query(&sql)
        .bind(hours)
        .bind(DASHBOARD_TOP_PAGES)
        .fetch_all()
        .await
        .map_err(query_error)
}

pub async fn device_breakdown(client: &ClickHouseClient, hours: u32) -> Result<Vec<DeviceStat>> {
    let sql = format!(
        "SELECT device, count() AS device_count, uniqExact(user_id) AS unique_users \
         FROM {} WHERE timestamp >= now64(3) - INTERVAL ? HOUR \
         GROUP BY device ORDER BY device_count DESC",
        client.table(StreamKind::PageViews)
    );

    client.inner().query(&sql).bind(hours).fetch_all().await.map_err(query_error)
}

// ============================================================================
// Change feed
// ============================================================================

async fn fetch_since<T>(client: &ClickHouseClient, stream: StreamKind, since_ms: i64) -> Result<Vec<T>>
where
    T: Row + for<'b> Deserialize<'b>,
{
    let sql = format!(
        "SELECT ?fields FROM {} \
         WHERE timestamp > fromUnixTimestamp64Milli(toInt64(?), 'UTC') ORDER BY timestamp",
        client.table(stream)
    );

    client.inner().query(&sql).bind(since_ms).fetch_all().await.map_err(query_error)
}

/// Rows of one stream strictly newer than `since_ms`, oldest first.
pub async fn changed_since(client: &ClickHouseClient, stream: StreamKind, since_ms: i64) -> Result<Vec<StreamRecord>> {
    let records = match stream {
        StreamKind::PageViews => fetch_since::<PageViewRow>(client, stream, since_ms)
            .await?
            .into_iter()
            .map(StreamRecord::PageView)
            .collect(),
        StreamKind::Clicks => fetch_since::<ClickRow>(client, stream, since_ms)
            .await?
            .into_iter()
            .map(StreamRecord::Click)
            .collect(),
        StreamKind::ScrollDepth => fetch_since::<ScrollDepthRow>(client, stream, since_ms)
            .await?
            .into_iter()
            .map(StreamRecord::ScrollDepth)
            .collect(),
        StreamKind::Sessions => fetch_since::<SessionRow>(client, stream, since_ms)
            .await?
            .into_iter()
            .map(StreamRecord::Session)
            .collect(),
        StreamKind::CustomEvents => fetch_since::<CustomEventRow>(client, stream, since_ms)
            .await?
            .into_iter()
            .map(StreamRecord::Custom)
            .collect(),
    };
    Ok(records)
}

// ============================================================================
// Export queries
// ============================================================================

pub async fn count_in_window(client: &ClickHouseClient, stream: StreamKind, window: &TimeWindow) -> Result<u64> {
    let sql = format!("SELECT count() FROM {} WHERE {}", client.table(stream), IN_WINDOW);

    client
        .inner()
        .query(&sql)
        .bind(window.start_ms())
        .bind(window.end_ms())
        .fetch_one()
        .await
        .map_err(query_error)
}

pub async fn page_view_aggregates(client: &ClickHouseClient, window: &TimeWindow) -> Result<Vec<PageViewAggregate>> {
    let sql = format!(
        "SELECT page_url, page_title, device, \
         toString(toStartOfMinute(timestamp)) AS bucket, \
         count() AS view_count, \
         uniqExact(user_id) AS unique_users, \
         uniqExact(session_id) AS unique_sessions, \
         ifNotFinite(avg(time_on_page), 0) AS avg_time \
         FROM {} WHERE {} \
         GROUP BY page_url, page_title, device, bucket \
         ORDER BY bucket, view_count DESC",
        client.table(StreamKind::PageViews),
        IN_WINDOW
    );

    client
        .inner()
        .query(&sql)
        .bind(window.start_ms())
        .bind(window.end_ms())
        .fetch_all()
        .await
        .map_err(query_error)
}

pub async fn click_aggregates(client: &ClickHouseClient, window: &TimeWindow) -> Result<Vec<ClickAggregate>> {
    let sql = format!(
        "SELECT page_url, element_type, element_text, \
         toString(toStartOfMinute(timestamp)) AS bucket, \
         count() AS click_count, \
         uniqExact(user_id) AS unique_users, \
         uniqExact(session_id) AS unique_sessions \
         FROM {} WHERE {} \
         GROUP BY page_url, element_type, element_text, bucket \
         ORDER BY bucket, click_count DESC",
        client.table(StreamKind::Clicks),
        IN_WINDOW
    );

    client
        .inner()
        .query(&sql)
        .bind(window.start_ms())
        .bind(window.end_ms())
        .fetch_all()
        .await
        .map_err(query_error)
}

/// One row per session; end-related fields come from the row with the
/// latest end time.
pub async fn session_summaries(client: &ClickHouseClient, window: &TimeWindow) -> Result<Vec<SessionSummary>> {
    let sql = format!(
        "SELECT session_id, \
         argMax(user_id, timestamp) AS last_user, \
         toUnixTimestamp64Milli(min(start_time)) AS first_start, \
         toUnixTimestamp64Milli(max(end_time)) AS last_end, \
         argMaxIf(duration, assumeNotNull(end_time), isNotNull(end_time)) AS final_duration, \
         argMaxIf(page_count, assumeNotNull(end_time), isNotNull(end_time)) AS final_page_count, \
         argMinIf(initial_referrer, timestamp, initial_referrer != '') AS first_referrer, \
         toString(toStartOfHour(ifNull(min(start_time), min(timestamp)))) AS hour_bucket \
         FROM {} WHERE {} \
         GROUP BY session_id \
         ORDER BY hour_bucket, session_id",
        client.table(StreamKind::Sessions),
        IN_WINDOW
    );

    client
        .inner()
        .query(&sql)
        .bind(window.start_ms())
        .bind(window.end_ms())
        .fetch_all()
        .await
        .map_err(query_error)
}

pub async fn scroll_aggregates(client: &ClickHouseClient, window: &TimeWindow) -> Result<Vec<ScrollAggregate>> {
    let sql = format!(
        "SELECT page_url, \
         toString(toStartOfMinute(timestamp)) AS bucket, \
         count() AS total_scroll_events, \
         uniqExact(user_id) AS unique_users, \
         uniqExact(session_id) AS unique_sessions, \
         ifNotFinite(avg(max_scroll_depth), 0) AS avg_depth, \
         ifNotFinite(avg(time_to_max_scroll), 0) AS avg_time_to_max, \
         ifNotFinite(avg(page_height), 0) AS avg_height, \
         ifNotFinite(avg(viewport_height), 0) AS avg_viewport, \
         countIf(max_scroll_depth >= 25) AS reached_25, \
         countIf(max_scroll_depth >= 50) AS reached_50, \
         countIf(max_scroll_depth >= 75) AS reached_75, \
         countIf(max_scroll_depth >= 100) AS reached_100 \
         FROM {} WHERE {} \
         GROUP BY page_url, bucket \
         ORDER BY bucket, total_scroll_events DESC",
        client.table(StreamKind::ScrollDepth),
        IN_WINDOW
    );

    client
        .inner()
        .query(&sql)
        .bind(window.start_ms())
        .bind(window.end_ms())
        .fetch_all()
        .await
        .map_err(query_error)
}

/// Page views, clicks and distinct page-view sessions within the window.
pub async fn trailing_metrics(client: &ClickHouseClient, window: &TimeWindow) -> Result<TrailingMetrics> {
    let page_views = count_in_window(client, StreamKind::PageViews, window).await?;
    let click_events = count_in_window(client, StreamKind::Clicks, window).await?;

    let sql = format!(
        "SELECT uniqExact(session_id) FROM {} WHERE {}",
        client.table(StreamKind::PageViews),
        IN_WINDOW
    );
    let active_sessions: u64 = client
        .inner()
        .query(&sql)
        .bind(window.start_ms())
        .bind(window.end_ms())
        .fetch_one()
        .await
        .map_err(query_error)?;

    Ok(TrailingMetrics {
        page_views,
        click_events,
        active_sessions,
    })
}

//! The event store: validated connection, idempotent schema, best-effort
//! inserts, and aggregation reads that never fail the caller.
//!
//! Status is decided once by [`EventStore::initialize`]. A degraded store
//! turns every insert into a logged no-op and every dashboard read into an
//! empty result.

use std::time::Instant;

use chrono::{DateTime, Utc};
use clickhouse::Row;
use engine_core::{
    ClickEvent, CustomEvent, DeviceClassifier, PageViewEvent, Result, ScrollDepthEvent,
    SessionRecord, StreamKind, TimeWindow, TrackedEvent,
};
use serde::Serialize;
use telemetry::metrics;
use tracing::{debug, error, info, warn};

use crate::client::ClickHouseClient;
use crate::config::ClickHouseConfig;
use crate::credentials::{validate_credentials, CredentialIssue};
use crate::insert::{insert_row, ClickRow, CustomEventRow, PageViewRow, ScrollDepthRow, SessionRow};
use crate::query::{
    self, ClickAggregate, DeviceStat, HeatmapCell, PageViewAggregate, PageViewStat,
    ScrollAggregate, ScrollStats, SessionSummary, StreamRecord, TopPage, TrailingMetrics,
};
use crate::schema::init_schema;

/// Why the store is not serving.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum DegradedReason {
    InvalidCredentials(CredentialIssue),
    Unreachable(String),
    SchemaInit(String),
}

impl std::fmt::Display for DegradedReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidCredentials(issue) => write!(f, "invalid credentials: {}", issue),
            Self::Unreachable(msg) => write!(f, "unreachable: {}", msg),
            Self::SchemaInit(msg) => write!(f, "schema initialization failed: {}", msg),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum StoreStatus {
    Connected,
    Degraded(DegradedReason),
}

impl StoreStatus {
    pub fn is_connected(&self) -> bool {
        matches!(self, Self::Connected)
    }
}

/// Dashboard headline numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardSummary {
    pub total_page_views: u64,
    pub total_sessions: u64,
    pub time_range: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardData {
    pub summary: DashboardSummary,
    pub top_pages: Vec<TopPage>,
    pub device_breakdown: Vec<DeviceStat>,
}

/// Logs and counts a failed read, substituting the empty value.
fn or_empty<T: Default>(result: Result<T>, what: &str) -> T {
    result.unwrap_or_else(|e| {
        metrics().query_errors.inc();
        error!(query = what, error = %e, "Analytics query failed");
        T::default()
    })
}

pub struct EventStore {
    client: Option<ClickHouseClient>,
    status: StoreStatus,
    classifier: DeviceClassifier,
}

impl EventStore {
    /// Validates the configuration, connects, and creates the schema.
    ///
    /// Never fails: any problem yields a degraded store.
    pub async fn initialize(config: ClickHouseConfig) -> Self {
        if let Err(issue) = validate_credentials(&config) {
            warn!(issue = %issue, "ClickHouse configuration rejected, running without event storage");
            return Self::degraded(DegradedReason::InvalidCredentials(issue));
        }

        let client = match ClickHouseClient::new(config) {
            Ok(client) => client,
            Err(e) => return Self::degraded(DegradedReason::Unreachable(e.to_string())),
        };

        if let Err(e) = client.ping().await {
            warn!(error = %e, "ClickHouse unreachable, running without event storage");
            return Self::degraded(DegradedReason::Unreachable(e.to_string()));
        }

        if let Err(e) = init_schema(&client).await {
            warn!(error = %e, "ClickHouse schema initialization failed, running without event storage");
            return Self::degraded(DegradedReason::SchemaInit(e.to_string()));
        }

        info!(database = %client.database(), "Event store connected");
        Self {
            client: Some(client),
            status: StoreStatus::Connected,
            classifier: DeviceClassifier::new(),
        }
    }

    /// A store that drops writes and answers reads with empty results.
    pub fn degraded(reason: DegradedReason) -> Self {
        Self {
            client: None,
            status: StoreStatus::Degraded(reason),
            classifier: DeviceClassifier::new(),
        }
    }

    pub fn status(&self) -> &StoreStatus {
        &self.status
    }

    pub fn is_connected(&self) -> bool {
        self.status.is_connected()
    }

    pub fn client(&self) -> Option<&ClickHouseClient> {
        self.client.as_ref()
    }

    /// Re-runs the idempotent DDL.
    pub async fn ensure_schema(&self) -> Result<()> {
        match &self.client {
            Some(client) => init_schema(client).await,
            None => Err(engine_core::Error::store(format!(
                "event store is degraded ({})",
                self.degraded_reason()
            ))),
        }
    }

    /// Live ping; false when degraded.
    pub async fn check_health(&self) -> bool {
        match &self.client {
            Some(client) => match client.ping().await {
                Ok(()) => true,
                Err(e) => {
                    warn!(error = %e, "ClickHouse ping failed");
                    false
                }
            },
            None => false,
        }
    }

    fn degraded_reason(&self) -> String {
        match &self.status {
            StoreStatus::Connected => "connected".to_string(),
            StoreStatus::Degraded(reason) => reason.to_string(),
        }
    }

    fn writable(&self, stream: StreamKind) -> Option<&ClickHouseClient> {
        if self.client.is_none() {
            metrics().inserts_skipped_degraded.inc();
            debug!(stream = %stream, "Event store degraded, dropping event");
        }
        self.client.as_ref()
    }

    async fn append<T: Row + Serialize>(&self, client: &ClickHouseClient, stream: StreamKind, row: &T) {
        let start = Instant::now();
        match insert_row(client, stream, row).await {
            Ok(()) => {
                metrics().events_inserted.inc();
                metrics()
                    .insert_latency_ms
                    .observe(start.elapsed().as_millis() as u64);
            }
            Err(e) => {
                metrics().insert_errors.inc();
                error!(stream = %stream, error = %e, "Failed to insert event");
            }
        }
    }

    // ------------------------------------------------------------------------
    // Inserts
    // ------------------------------------------------------------------------

    pub async fn insert_page_view(&self, event: PageViewEvent) {
        metrics().page_views_received.inc();
        debug!(payload = ?event, "Received page view");
        let Some(client) = self.writable(StreamKind::PageViews) else {
            return;
        };
        let row = PageViewRow::from_event(event, &self.classifier);
        self.append(client, StreamKind::PageViews, &row).await;
    }

    pub async fn insert_click(&self, event: ClickEvent) {
        metrics().clicks_received.inc();
        debug!(payload = ?event, "Received click");
        let Some(client) = self.writable(StreamKind::Clicks) else {
            return;
        };
        self.append(client, StreamKind::Clicks, &ClickRow::from(event)).await;
    }

    pub async fn insert_scroll_depth(&self, event: ScrollDepthEvent) {
        metrics().scroll_events_received.inc();
        debug!(payload = ?event, "Received scroll depth");
        let Some(client) = self.writable(StreamKind::ScrollDepth) else {
            return;
        };
        self.append(client, StreamKind::ScrollDepth, &ScrollDepthRow::from(event))
            .await;
    }

    pub async fn insert_session(&self, record: SessionRecord) {
        metrics().sessions_received.inc();
        debug!(payload = ?record, "Received session");
        let Some(client) = self.writable(StreamKind::Sessions) else {
            return;
        };
        self.append(client, StreamKind::Sessions, &SessionRow::from(record)).await;
    }

    pub async fn insert_custom_event(&self, event: CustomEvent) {
        metrics().custom_events_received.inc();
        debug!(payload = ?event, "Received custom event");
        let Some(client) = self.writable(StreamKind::CustomEvents) else {
            return;
        };
        self.append(client, StreamKind::CustomEvents, &CustomEventRow::from(event))
            .await;
    }

    /// Dispatches to the insert for the event's kind.
    pub async fn insert(&self, event: TrackedEvent) {
        match event {
            TrackedEvent::PageView(e) => self.insert_page_view(e).await,
            TrackedEvent::Click(e) => self.insert_click(e).await,
            TrackedEvent::ScrollDepth(e) => self.insert_scroll_depth(e).await,
            TrackedEvent::Session(e) => self.insert_session(e).await,
            TrackedEvent::Custom(e) => self.insert_custom_event(e).await,
        }
    }

    // ------------------------------------------------------------------------
    // Dashboard reads
    // ------------------------------------------------------------------------

    pub async fn realtime_page_views(&self, minutes: u32) -> Vec<PageViewStat> {
        let Some(client) = &self.client else {
            return Vec::new();
        };
        or_empty(
            query::realtime_page_views(client, minutes).await,
            "realtime_page_views",
        )
    }

    pub async fn click_heatmap(&self, page_url: &str, minutes: u32) -> Vec<HeatmapCell> {
        let Some(client) = &self.client else {
            return Vec::new();
        };
        or_empty(
            query::click_heatmap(client, page_url, minutes).await,
            "click_heatmap",
        )
    }

    /// Scroll distribution for one page as a single-row result.
    pub async fn scroll_analytics(&self, page_url: &str, minutes: u32) -> Vec<ScrollStats> {
        let Some(client) = &self.client else {
            return Vec::new();
        };
        or_empty(
            query::scroll_analytics(client, page_url, minutes)
                .await
                .map(|stats| vec![stats]),
            "scroll_analytics",
        )
    }

    /// Headline numbers, top pages and devices; `None` when degraded.
    ///
    /// The four sub-queries run concurrently and a failing one only empties
    /// its own field.
    pub async fn dashboard_summary(&self, hours: u32) -> Option<DashboardData> {
        let client = self.client.as_ref()?;

        let (views, sessions, pages, devices) = tokio::join!(
            query::total_page_views(client, hours),
            query::total_sessions(client, hours),
            query::top_pages(client, hours),
            query::device_breakdown(client, hours),
        );

        Some(DashboardData {
            summary: DashboardSummary {
                total_page_views: or_empty(views, "total_page_views"),
                total_sessions: or_empty(sessions, "total_sessions"),
                time_range: format!("{} hours", hours),
            },
            top_pages: or_empty(pages, "top_pages"),
            device_breakdown: or_empty(devices, "device_breakdown"),
        })
    }

    /// Rows of one stream strictly newer than `since`, oldest first.
    ///
    /// Raw change feed for incremental readers; the scheduled exporter reads
    /// windowed aggregates instead.
    pub async fn changed_since(&self, stream: StreamKind, since: DateTime<Utc>) -> Vec<StreamRecord> {
        let Some(client) = &self.client else {
            return Vec::new();
        };
        or_empty(
            query::changed_since(client, stream, since.timestamp_millis()).await,
            "changed_since",
        )
    }

    // ------------------------------------------------------------------------
    // Export reads
    //
    // These propagate failures so a failing export job is reported as such.
    // A degraded store yields empty aggregates.
    // ------------------------------------------------------------------------

    pub async fn count_in_window(&self, stream: StreamKind, window: &TimeWindow) -> Result<u64> {
        match &self.client {
            Some(client) => query::count_in_window(client, stream, window).await,
            None => Err(engine_core::Error::store(format!(
                "event store is degraded ({})",
                self.degraded_reason()
            ))),
        }
    }

    pub async fn page_view_aggregates(&self, window: &TimeWindow) -> Result<Vec<PageViewAggregate>> {
        match &self.client {
            Some(client) => query::page_view_aggregates(client, window).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn click_aggregates(&self, window: &TimeWindow) -> Result<Vec<ClickAggregate>> {
        match &self.client {
            Some(client) => query::click_aggregates(client, window).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn session_summaries(&self, window: &TimeWindow) -> Result<Vec<SessionSummary>> {
        match &self.client {
            Some(client) => query::session_summaries(client, window).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn scroll_aggregates(&self, window: &TimeWindow) -> Result<Vec<ScrollAggregate>> {
        match &self.client {
            Some(client) => query::scroll_aggregates(client, window).await,
            None => Ok(Vec::new()),
        }
    }

    pub async fn trailing_metrics(&self, window: &TimeWindow) -> Result<TrailingMetrics> {
        match &self.client {
            Some(client) => query::trailing_metrics(client, window).await,
            None => Ok(TrailingMetrics::default()),
        }
    }
}

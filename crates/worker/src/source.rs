//! Read side of the exporter.

use async_trait::async_trait;
use clickhouse_client::{
    ClickAggregate, EventStore, PageViewAggregate, ScrollAggregate, SessionSummary,
    TrailingMetrics,
};
use engine_core::{Result, StreamKind, TimeWindow};

/// Windowed aggregates the exporter reads from.
#[async_trait]
pub trait ExportSource: Send + Sync {
    fn is_connected(&self) -> bool;

    async fn count_in_window(&self, stream: StreamKind, window: &TimeWindow) -> Result<u64>;

    async fn page_view_aggregates(&self, window: &TimeWindow) -> Result<Vec<PageViewAggregate>>;

    async fn click_aggregates(&self, window: &TimeWindow) -> Result<Vec<ClickAggregate>>;

    async fn session_summaries(&self, window: &TimeWindow) -> Result<Vec<SessionSummary>>;

    async fn scroll_aggregates(&self, window: &TimeWindow) -> Result<Vec<ScrollAggregate>>;

    async fn trailing_metrics(&self, window: &TimeWindow) -> Result<TrailingMetrics>;
}

#[async_trait]
impl ExportSource for EventStore {
    fn is_connected(&self) -> bool {
        EventStore::is_connected(self)
    }

    async fn count_in_window(&self, stream: StreamKind, window: &TimeWindow) -> Result<u64> {
        EventStore::count_in_window(self, stream, window).await
    }

    async fn page_view_aggregates(&self, window: &TimeWindow) -> Result<Vec<PageViewAggregate>> {
        EventStore::page_view_aggregates(self, window).await
    }

    async fn click_aggregates(&self, window: &TimeWindow) -> Result<Vec<ClickAggregate>> {
        EventStore::click_aggregates(self, window).await
    }

    async fn session_summaries(&self, window: &TimeWindow) -> Result<Vec<SessionSummary>> {
        EventStore::session_summaries(self, window).await
    }

    async fn scroll_aggregates(&self, window: &TimeWindow) -> Result<Vec<ScrollAggregate>> {
        EventStore::scroll_aggregates(self, window).await
    }

    async fn trailing_metrics(&self, window: &TimeWindow) -> Result<TrailingMetrics> {
        EventStore::trailing_metrics(self, window).await
    }
}

//! Event store tests against a real ClickHouse.
//!
//! Requires Docker to be running for testcontainers.

use chrono::{Duration, Utc};
use clickhouse_client::{EventStore, StreamRecord};
use engine_core::{ClickEvent, PageViewEvent, ScrollDepthEvent, StreamKind};
use integration_tests::{containers::TestContainers, fixtures, setup::TestContext};

/// Initializing twice is harmless and leaves exactly five tables
#[tokio::test]
async fn test_initialize_is_idempotent() {
    let containers = TestContainers::start().await;
    let config = TestContext::store_config(&containers);

    let first = EventStore::initialize(config.clone()).await;
    let second = EventStore::initialize(config.clone()).await;
    assert!(first.is_connected());
    assert!(second.is_connected());
    second.ensure_schema().await.unwrap();

    let client = second.client().unwrap();
    let tables: Vec<String> = client
        .inner()
        .query("SELECT name FROM system.tables WHERE database = ? ORDER BY name")
        .bind(&config.database)
        .fetch_all()
        .await
        .unwrap();

    assert_eq!(
        tables,
        vec![
            "click_events_stream",
            "custom_events_stream",
            "page_views_stream",
            "scroll_depth_stream",
            "sessions_stream",
        ]
    );
}

/// changed_since returns rows strictly after the cutoff, oldest first
#[tokio::test]
async fn test_changed_since_window() {
    let ctx = TestContext::new(Utc::now()).await;
    let session = fixtures::session_id();
    let t0 = Utc::now() - Duration::minutes(3);
    let t1 = t0 + Duration::minutes(1);
    let t2 = t1 + Duration::minutes(1);

    for at in [t0, t1, t2] {
        let event: PageViewEvent = fixtures::typed(fixtures::page_view(&session, "/docs", at));
        ctx.store.insert_page_view(event).await;
    }

    let after_t0 = ctx.store.changed_since(StreamKind::PageViews, t0).await;
    let stamps: Vec<i64> = after_t0.iter().map(StreamRecord::timestamp).collect();
    assert_eq!(stamps, vec![t1.timestamp_millis(), t2.timestamp_millis()]);

    let after_t2 = ctx.store.changed_since(StreamKind::PageViews, t2).await;
    assert!(after_t2.is_empty());
}

/// Stored page views get defaults and a device class from the user agent
#[tokio::test]
async fn test_page_view_defaults_and_device() {
    let ctx = TestContext::new(Utc::now()).await;
    let session = fixtures::session_id();

    let event: PageViewEvent =
        fixtures::typed(serde_json::json!({"sessionId": session, "pageUrl": "/"}));
    ctx.store.insert_page_view(event).await;
    let event: PageViewEvent = fixtures::typed(fixtures::page_view(&session, "/pricing", Utc::now()));
    ctx.store.insert_page_view(event).await;

    let rows = ctx
        .store
        .changed_since(StreamKind::PageViews, Utc::now() - Duration::hours(1))
        .await;
    assert_eq!(rows.len(), 2);

    let StreamRecord::PageView(bare) = &rows[0] else {
        panic!("expected a page view row");
    };
    assert_eq!(bare.user_id, "anonymous");
    assert_eq!(bare.device, "unknown");

    let StreamRecord::PageView(full) = &rows[1] else {
        panic!("expected a page view row");
    };
    assert_eq!(full.device, "desktop");
    assert_eq!(full.viewport_width, 1440);
}

/// Quotes in page URLs are bound, not spliced into SQL
#[tokio::test]
async fn test_heatmap_with_quoted_url() {
    let ctx = TestContext::new(Utc::now()).await;
    let session = fixtures::session_id();
    let url = r#"/search?q=it's "quoted"; DROP TABLE x"#;
    let now = Utc::now();

    for (x, y) in [(10, 20), (10, 20), (30, 40)] {
        let event: ClickEvent = fixtures::typed(fixtures::click(&session, url, x, y, now));
        ctx.store.insert_click(event).await;
    }

    let cells = ctx.store.click_heatmap(url, 60).await;
    assert_eq!(cells.len(), 2);
    assert_eq!((cells[0].click_x, cells[0].click_y, cells[0].click_count), (10, 20, 2));
    assert_eq!(cells[1].click_count, 1);

    assert!(ctx.store.click_heatmap("/elsewhere", 60).await.is_empty());
}

/// Scroll analytics and dashboard summary aggregate recent rows
#[tokio::test]
async fn test_scroll_and_dashboard_aggregates() {
    let ctx = TestContext::new(Utc::now()).await;
    let now = Utc::now();

    for (session, depth) in [("s-a", 30), ("s-b", 80), ("s-c", 100)] {
        let event: ScrollDepthEvent =
            fixtures::typed(fixtures::scroll(session, "/article", depth, now));
        ctx.store.insert_scroll_depth(event).await;

        let event: PageViewEvent = fixtures::typed(fixtures::page_view(session, "/article", now));
        ctx.store.insert_page_view(event).await;
    }

    let scroll = ctx.store.scroll_analytics("/article", 60).await;
    assert_eq!(scroll.len(), 1);
    assert_eq!(scroll[0].total_sessions, 3);
    assert_eq!(scroll[0].reached_25, 3);
    assert_eq!(scroll[0].reached_75, 2);
    assert_eq!(scroll[0].reached_100, 1);

    let dashboard = ctx.store.dashboard_summary(24).await.expect("connected store");
    assert_eq!(dashboard.summary.total_page_views, 3);
    assert_eq!(dashboard.summary.total_sessions, 3);
    assert_eq!(dashboard.summary.time_range, "24 hours");
    assert_eq!(dashboard.top_pages[0].page_url, "/article");
    assert_eq!(dashboard.device_breakdown[0].device, "desktop");

    let realtime = ctx.store.realtime_page_views(30).await;
    assert_eq!(realtime[0].views, 3);
}

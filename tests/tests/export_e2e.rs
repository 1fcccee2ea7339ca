//! End-to-end export tests.
//!
//! Events go in through the HTTP router, land in ClickHouse, and come out as
//! export artifacts captured by the mock sink.
//!
//! Requires Docker to be running for the ClickHouse testcontainer.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration, Utc};
use integration_tests::{fixtures, setup::TestContext};
use worker::{ExportJob, JobStatus};

async fn track(server: &TestServer, path: &str, body: serde_json::Value) {
    server
        .post(&format!("/api/analytics/track/{}", path))
        .json(&body)
        .await
        .assert_status(StatusCode::ACCEPTED);
}

/// Tracked events are exported once, then the next cycle skips
#[tokio::test]
async fn test_export_cycle_e2e() {
    let start = Utc::now() - Duration::minutes(30);
    let ctx = TestContext::new(start).await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::session_id();
    let at = Utc::now() - Duration::minutes(5);

    track(&server, "pageview", fixtures::page_view(&session, "/pricing", at)).await;
    track(&server, "pageview", fixtures::page_view(&session, "/docs", at)).await;
    track(&server, "click", fixtures::click(&session, "/pricing", 10, 20, at)).await;
    track(&server, "scroll", fixtures::scroll(&session, "/pricing", 80, at)).await;
    track(&server, "session", fixtures::session(&session, at, Some(at + Duration::minutes(2)))).await;
    track(&server, "event", fixtures::custom_event(&session, "signup", at)).await;

    let now = Utc::now();
    let outcome = ctx.exporter.run_cycle_at(now).await.unwrap();

    assert!(!outcome.is_skipped());
    assert_eq!(outcome.failed_count(), 0, "{:?}", outcome);
    assert_eq!(outcome.uploaded_count(), 5);
    assert_eq!(ctx.exporter.watermark(), now);

    let page_views = ctx.sink.find("page-views").expect("page view export");
    let day = now.format("%Y-%m-%d").to_string();
    assert!(page_views.key.starts_with(&format!("page-views/{}/page_views_{}_", day, day)));
    assert!(page_views.key.ends_with(".json"));
    assert_eq!(page_views.body["dataType"], "page_views");
    let data = page_views.body["data"].as_array().unwrap();
    assert_eq!(page_views.body["recordCount"].as_u64().unwrap() as usize, data.len());
    assert_eq!(data.len(), 2);
    assert_eq!(page_views.metadata.record_count, data.len());

    let scroll = ctx.sink.find("scroll-depth").expect("scroll export");
    assert_eq!(scroll.body["data"][0]["reached_75"], 1);
    assert_eq!(scroll.body["data"][0]["reached_100"], 0);

    let sessions = ctx.sink.find("sessions").expect("session export");
    assert_eq!(sessions.body["data"][0]["session_id"], session.as_str());
    assert_eq!(sessions.body["data"][0]["duration"], 120);

    let metrics = ctx.sink.find("metrics").expect("metrics export");
    assert_eq!(metrics.body["dataType"], "real_time_metrics");
    assert_eq!(metrics.body["metrics"]["last_hour"]["page_views"], 2);
    assert_eq!(metrics.body["metrics"]["last_hour"]["active_sessions"], 1);

    // Nothing new since the watermark
    ctx.sink.clear();
    let later = now + Duration::seconds(1);
    let outcome = ctx.exporter.run_cycle_at(later).await.unwrap();
    assert!(outcome.is_skipped());
    assert_eq!(ctx.sink.object_count(), 0);
    assert_eq!(ctx.exporter.watermark(), later);
}

/// A failing sessions upload does not block the other jobs or the watermark
#[tokio::test]
async fn test_failed_job_is_isolated() {
    let ctx = TestContext::new(Utc::now() - Duration::minutes(30)).await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    ctx.sink.fail_writes_under("sessions");

    let session = fixtures::session_id();
    let at = Utc::now() - Duration::minutes(5);
    track(&server, "pageview", fixtures::page_view(&session, "/", at)).await;
    track(&server, "click", fixtures::click(&session, "/", 1, 2, at)).await;
    track(&server, "scroll", fixtures::scroll(&session, "/", 50, at)).await;
    track(&server, "session", fixtures::session(&session, at, None)).await;

    let now = Utc::now();
    let outcome = ctx.exporter.run_cycle_at(now).await.unwrap();

    assert!(matches!(
        outcome.status_of(ExportJob::Sessions),
        Some(JobStatus::Failed { .. })
    ));
    assert_eq!(outcome.uploaded_count(), 4);
    assert!(ctx.sink.find("sessions").is_none());
    assert!(ctx.sink.find("page-views").is_some());
    assert_eq!(ctx.exporter.watermark(), now);
}

/// Rows are windowed by receive time, so a stale client clock still exports
#[tokio::test]
async fn test_window_uses_receive_time() {
    let ctx = TestContext::new(Utc::now() - Duration::minutes(2)).await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::session_id();
    let stale = Utc::now() - Duration::minutes(10);
    track(&server, "pageview", fixtures::page_view(&session, "/late", stale)).await;

    let outcome = ctx.exporter.run_cycle_at(Utc::now()).await.unwrap();
    assert!(!outcome.is_skipped());
    assert!(matches!(
        outcome.status_of(ExportJob::PageViews),
        Some(JobStatus::Uploaded { record_count: 1, .. })
    ));
    assert!(ctx.sink.find("page-views").is_some());
}

/// Rows already behind the watermark are not exported again
#[tokio::test]
async fn test_window_starts_at_watermark() {
    let ctx = TestContext::new(Utc::now() - Duration::minutes(30)).await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::session_id();
    track(&server, "pageview", fixtures::page_view(&session, "/old", Utc::now())).await;

    let first = ctx.exporter.run_cycle_at(Utc::now()).await.unwrap();
    assert!(!first.is_skipped());
    ctx.sink.clear();

    let second = ctx.exporter.run_cycle_at(Utc::now()).await.unwrap();
    assert!(second.is_skipped());
    assert_eq!(ctx.sink.object_count(), 0);
}

/// The HTTP trigger returns the cycle outcome
#[tokio::test]
async fn test_manual_trigger_over_http() {
    let ctx = TestContext::new(Utc::now() - Duration::minutes(30)).await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let session = fixtures::session_id();
    track(&server, "click", fixtures::click(&session, "/", 5, 5, Utc::now() - Duration::minutes(1))).await;

    let response = server.post("/api/analytics/export/trigger").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["outcome"], "exported");
    assert!(ctx.sink.find("click-events").is_some());
}

//! HTTP tests against a degraded store.
//!
//! No ClickHouse is configured, so these run without Docker. Tracking calls
//! must still be acknowledged, dashboards must answer with empty sentinels,
//! and malformed payloads must be rejected.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::Utc;
use integration_tests::{fixtures, setup::DegradedContext};
use serde_json::json;

async fn server() -> (DegradedContext, TestServer) {
    let ctx = DegradedContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");
    (ctx, server)
}

/// Every track endpoint acknowledges with 202 while degraded
#[tokio::test]
async fn test_track_endpoints_accept_while_degraded() {
    let (_ctx, server) = server().await;
    let session = fixtures::session_id();
    let now = Utc::now();

    let cases = [
        ("/api/analytics/track/pageview", fixtures::page_view(&session, "/pricing", now)),
        ("/api/analytics/track/click", fixtures::click(&session, "/pricing", 10, 20, now)),
        ("/api/analytics/track/scroll", fixtures::scroll(&session, "/pricing", 60, now)),
        ("/api/analytics/track/session", fixtures::session(&session, now, None)),
        ("/api/analytics/track/event", fixtures::custom_event(&session, "signup", now)),
    ];

    for (path, body) in cases {
        let response = server.post(path).json(&body).await;
        response.assert_status(StatusCode::ACCEPTED);

        let body: serde_json::Value = response.json();
        assert_eq!(body["success"], true, "{}", path);
        assert_eq!(body["received"], 1, "{}", path);
        assert!(body["timestamp"].as_i64().unwrap() > 0);
    }
}

/// Minimal payloads only need a session id
#[tokio::test]
async fn test_minimal_payload_is_accepted() {
    let (_ctx, server) = server().await;

    let response = server
        .post("/api/analytics/track/pageview")
        .json(&json!({"sessionId": "sess-min"}))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
}

/// Malformed JSON is rejected with VALID_001
#[tokio::test]
async fn test_malformed_payload_rejected() {
    let (_ctx, server) = server().await;

    let response = server
        .post("/api/analytics/track/click")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// A missing session id fails validation
#[tokio::test]
async fn test_missing_session_rejected() {
    let (_ctx, server) = server().await;

    let response = server
        .post("/api/analytics/track/event")
        .json(&json!({"sessionId": "", "eventName": "signup"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert!(body["details"][0].as_str().unwrap().contains("custom_events"));
}

/// Scroll depth above 100 is rejected
#[tokio::test]
async fn test_scroll_depth_out_of_range_rejected() {
    let (_ctx, server) = server().await;

    let response = server
        .post("/api/analytics/track/scroll")
        .json(&json!({"sessionId": "sess-1", "pageUrl": "/", "maxScrollDepth": 150}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
}

/// A forwarded address longer than an IP is held to the payload field bound
#[tokio::test]
async fn test_forwarded_address_is_validated() {
    let (_ctx, server) = server().await;
    let bogus_hop = "f".repeat(60);

    let response = server
        .post("/api/analytics/track/pageview")
        .add_header("X-Forwarded-For", &format!("{}, 10.0.0.1", bogus_hop))
        .json(&json!({"sessionId": "sess-ip"}))
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");

    let response = server
        .post("/api/analytics/track/pageview")
        .add_header("X-Forwarded-For", "203.0.113.7, 10.0.0.1")
        .json(&json!({"sessionId": "sess-ip"}))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
}

/// Oversized payloads are rejected before parsing
#[tokio::test]
async fn test_oversized_payload_rejected() {
    let (_ctx, server) = server().await;
    let padding = "x".repeat(40 * 1024);

    let response = server
        .post("/api/analytics/track/event")
        .json(&json!({"sessionId": "sess-1", "eventName": padding}))
        .await;

    response.assert_status(StatusCode::PAYLOAD_TOO_LARGE);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

/// Dashboard reads answer with [] or null while degraded
#[tokio::test]
async fn test_dashboard_reads_empty_while_degraded() {
    let (_ctx, server) = server().await;

    let realtime: serde_json::Value = server
        .get("/api/analytics/analytics/realtime/pageviews")
        .add_query_param("minutes", 15)
        .await
        .json();
    assert_eq!(realtime, json!([]));

    let heatmap: serde_json::Value = server
        .get("/api/analytics/analytics/heatmap/%2Fpricing")
        .await
        .json();
    assert_eq!(heatmap, json!([]));

    let scroll: serde_json::Value = server
        .get("/api/analytics/analytics/scroll/%2Fpricing")
        .add_query_param("minutes", 60)
        .await
        .json();
    assert_eq!(scroll, json!([]));

    let dashboard: serde_json::Value = server
        .get("/api/analytics/analytics/dashboard")
        .add_query_param("hours", 24)
        .await
        .json();
    assert_eq!(dashboard, serde_json::Value::Null);
}

/// A manual export against a degraded store fails open and writes nothing
#[tokio::test]
async fn test_manual_export_while_degraded() {
    let (ctx, server) = server().await;

    let response = server.post("/api/analytics/export/trigger").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["outcome"], "exported");
    let reports = body["reports"].as_array().unwrap();
    assert_eq!(reports.len(), 5);
    assert!(reports.iter().all(|r| r["status"] == "skipped"));
    assert_eq!(ctx.sink.object_count(), 0);
}

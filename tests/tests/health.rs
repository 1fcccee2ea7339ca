//! Tests for health check endpoints.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::setup::DegradedContext;

/// /health reports the store state, components and counters
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = DegradedContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "unexpected status '{}'",
        status
    );
    assert_eq!(body["store"]["state"], "degraded");
    assert_eq!(body["store"]["reason"], "invalid_credentials");
    assert_eq!(body["store"]["detail"], "missing_url");
    assert!(body["components"].is_array());
    assert!(body["exportWatermark"].is_string());
    assert!(body["metrics"]["events_received"].is_u64());
}

/// /health/ready is 503 without a connected store
#[tokio::test]
async fn test_ready_endpoint_degraded() {
    let ctx = DegradedContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);
}

/// /health/live always returns 200 when the service is running
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = DegradedContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

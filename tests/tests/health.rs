//! Tests for health check endpoints.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["storeConnected"], true);

    let components = body["components"].as_array().unwrap();
    assert_eq!(components.len(), 1);
    assert_eq!(components[0]["name"], "store");
    assert_eq!(components[0]["healthy"], true);
}

/// /health carries a metrics snapshot that reflects served traffic
#[tokio::test]
async fn test_health_reports_metrics() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server
        .post("/sessions")
        .json(&fixtures::session("sess_metrics"))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/track")
        .json(&fixtures::track("sess_metrics", "page_view"))
        .await
        .assert_status(StatusCode::CREATED);

    let body: serde_json::Value = server.get("/health").await.json();
    let metrics = &body["metrics"];
    assert!(metrics["sessionsCreated"].as_u64().unwrap() >= 1);
    assert!(metrics["eventsTracked"].as_u64().unwrap() >= 1);
    assert!(metrics["requestLatencyMeanMs"].is_number());
    assert!(metrics["activeRequests"].is_u64());
    assert!(metrics["timestamp"].is_string());
}

/// Test /health/ready after a successful probe
#[tokio::test]
async fn test_ready_endpoint() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server.get("/health").await.assert_status_ok();
    server.get("/health/ready").await.assert_status_ok();
}

/// Test /health/live always returns 200 while serving
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server.get("/health/live").await.assert_status(StatusCode::OK);
}

/// Unknown routes are plain 404s
#[tokio::test]
async fn test_unknown_route() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server.get("/nope").await.assert_status(StatusCode::NOT_FOUND);
}

//! Cascading deletes and store outages over HTTP.
//!
//! The outage test flips the global store health, so it lives apart from
//! the health endpoint tests.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

async fn session_with_events(server: &TestServer, session_id: &str, events: usize) {
    server
        .post("/sessions")
        .json(&fixtures::session(session_id))
        .await
        .assert_status(StatusCode::CREATED);
    let report: serde_json::Value = server
        .post("/track/batch")
        .json(&fixtures::batch(fixtures::track_many(session_id, "click", events)))
        .await
        .json();
    assert_eq!(report["successful"], events);
}

/// Deleting a session removes the metadata item and every event
#[tokio::test]
async fn test_cascade_delete() {
    let ctx = TestContext::new();
    let server = ctx.server();
    session_with_events(&server, "sess_1", 3).await;
    session_with_events(&server, "sess_2", 1).await;

    let response = server.delete("/sessions/sess_1").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["sessionId"], "sess_1");
    assert_eq!(body["deleted"], 4);

    server
        .get("/sessions/sess_1/timeline")
        .await
        .assert_status(StatusCode::NOT_FOUND);
    let events: serde_json::Value = server.get("/sessions/sess_1/events").await.json();
    assert_eq!(events["count"], 0);

    // Neighbouring partitions are untouched
    assert_eq!(ctx.item_count(), 2);

    let response = server.delete("/sessions/sess_1").await;
    response.assert_status(StatusCode::NOT_FOUND);
}

/// A delete that stops part way reports DB_002 and can be retried
#[tokio::test]
async fn test_partial_delete() {
    let ctx = TestContext::new();
    let server = ctx.server();
    session_with_events(&server, "sess_1", 3).await;

    ctx.store.fail_deletes_after(2);
    let response = server.delete("/sessions/sess_1").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DB_002");
    assert_eq!(body["details"][0], "removed 2 of 4 items");
    assert_eq!(ctx.item_count(), 2);

    // Events go first, so the session itself is still readable
    server.get("/sessions/sess_1").await.assert_status_ok();
    let audit: serde_json::Value = server.get("/sessions/sess_1/audit").await.json();
    assert_eq!(audit["eventCount"], 1);

    ctx.store.clear_failures();
    let body: serde_json::Value = server.delete("/sessions/sess_1").await.json();
    assert_eq!(body["deleted"], 2);
    assert_eq!(ctx.item_count(), 0);
}

/// An unreachable store surfaces as DB_001 and an unhealthy report
#[tokio::test]
async fn test_store_outage() {
    let ctx = TestContext::new();
    let server = ctx.server();
    session_with_events(&server, "sess_1", 1).await;

    ctx.store.set_unavailable(true);

    let response = server.get("/sessions/sess_1").await;
    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DB_001");

    let report: serde_json::Value = server
        .post("/track/batch")
        .json(&fixtures::batch(fixtures::track_many("sess_1", "click", 2)))
        .await
        .json();
    assert_eq!(report["failed"], 2);
    assert_eq!(report["errors"][0]["code"], "DB_001");

    let response = server.get("/health").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "unhealthy");
    assert_eq!(body["storeConnected"], false);
    server
        .get("/health/ready")
        .await
        .assert_status(StatusCode::SERVICE_UNAVAILABLE);

    ctx.store.clear_failures();
    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["storeConnected"], true);
    server.get("/health/ready").await.assert_status_ok();
}

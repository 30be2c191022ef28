//! Single and batch tracking over HTTP.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};
use session_engine::IngestConfig;

async fn create_session(server: &TestServer, session_id: &str) {
    server
        .post("/sessions")
        .json(&fixtures::session(session_id))
        .await
        .assert_status(StatusCode::CREATED);
}

async fn steps_taken(server: &TestServer, session_id: &str) -> u64 {
    let body: serde_json::Value = server.get(&format!("/sessions/{}", session_id)).await.json();
    body["stepsTaken"].as_u64().unwrap()
}

/// Tracking writes the event and counts the step
#[tokio::test]
async fn test_track_counts_step() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    let response = server
        .post("/track")
        .add_header("User-Agent", "tracker-test/1.0")
        .json(&fixtures::track("sess_1", "quiz_start"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let event: serde_json::Value = response.json();
    assert_eq!(event["eventType"], "quiz_start");
    assert_eq!(event["userAgent"], "tracker-test/1.0");

    assert_eq!(steps_taken(&server, "sess_1").await, 1);
    assert_eq!(ctx.item_count(), 2);
}

/// Tracking into a missing session writes nothing
#[tokio::test]
async fn test_track_missing_session_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/track")
        .json(&fixtures::track("ghost", "click"))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND_001");
    assert_eq!(ctx.item_count(), 0);

    let response = server.post("/track").json(&fixtures::track("", "click")).await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field"], "sessionId");
}

/// A failed counter bump does not fail the tracked event
#[tokio::test]
async fn test_counter_failure_is_best_effort() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    ctx.store.set_fail_increments(true);
    server
        .post("/track")
        .json(&fixtures::track("sess_1", "click"))
        .await
        .assert_status(StatusCode::CREATED);
    ctx.store.clear_failures();

    assert_eq!(steps_taken(&server, "sess_1").await, 0);
    let body: serde_json::Value = server.get("/sessions/sess_1/events").await.json();
    assert_eq!(body["count"], 1);

    let audit: serde_json::Value = server.get("/sessions/sess_1/audit").await.json();
    assert_eq!(audit["stepDrift"], -1);
}

/// 26 items are rejected before anything is written
#[tokio::test]
async fn test_oversized_batch_rejected_without_writes() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    let response = server
        .post("/track/batch")
        .json(&fixtures::batch(fixtures::track_many("sess_1", "click", 26)))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");

    assert_eq!(ctx.item_count(), 1);
    assert_eq!(steps_taken(&server, "sess_1").await, 0);

    let response = server
        .post("/track/batch")
        .json(&fixtures::batch(vec![]))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_002");
}

/// 25 items is the largest accepted batch
#[tokio::test]
async fn test_full_batch_accepted() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    let response = server
        .post("/track/batch")
        .json(&fixtures::batch(fixtures::track_many("sess_1", "scroll", 25)))
        .await;
    response.assert_status_ok();
    let report: serde_json::Value = response.json();
    assert_eq!(report["total"], 25);
    assert_eq!(report["successful"], 25);
    assert_eq!(report["failed"], 0);

    let body: serde_json::Value = server.get("/sessions/sess_1/events").await.json();
    assert_eq!(body["count"], 25);
    assert_eq!(steps_taken(&server, "sess_1").await, 25);
}

/// One bad item fails alone and is reported by its input index
#[tokio::test]
async fn test_batch_partial_success() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    let mut events = fixtures::track_many("sess_1", "click", 5);
    events[2] = fixtures::track("sess_1", "not_a_type");

    let response = server.post("/track/batch").json(&fixtures::batch(events)).await;
    response.assert_status_ok();
    let report: serde_json::Value = response.json();
    assert_eq!(report["total"], 5);
    assert_eq!(report["successful"], 4);
    assert_eq!(report["failed"], 1);
    assert_eq!(report["errors"][0]["index"], 2);
    assert_eq!(report["errors"][0]["code"], "VALID_003");

    let mut indexes: Vec<u64> = report["results"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["index"].as_u64().unwrap())
        .collect();
    indexes.sort();
    assert_eq!(indexes, vec![0, 1, 3, 4]);

    assert_eq!(steps_taken(&server, "sess_1").await, 4);
}

/// Items for different sessions succeed or fail independently
#[tokio::test]
async fn test_batch_mixed_sessions() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_a").await;
    create_session(&server, "sess_b").await;

    let events = vec![
        fixtures::track("sess_a", "landing"),
        fixtures::track("ghost", "landing"),
        fixtures::track("sess_b", "landing"),
    ];
    let report: serde_json::Value = server
        .post("/track/batch")
        .json(&fixtures::batch(events))
        .await
        .json();
    assert_eq!(report["successful"], 2);
    assert_eq!(report["errors"][0]["index"], 1);
    assert_eq!(report["errors"][0]["sessionId"], "ghost");
    assert_eq!(report["errors"][0]["code"], "NOT_FOUND_001");

    assert_eq!(steps_taken(&server, "sess_a").await, 1);
    assert_eq!(steps_taken(&server, "sess_b").await, 1);
}

/// A lower configured cap is enforced
#[tokio::test]
async fn test_configured_batch_cap() {
    let ctx = TestContext::with_config(IngestConfig {
        max_batch_size: 3,
        window_size: 2,
    });
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    let response = server
        .post("/track/batch")
        .json(&fixtures::batch(fixtures::track_many("sess_1", "click", 4)))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);

    let report: serde_json::Value = server
        .post("/track/batch")
        .json(&fixtures::batch(fixtures::track_many("sess_1", "click", 3)))
        .await
        .json();
    assert_eq!(report["successful"], 3);
}

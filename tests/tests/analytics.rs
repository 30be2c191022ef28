//! Timelines, analytics, and partition audits over HTTP.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup::TestContext};

async fn create_session(server: &TestServer, session_id: &str) {
    server
        .post("/sessions")
        .json(&fixtures::session(session_id))
        .await
        .assert_status(StatusCode::CREATED);
}

async fn track(server: &TestServer, session_id: &str, event_type: &str) {
    server
        .post("/track")
        .json(&fixtures::track(session_id, event_type))
        .await
        .assert_status(StatusCode::CREATED);
}

/// Landing then checkout_complete two minutes later
#[tokio::test]
async fn test_analytics_landing_to_conversion() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    track(&server, "sess_1", "landing").await;
    ctx.advance_secs(120);
    track(&server, "sess_1", "checkout_complete").await;

    let response = server.get("/sessions/sess_1/analytics").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();

    assert_eq!(body["sessionId"], "sess_1");
    assert_eq!(body["status"], "active");
    assert_eq!(body["stepsTaken"], 2);
    assert_eq!(body["eventCount"], 2);
    assert_eq!(body["duration"], 120);
    assert_eq!(body["firstEventAt"], "2026-01-01T00:00:00Z");
    assert_eq!(body["lastEventAt"], "2026-01-01T00:02:00Z");
    assert_eq!(
        body["eventBreakdown"],
        serde_json::json!({ "landing": 1, "checkout_complete": 1 })
    );
    assert_eq!(
        body["conversionFunnel"],
        serde_json::json!({
            "landed": true,
            "engaged": false,
            "startedCheckout": false,
            "converted": true
        })
    );
}

/// Engagement comes from click, page_view, or quiz_start
#[tokio::test]
async fn test_analytics_breakdown_and_engagement() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    for event_type in ["page_view", "click", "click", "checkout_start"] {
        track(&server, "sess_1", event_type).await;
        ctx.advance_secs(1);
    }

    let body: serde_json::Value = server.get("/sessions/sess_1/analytics").await.json();
    assert_eq!(body["eventCount"], 4);
    assert_eq!(body["duration"], 3);
    assert_eq!(body["eventBreakdown"]["click"], 2);
    assert_eq!(body["eventBreakdown"]["page_view"], 1);
    assert_eq!(body["conversionFunnel"]["landed"], false);
    assert_eq!(body["conversionFunnel"]["engaged"], true);
    assert_eq!(body["conversionFunnel"]["startedCheckout"], true);
    assert_eq!(body["conversionFunnel"]["converted"], false);
}

/// A session without events has zero duration and no event bounds
#[tokio::test]
async fn test_analytics_without_events() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    let body: serde_json::Value = server.get("/sessions/sess_1/analytics").await.json();
    assert_eq!(body["eventCount"], 0);
    assert_eq!(body["duration"], 0);
    assert!(body.get("firstEventAt").is_none());
    assert_eq!(body["eventBreakdown"], serde_json::json!({}));

    track(&server, "sess_1", "landing").await;
    let body: serde_json::Value = server.get("/sessions/sess_1/analytics").await.json();
    assert_eq!(body["duration"], 0);
    assert_eq!(body["firstEventAt"], body["lastEventAt"]);
}

/// The timeline is the session plus its events, oldest first
#[tokio::test]
async fn test_timeline() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;

    for event_type in ["landing", "quiz_start", "quiz_answer", "quiz_complete"] {
        track(&server, "sess_1", event_type).await;
        ctx.advance_secs(30);
    }

    let response = server.get("/sessions/sess_1/timeline").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["session"]["sessionId"], "sess_1");
    assert_eq!(body["session"]["stepsTaken"], 4);
    assert_eq!(body["eventCount"], 4);

    let types: Vec<&str> = body["events"]
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["eventType"].as_str().unwrap())
        .collect();
    assert_eq!(types, vec!["landing", "quiz_start", "quiz_answer", "quiz_complete"]);
}

/// Derived views need the session metadata
#[tokio::test]
async fn test_views_of_missing_session_return_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for view in ["timeline", "analytics", "audit"] {
        let response = server.get(&format!("/sessions/ghost/{}", view)).await;
        response.assert_status(StatusCode::NOT_FOUND);
        let body: serde_json::Value = response.json();
        assert_eq!(body["code"], "NOT_FOUND_001");
    }
}

/// Audits report orphaned events and step-counter drift
#[tokio::test]
async fn test_audit() {
    let ctx = TestContext::new();
    let server = ctx.server();
    create_session(&server, "sess_1").await;
    track(&server, "sess_1", "landing").await;

    let body: serde_json::Value = server.get("/sessions/sess_1/audit").await.json();
    assert_eq!(body["hasMetadata"], true);
    assert_eq!(body["eventCount"], 1);
    assert_eq!(body["stepsTaken"], 1);
    assert_eq!(body["orphaned"], false);
    assert_eq!(body["stepDrift"], 0);

    // Direct creation writes the event without counting it
    server
        .post("/sessions/sess_1/events")
        .json(&fixtures::event("click"))
        .await
        .assert_status(StatusCode::CREATED);
    let body: serde_json::Value = server.get("/sessions/sess_1/audit").await.json();
    assert_eq!(body["stepDrift"], -1);

    server
        .post("/sessions/ghost/events")
        .json(&fixtures::event("click"))
        .await
        .assert_status(StatusCode::CREATED);
    let body: serde_json::Value = server.get("/sessions/ghost/audit").await.json();
    assert_eq!(body["hasMetadata"], false);
    assert_eq!(body["orphaned"], true);
    assert_eq!(body["eventCount"], 1);
    assert!(body.get("stepDrift").is_none());

    server
        .get("/sessions/ghost/timeline")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

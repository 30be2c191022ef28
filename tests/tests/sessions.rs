//! Session lifecycle and sessions-by-user listing over HTTP.

use axum::http::StatusCode;
use integration_tests::{fixtures, setup::TestContext};

/// Create, read, update, and read back a session
#[tokio::test]
async fn test_session_lifecycle() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/sessions")
        .json(&fixtures::session_for_user("sess_1", "ada@example.com"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let created: serde_json::Value = response.json();
    assert_eq!(created["sessionId"], "sess_1");
    assert_eq!(created["externalId"], "ada@example.com");
    assert_eq!(created["status"], "active");
    assert_eq!(created["stepsTaken"], 0);
    assert_eq!(created["createdAt"], created["updatedAt"]);

    let response = server.get("/sessions/sess_1").await;
    response.assert_status_ok();
    let fetched: serde_json::Value = response.json();
    assert_eq!(fetched, created);

    ctx.advance_secs(10);
    let response = server
        .patch("/sessions/sess_1")
        .json(&serde_json::json!({ "status": "completed", "metadata": { "plan": "pro" } }))
        .await;
    response.assert_status_ok();
    let updated: serde_json::Value = response.json();
    assert_eq!(updated["status"], "completed");
    assert_eq!(updated["metadata"]["plan"], "pro");
    assert_eq!(updated["createdAt"], created["createdAt"]);
    assert_ne!(updated["updatedAt"], created["updatedAt"]);
    // Untouched fields survive a partial update
    assert_eq!(updated["externalId"], "ada@example.com");
    assert_eq!(updated["userAgent"], "Mozilla/5.0 (Test)");

    let fetched: serde_json::Value = server.get("/sessions/sess_1").await.json();
    assert_eq!(fetched, updated);
}

/// Unknown session returns NOT_FOUND_001
#[tokio::test]
async fn test_get_missing_session_returns_404() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server.get("/sessions/nope").await;
    response.assert_status(StatusCode::NOT_FOUND);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NOT_FOUND_001");

    let response = server
        .patch("/sessions/nope")
        .json(&serde_json::json!({ "status": "completed" }))
        .await;
    response.assert_status(StatusCode::NOT_FOUND);
}

/// Creating twice with the same id overwrites the first session
#[tokio::test]
async fn test_create_overwrites_existing_session() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server
        .post("/sessions")
        .json(&fixtures::session_for_user("sess_1", "a@example.com"))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/sessions")
        .json(&fixtures::session("sess_1"))
        .await
        .assert_status(StatusCode::CREATED);

    let body: serde_json::Value = server.get("/sessions/sess_1").await.json();
    assert!(body.get("externalId").is_none());
    assert_eq!(ctx.item_count(), 1);
}

/// Invalid bodies name the offending field
#[tokio::test]
async fn test_validation_errors_name_field() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/sessions")
        .json(&serde_json::json!({ "sessionId": "" }))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "VALID_001");
    assert_eq!(body["field"], "sessionId");

    let response = server
        .post("/sessions")
        .content_type("application/json")
        .bytes("{not json".into())
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field"], "body");

    server
        .post("/sessions")
        .json(&fixtures::session("sess_1"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server
        .patch("/sessions/sess_1")
        .json(&serde_json::json!({}))
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field"], "body");
    assert_eq!(ctx.item_count(), 1);
}

/// Transport headers fill in user agent and client IP
#[tokio::test]
async fn test_client_context_from_headers() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/sessions")
        .add_header("User-Agent", "curl/8.0")
        .add_header("X-Forwarded-For", "198.51.100.1, 10.0.0.1")
        .json(&fixtures::session("sess_1"))
        .await;
    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["userAgent"], "curl/8.0");
    assert_eq!(body["ipAddress"], "198.51.100.1");

    // Body fields win over headers
    let response = server
        .post("/sessions")
        .add_header("X-Real-IP", "192.0.2.1")
        .json(&fixtures::session_for_user("sess_2", "a@example.com"))
        .await;
    let body: serde_json::Value = response.json();
    assert_eq!(body["ipAddress"], "203.0.113.7");
}

/// Sessions by user come back oldest first and honor the limit
#[tokio::test]
async fn test_list_sessions_by_user() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for id in ["sess_a", "sess_b", "sess_c"] {
        server
            .post("/sessions")
            .json(&fixtures::session_for_user(id, "ada@example.com"))
            .await
            .assert_status(StatusCode::CREATED);
        ctx.advance_secs(60);
    }
    server
        .post("/sessions")
        .json(&fixtures::session_for_user("sess_other", "bob@example.com"))
        .await
        .assert_status(StatusCode::CREATED);
    server
        .post("/sessions")
        .json(&fixtures::session("sess_anon"))
        .await
        .assert_status(StatusCode::CREATED);

    let response = server.get("/users/ada@example.com/sessions").await;
    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    assert_eq!(body["externalId"], "ada@example.com");
    assert_eq!(body["count"], 3);
    let ids: Vec<&str> = body["sessions"]
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["sessionId"].as_str().unwrap())
        .collect();
    assert_eq!(ids, vec!["sess_a", "sess_b", "sess_c"]);

    let body: serde_json::Value = server
        .get("/users/ada@example.com/sessions")
        .add_query_param("limit", 1)
        .await
        .json();
    assert_eq!(body["count"], 1);
    assert_eq!(body["sessions"][0]["sessionId"], "sess_a");

    let body: serde_json::Value = server.get("/users/nobody@example.com/sessions").await.json();
    assert_eq!(body["count"], 0);

    let response = server
        .get("/users/ada@example.com/sessions")
        .add_query_param("limit", "many")
        .await;
    response.assert_status(StatusCode::BAD_REQUEST);
    let body: serde_json::Value = response.json();
    assert_eq!(body["field"], "limit");
}

/// Changing the external id moves the session between user listings
#[tokio::test]
async fn test_external_id_change_moves_listing() {
    let ctx = TestContext::new();
    let server = ctx.server();

    server
        .post("/sessions")
        .json(&fixtures::session("sess_1"))
        .await
        .assert_status(StatusCode::CREATED);

    server
        .patch("/sessions/sess_1")
        .json(&serde_json::json!({ "externalId": "ada@example.com" }))
        .await
        .assert_status_ok();
    let body: serde_json::Value = server.get("/users/ada@example.com/sessions").await.json();
    assert_eq!(body["count"], 1);

    server
        .patch("/sessions/sess_1")
        .json(&serde_json::json!({ "externalId": "grace@example.com" }))
        .await
        .assert_status_ok();
    let body: serde_json::Value = server.get("/users/ada@example.com/sessions").await.json();
    assert_eq!(body["count"], 0);
    let body: serde_json::Value = server.get("/users/grace@example.com/sessions").await.json();
    assert_eq!(body["sessions"][0]["sessionId"], "sess_1");
}

//! Request body builders.

use serde_json::{json, Value};

/// Session creation body.
pub fn session(session_id: &str) -> Value {
    json!({
        "sessionId": session_id,
        "metadata": { "source": "integration" }
    })
}

/// Session creation body linked to a user.
pub fn session_for_user(session_id: &str, external_id: &str) -> Value {
    json!({
        "sessionId": session_id,
        "externalId": external_id,
        "userAgent": "Mozilla/5.0 (Test)",
        "ipAddress": "203.0.113.7"
    })
}

/// Event body for `POST /sessions/:id/events`.
pub fn event(event_type: &str) -> Value {
    json!({
        "eventType": event_type,
        "eventData": { "path": "/test" }
    })
}

/// Tracking body for `POST /track` or one batch item.
pub fn track(session_id: &str, event_type: &str) -> Value {
    json!({
        "sessionId": session_id,
        "eventType": event_type,
        "eventData": { "path": "/test" }
    })
}

/// `n` tracking items of one type for one session.
pub fn track_many(session_id: &str, event_type: &str, n: usize) -> Vec<Value> {
    (0..n).map(|_| track(session_id, event_type)).collect()
}

/// Batch tracking body.
pub fn batch(events: Vec<Value>) -> Value {
    json!({ "events": events })
}

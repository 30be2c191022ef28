//! Session handling types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::events::Payload;

/// Lifecycle state of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    #[default]
    Active,
    Completed,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
        }
    }
}

/// One tracked user visit.
///
/// `session_id`, `user_agent`, `ip_address` and `created_at` never change
/// after creation. `steps_taken` is a best-effort count of recorded events:
/// the event write and the counter bump are independent operations, so the
/// value can drift from the real number of events under concurrency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_id: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub steps_taken: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// Caller-owned, never interpreted.
    #[serde(default)]
    pub metadata: Payload,
}

impl Session {
    /// Creates a new active session from a creation request.
    ///
    /// Request-supplied user agent and IP win over the transport context.
    pub fn new(request: CreateSession, context: &ClientContext, now: DateTime<Utc>) -> Self {
        Self {
            session_id: request.session_id,
            external_id: request.external_id,
            status: SessionStatus::Active,
            steps_taken: 0,
            user_agent: request.user_agent.or_else(|| context.user_agent.clone()),
            ip_address: request.ip_address.or_else(|| context.ip_address.clone()),
            created_at: now,
            updated_at: now,
            metadata: request.metadata,
        }
    }
}

/// Session creation request.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateSession {
    /// Caller-supplied, globally unique
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    /// Links the session to a user (e.g. an email)
    #[validate(length(min = 1, max = 256))]
    pub external_id: Option<String>,
    #[serde(default)]
    #[validate(custom(function = "crate::schema::validate_payload_size"))]
    pub metadata: Payload,
    #[validate(length(max = 512))]
    pub user_agent: Option<String>,
    #[validate(length(max = 45))]
    pub ip_address: Option<String>,
}

/// Partial session update. Only these fields can change.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SessionUpdate {
    #[validate(length(min = 1, max = 256))]
    pub external_id: Option<String>,
    pub status: Option<SessionStatus>,
    #[validate(custom(function = "crate::schema::validate_payload_size"))]
    pub metadata: Option<Payload>,
    pub steps_taken: Option<u64>,
}

impl SessionUpdate {
    /// True when no allow-listed field is present.
    pub fn is_empty(&self) -> bool {
        self.external_id.is_none()
            && self.status.is_none()
            && self.metadata.is_none()
            && self.steps_taken.is_none()
    }
}

/// Transport-level facts about the originating request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientContext {
    pub user_agent: Option<String>,
    pub ip_address: Option<String>,
}

impl ClientContext {
    pub fn new(user_agent: Option<String>, ip_address: Option<String>) -> Self {
        Self {
            user_agent,
            ip_address,
        }
    }
}

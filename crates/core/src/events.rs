//! Event type definitions for the session tracker.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::{Error, ValidationErrorCode};

/// Caller-controlled structured payload (`metadata`, `eventData`).
///
/// Stored and returned as-is; the engine never looks inside.
pub type Payload = serde_json::Map<String, serde_json::Value>;

/// All supported event types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Landing,
    PageView,
    Click,
    Scroll,
    FormSubmit,
    QuizStart,
    QuizAnswer,
    QuizComplete,
    CheckoutStart,
    CheckoutComplete,
    Custom,
}

impl EventType {
    pub const ALL: [EventType; 11] = [
        Self::Landing,
        Self::PageView,
        Self::Click,
        Self::Scroll,
        Self::FormSubmit,
        Self::QuizStart,
        Self::QuizAnswer,
        Self::QuizComplete,
        Self::CheckoutStart,
        Self::CheckoutComplete,
        Self::Custom,
    ];

    /// Returns the string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Landing => "landing",
            Self::PageView => "page_view",
            Self::Click => "click",
            Self::Scroll => "scroll",
            Self::FormSubmit => "form_submit",
            Self::QuizStart => "quiz_start",
            Self::QuizAnswer => "quiz_answer",
            Self::QuizComplete => "quiz_complete",
            Self::CheckoutStart => "checkout_start",
            Self::CheckoutComplete => "checkout_complete",
            Self::Custom => "custom",
        }
    }

    /// Types that count as engagement in the conversion funnel.
    pub fn is_engagement(&self) -> bool {
        matches!(self, Self::Click | Self::PageView | Self::QuizStart)
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| {
                Error::validation_code(
                    ValidationErrorCode::InvalidEventType,
                    "eventType",
                    format!("unknown event type '{}'", s),
                )
            })
    }
}

/// One typed, timestamped action inside a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique within the owning session
    pub event_id: String,
    pub session_id: String,
    pub event_type: EventType,
    #[serde(default)]
    pub event_data: Payload,
    /// Creation time; primary component of the event's sort key
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
}

/// Event tracking request, single or as a batch item.
///
/// `event_type` stays a string here so one bad item in a batch is reported
/// against its index instead of failing the whole request body.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct TrackEvent {
    #[serde(default)]
    #[validate(length(min = 1, max = 128))]
    pub session_id: String,
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    #[validate(custom(function = "crate::schema::validate_payload_size"))]
    pub event_data: Payload,
}

/// Event creation body for an already-known session.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateEvent {
    #[serde(default)]
    pub event_type: String,
    #[serde(default)]
    #[validate(custom(function = "crate::schema::validate_payload_size"))]
    pub event_data: Payload,
}

/// Partial event update.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EventUpdate {
    /// Re-validated against the enumeration when present
    pub event_type: Option<String>,
    #[validate(custom(function = "crate::schema::validate_payload_size"))]
    pub event_data: Option<Payload>,
}

impl EventUpdate {
    pub fn is_empty(&self) -> bool {
        self.event_type.is_none() && self.event_data.is_none()
    }
}

/// Batch of tracking requests.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrackBatch {
    #[serde(default)]
    pub events: Vec<TrackEvent>,
}

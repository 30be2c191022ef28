//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use telemetry::{metrics, ComponentHealthReport, MetricsSnapshot};
use tracker_core::{Error, Event, Session};

/// Result of a cascading session delete.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResponse {
    pub session_id: String,
    /// Items removed: the metadata item plus every event
    pub deleted: usize,
}

/// Sessions linked to one user, oldest first.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionList {
    pub external_id: String,
    pub sessions: Vec<Session>,
    pub count: usize,
}

/// Events of one session, oldest first.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    pub session_id: String,
    pub events: Vec<Event>,
    pub count: usize,
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
    pub components: Vec<ComponentHealthReport>,
    pub metrics: MetricsSnapshot,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
    /// Offending request field, for validation errors
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<String>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
            field: None,
            details: None,
        }
    }

    pub fn with_field(mut self, field: impl Into<String>) -> Self {
        self.field = Some(field.into());
        self
    }

    pub fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = Some(details);
        self
    }
}

/// API error carrying the status and body to send.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    /// Malformed request body or parameter.
    pub fn bad_request(field: impl Into<String>, msg: impl Into<String>) -> Self {
        Error::validation(field, msg).into()
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        let response = match &err {
            Error::Validation { field, message, .. } => {
                metrics().validation_failures.inc();
                ErrorResponse::new(message.clone(), err.error_code()).with_field(field.clone())
            }
            Error::PartialDelete {
                deleted, total, ..
            } => ErrorResponse::new(err.to_string(), err.error_code())
                .with_details(vec![format!("removed {} of {} items", deleted, total)]),
            _ => ErrorResponse::new(err.to_string(), err.error_code()),
        };

        Self { status, response }
    }
}

//! Derived session views.

use axum::{
    extract::{Path, State},
    Json,
};
use tracker_core::{PartitionAudit, SessionAnalytics, SessionTimeline};

use crate::response::ApiError;
use crate::state::AppState;

/// GET /sessions/:session_id/timeline
pub async fn timeline_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionTimeline>, ApiError> {
    Ok(Json(state.engine.get_timeline(&session_id).await?))
}

/// GET /sessions/:session_id/analytics
pub async fn analytics_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<SessionAnalytics>, ApiError> {
    Ok(Json(state.engine.get_analytics(&session_id).await?))
}

/// GET /sessions/:session_id/audit - orphaned events and counter drift.
pub async fn audit_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<PartitionAudit>, ApiError> {
    Ok(Json(state.engine.audit_session(&session_id).await?))
}

//! Session endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracker_core::{CreateSession, Session, SessionUpdate};

use crate::extractors::{ApiJson, LimitParam, RequestContext};
use crate::response::{ApiError, DeleteResponse, SessionList};
use crate::state::AppState;

/// POST /sessions
pub async fn create_handler(
    State(state): State<AppState>,
    RequestContext(context): RequestContext,
    ApiJson(request): ApiJson<CreateSession>,
) -> Result<(StatusCode, Json<Session>), ApiError> {
    let session = state.engine.create_session(request, &context).await?;
    Ok((StatusCode::CREATED, Json(session)))
}

/// GET /sessions/:session_id
pub async fn get_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.engine.get_session(&session_id).await?))
}

/// PATCH /sessions/:session_id
pub async fn update_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    ApiJson(update): ApiJson<SessionUpdate>,
) -> Result<Json<Session>, ApiError> {
    Ok(Json(state.engine.update_session(&session_id, update).await?))
}

/// DELETE /sessions/:session_id - removes the session and all its events.
pub async fn delete_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = state.engine.delete_session(&session_id).await?;
    Ok(Json(DeleteResponse {
        session_id,
        deleted,
    }))
}

/// GET /users/:external_id/sessions?limit=
pub async fn list_by_user_handler(
    State(state): State<AppState>,
    Path(external_id): Path<String>,
    Query(params): Query<LimitParam>,
) -> Result<Json<SessionList>, ApiError> {
    let sessions = state
        .engine
        .list_user_sessions(&external_id, params.parse()?)
        .await?;

    Ok(Json(SessionList {
        external_id,
        count: sessions.len(),
        sessions,
    }))
}

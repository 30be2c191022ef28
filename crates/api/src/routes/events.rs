//! Event endpoints. An event is addressed by session, id, and timestamp.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use tracker_core::{CreateEvent, Event, EventUpdate};

use crate::extractors::{ApiJson, RequestContext, TimestampParam};
use crate::response::{ApiError, EventList};
use crate::state::AppState;

/// POST /sessions/:session_id/events
///
/// Writes the event as given. Use `/track` to require an existing session
/// and count the step.
pub async fn create_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
    RequestContext(context): RequestContext,
    ApiJson(request): ApiJson<CreateEvent>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state
        .engine
        .create_event(&session_id, request, &context)
        .await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /sessions/:session_id/events
pub async fn list_handler(
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Json<EventList>, ApiError> {
    let events = state.engine.list_events(&session_id).await?;
    Ok(Json(EventList {
        session_id,
        count: events.len(),
        events,
    }))
}

/// GET /sessions/:session_id/events/:event_id?timestamp=
pub async fn get_handler(
    State(state): State<AppState>,
    Path((session_id, event_id)): Path<(String, String)>,
    Query(params): Query<TimestampParam>,
) -> Result<Json<Event>, ApiError> {
    let timestamp = params.parse()?;
    Ok(Json(
        state
            .engine
            .get_event(&session_id, &event_id, timestamp)
            .await?,
    ))
}

/// PATCH /sessions/:session_id/events/:event_id?timestamp=
pub async fn update_handler(
    State(state): State<AppState>,
    Path((session_id, event_id)): Path<(String, String)>,
    Query(params): Query<TimestampParam>,
    ApiJson(update): ApiJson<EventUpdate>,
) -> Result<Json<Event>, ApiError> {
    let timestamp = params.parse()?;
    Ok(Json(
        state
            .engine
            .update_event(&session_id, &event_id, timestamp, update)
            .await?,
    ))
}

/// DELETE /sessions/:session_id/events/:event_id?timestamp=
pub async fn delete_handler(
    State(state): State<AppState>,
    Path((session_id, event_id)): Path<(String, String)>,
    Query(params): Query<TimestampParam>,
) -> Result<StatusCode, ApiError> {
    let timestamp = params.parse()?;
    state
        .engine
        .delete_event(&session_id, &event_id, timestamp)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

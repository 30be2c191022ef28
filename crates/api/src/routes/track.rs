//! Tracking endpoints.

use axum::{extract::State, http::StatusCode, Json};
use tracker_core::{BatchReport, Event, TrackBatch, TrackEvent};
use tracing::debug;

use crate::extractors::{ApiJson, RequestContext};
use crate::response::ApiError;
use crate::state::AppState;

/// POST /track - records one event for an existing session.
pub async fn track_handler(
    State(state): State<AppState>,
    RequestContext(context): RequestContext,
    ApiJson(request): ApiJson<TrackEvent>,
) -> Result<(StatusCode, Json<Event>), ApiError> {
    let event = state.engine.track_event(request, &context).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// POST /track/batch - up to 25 events, partial success reported per item.
pub async fn batch_handler(
    State(state): State<AppState>,
    RequestContext(context): RequestContext,
    ApiJson(batch): ApiJson<TrackBatch>,
) -> Result<Json<BatchReport>, ApiError> {
    debug!(events = batch.events.len(), "Received event batch");
    Ok(Json(state.engine.track_batch(batch, &context).await?))
}

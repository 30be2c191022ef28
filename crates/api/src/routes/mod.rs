//! API routes.

pub mod events;
pub mod health;
pub mod sessions;
pub mod timeline;
pub mod track;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::middleware::metrics::track_requests;
use crate::state::AppState;

/// Creates the API router.
pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/sessions", post(sessions::create_handler))
        .route(
            "/sessions/:session_id",
            get(sessions::get_handler)
                .patch(sessions::update_handler)
                .delete(sessions::delete_handler),
        )
        .route(
            "/users/:external_id/sessions",
            get(sessions::list_by_user_handler),
        )
        .route(
            "/sessions/:session_id/events",
            post(events::create_handler).get(events::list_handler),
        )
        .route(
            "/sessions/:session_id/events/:event_id",
            get(events::get_handler)
                .patch(events::update_handler)
                .delete(events::delete_handler),
        )
        .route("/track", post(track::track_handler))
        .route("/track/batch", post(track::batch_handler))
        .route("/sessions/:session_id/timeline", get(timeline::timeline_handler))
        .route("/sessions/:session_id/analytics", get(timeline::analytics_handler))
        .route("/sessions/:session_id/audit", get(timeline::audit_handler))
        .route("/health", get(health::health_handler))
        .route("/health/ready", get(health::ready_handler))
        .route("/health/live", get(health::live_handler))
        .layer(middleware::from_fn(track_requests))
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

//! Request accounting.

use std::time::Instant;

use axum::{extract::Request, middleware::Next, response::Response};
use telemetry::metrics;
use tracing::warn;

/// Tracks in-flight requests and request latency.
pub async fn track_requests(request: Request, next: Next) -> Response {
    let m = metrics();
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    m.active_requests.inc();
    let response = next.run(request).await;
    m.active_requests.dec();

    m.request_latency_ms
        .observe(start.elapsed().as_millis() as u64);

    if response.status().is_server_error() {
        warn!(
            method = %method,
            path = %path,
            status = response.status().as_u16(),
            "Request failed"
        );
    }
    response
}

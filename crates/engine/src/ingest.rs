//! Event tracking, single and batched.

use std::time::Instant;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use telemetry::metrics;
use tracing::{debug, info};
use tracker_core::limits::{BATCH_WINDOW_SIZE, MAX_BATCH_EVENTS};
use tracker_core::schema::{validate_batch_len, validate_request};
use tracker_core::{
    BatchItemError, BatchItemResult, BatchReport, ClientContext, CreateEvent, Event, EventType,
    Result, TrackBatch, TrackEvent,
};

use crate::events::EventStore;
use crate::sessions::SessionStore;

/// Batch tracking limits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct IngestConfig {
    /// Largest accepted batch, at most 25
    #[serde(default = "default_max_batch_size")]
    pub max_batch_size: usize,
    /// Items tracked concurrently within a batch, at most 5
    #[serde(default = "default_window_size")]
    pub window_size: usize,
}

fn default_max_batch_size() -> usize {
    MAX_BATCH_EVENTS
}

fn default_window_size() -> usize {
    BATCH_WINDOW_SIZE
}

impl IngestConfig {
    /// Window size actually used: at least 1, at most [`BATCH_WINDOW_SIZE`].
    pub fn effective_window_size(&self) -> usize {
        self.window_size.clamp(1, BATCH_WINDOW_SIZE)
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            max_batch_size: default_max_batch_size(),
            window_size: default_window_size(),
        }
    }
}

#[derive(Clone)]
pub struct Ingestor {
    sessions: SessionStore,
    events: EventStore,
    config: IngestConfig,
}

impl Ingestor {
    pub fn new(sessions: SessionStore, events: EventStore, config: IngestConfig) -> Self {
        Self {
            sessions,
            events,
            config,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Records an event for an existing session and bumps its step counter.
    ///
    /// The counter bump is best-effort: once the event is written, a failed
    /// bump is logged and the event is still returned.
    pub async fn track_event(&self, request: TrackEvent, context: &ClientContext) -> Result<Event> {
        validate_request(&request)?;
        request.event_type.parse::<EventType>()?;

        self.sessions.require(&request.session_id).await?;

        let event = self
            .events
            .create(
                &request.session_id,
                CreateEvent {
                    event_type: request.event_type,
                    event_data: request.event_data,
                },
                context,
            )
            .await?;

        self.sessions
            .adjust_steps_best_effort(&request.session_id, 1)
            .await;

        metrics().events_tracked.inc();
        Ok(event)
    }

    /// Tracks every item of a batch, `window_size` at a time.
    ///
    /// Only an empty or oversized batch fails as a whole, and it fails
    /// before anything is written. Item failures are reported by input
    /// index and never affect their siblings.
    pub async fn track_batch(&self, batch: TrackBatch, context: &ClientContext) -> Result<BatchReport> {
        validate_batch_len(batch.events.len(), self.config.max_batch_size)?;

        let start = Instant::now();
        metrics().batches_received.inc();

        let total = batch.events.len();
        let mut report = BatchReport {
            total,
            ..Default::default()
        };

        let window_size = self.config.effective_window_size();
        let indexed: Vec<_> = batch.events.into_iter().enumerate().collect();

        for window in indexed.chunks(window_size) {
            let outcomes = join_all(window.iter().cloned().map(|(index, request)| async move {
                let session_id = request.session_id.clone();
                (index, session_id, self.track_event(request, context).await)
            }))
            .await;

            for (index, session_id, outcome) in outcomes {
                match outcome {
                    Ok(event) => report.results.push(BatchItemResult { index, event }),
                    Err(e) => {
                        debug!(index, session_id = %session_id, error = %e, "Batch item failed");
                        report.errors.push(BatchItemError {
                            index,
                            session_id,
                            code: e.error_code().to_string(),
                            error: e.to_string(),
                        });
                    }
                }
            }
        }

        report.successful = report.results.len();
        report.failed = report.errors.len();

        let m = metrics();
        m.batch_items_failed.inc_by(report.failed as u64);
        m.batch_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        info!(
            total,
            successful = report.successful,
            failed = report.failed,
            "Batch tracked"
        );
        Ok(report)
    }
}

//! Derived views: timelines, analytics, batch reports, partition audits.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::{Event, EventType};
use crate::session::{Session, SessionStatus};

/// A session with all of its events in ascending timestamp order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionTimeline {
    pub session: Session,
    pub events: Vec<Event>,
    pub event_count: usize,
}

/// Funnel stages. Each is a presence check on its own; a later stage does
/// not require an earlier one, nor any temporal order between them.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionFunnel {
    pub landed: bool,
    pub engaged: bool,
    pub started_checkout: bool,
    pub converted: bool,
}

impl ConversionFunnel {
    /// Evaluates every stage against the observed event types.
    pub fn from_events<'a>(events: impl IntoIterator<Item = &'a Event>) -> Self {
        events
            .into_iter()
            .fold(Self::default(), |mut funnel, event| {
                match event.event_type {
                    EventType::Landing => funnel.landed = true,
                    EventType::CheckoutStart => funnel.started_checkout = true,
                    EventType::CheckoutComplete => funnel.converted = true,
                    t if t.is_engagement() => funnel.engaged = true,
                    _ => {}
                }
                funnel
            })
    }
}

/// Derived metrics for one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionAnalytics {
    pub session_id: String,
    pub status: SessionStatus,
    pub steps_taken: u64,
    pub event_count: usize,
    /// Whole seconds between first and last event; 0 with fewer than 2 events
    pub duration: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_event_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_event_at: Option<DateTime<Utc>>,
    /// Count per observed event type
    pub event_breakdown: BTreeMap<String, u64>,
    pub conversion_funnel: ConversionFunnel,
}

impl SessionAnalytics {
    /// Computes analytics from a session and its events.
    ///
    /// `events` must be in ascending timestamp order.
    pub fn compute(session: &Session, events: &[Event]) -> Self {
        let first_event_at = events.first().map(|e| e.timestamp);
        let last_event_at = events.last().map(|e| e.timestamp);

        let duration = match (first_event_at, last_event_at) {
            (Some(first), Some(last)) if events.len() >= 2 => {
                (last - first).num_seconds().max(0)
            }
            _ => 0,
        };

        let mut event_breakdown = BTreeMap::new();
        for event in events {
            *event_breakdown
                .entry(event.event_type.as_str().to_string())
                .or_insert(0) += 1;
        }

        Self {
            session_id: session.session_id.clone(),
            status: session.status,
            steps_taken: session.steps_taken,
            event_count: events.len(),
            duration,
            first_event_at,
            last_event_at,
            event_breakdown,
            conversion_funnel: ConversionFunnel::from_events(events),
        }
    }
}

/// One successfully tracked batch item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemResult {
    /// Position in the submitted batch
    pub index: usize,
    pub event: Event,
}

/// One failed batch item.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchItemError {
    /// Position in the submitted batch
    pub index: usize,
    pub session_id: String,
    pub code: String,
    pub error: String,
}

/// Partial-success report for a batch-tracking call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<BatchItemResult>,
    pub errors: Vec<BatchItemError>,
}

/// Consistency check over one session partition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PartitionAudit {
    pub session_id: String,
    pub has_metadata: bool,
    pub event_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub steps_taken: Option<u64>,
    /// Events exist but the session metadata item does not
    pub orphaned: bool,
    /// `steps_taken - event_count` when the session exists
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_drift: Option<i64>,
}

impl PartitionAudit {
    pub fn is_consistent(&self) -> bool {
        !self.orphaned && self.step_drift.unwrap_or(0) == 0
    }
}

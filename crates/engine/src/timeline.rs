//! Timelines, analytics, and partition audits.
//!
//! All three read the whole session partition with one range query: the
//! events come back in chronological order and the metadata item last.

use std::sync::Arc;

use kv_store::{Item, KvStore, Query};
use tracing::warn;
use tracker_core::{
    Error, Event, PartitionAudit, Result, Session, SessionAnalytics, SessionTimeline,
};

use crate::codec::{decode_event, decode_session, item_type};
use crate::keys::{session_partition, EVENT_ITEM_TYPE, SESSION_ITEM_TYPE};

/// Everything stored under one session partition.
#[derive(Debug, Default)]
pub struct Partition {
    pub session: Option<Session>,
    /// Ascending timestamp order
    pub events: Vec<Event>,
}

#[derive(Clone)]
pub struct TimelineEngine {
    store: Arc<dyn KvStore>,
}

impl TimelineEngine {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self { store }
    }

    pub async fn read_partition(&self, session_id: &str) -> Result<Partition> {
        let items = self
            .store
            .query(&Query::new(session_partition(session_id)))
            .await?;

        let mut partition = Partition::default();
        for item in items {
            match item_type(&item) {
                Some(SESSION_ITEM_TYPE) => partition.session = Some(decode_session(item)?),
                Some(EVENT_ITEM_TYPE) => partition.events.push(decode_event(item)?),
                other => skip_unknown(session_id, other, &item),
            }
        }
        Ok(partition)
    }

    /// The session and its events. Orphaned events alone are `NotFound`.
    pub async fn get_timeline(&self, session_id: &str) -> Result<SessionTimeline> {
        let Partition { session, events } = self.read_partition(session_id).await?;
        let session = session.ok_or_else(|| Error::not_found("session", session_id))?;

        Ok(SessionTimeline {
            session,
            event_count: events.len(),
            events,
        })
    }

    pub async fn get_analytics(&self, session_id: &str) -> Result<SessionAnalytics> {
        let Partition { session, events } = self.read_partition(session_id).await?;
        let session = session.ok_or_else(|| Error::not_found("session", session_id))?;

        Ok(SessionAnalytics::compute(&session, &events))
    }

    /// Reports orphaned events and step-counter drift.
    pub async fn audit(&self, session_id: &str) -> Result<PartitionAudit> {
        let Partition { session, events } = self.read_partition(session_id).await?;
        if session.is_none() && events.is_empty() {
            return Err(Error::not_found("session", session_id));
        }

        let steps_taken = session.as_ref().map(|s| s.steps_taken);
        let audit = PartitionAudit {
            session_id: session_id.to_string(),
            has_metadata: session.is_some(),
            event_count: events.len(),
            steps_taken,
            orphaned: session.is_none(),
            step_drift: steps_taken.map(|steps| steps as i64 - events.len() as i64),
        };

        if !audit.is_consistent() {
            warn!(
                session_id = %session_id,
                orphaned = audit.orphaned,
                drift = ?audit.step_drift,
                "Session partition is inconsistent"
            );
        }
        Ok(audit)
    }
}

fn skip_unknown(session_id: &str, found: Option<&str>, item: &Item) {
    warn!(
        session_id = %session_id,
        item_type = ?found,
        sort_key = ?item.get_str(kv_store::SORT_KEY_ATTR),
        "Skipping unrecognized item in session partition"
    );
}

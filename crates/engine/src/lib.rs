//! Session and event storage engine.
//!
//! Maps sessions and their events onto one key-value table (see [`keys`]),
//! and builds timelines, analytics, and batch ingestion on top of it.
//! Nothing here spans items atomically: the step counter is approximate and
//! a cascading delete can stop part way.

pub mod clock;
pub mod codec;
pub mod events;
pub mod ingest;
pub mod keys;
pub mod sessions;
pub mod timeline;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kv_store::KvStore;
use tracing::info;
use tracker_core::limits::STORE_BATCH_WRITE_LIMIT;
use tracker_core::{
    BatchReport, ClientContext, CreateEvent, CreateSession, Event, EventUpdate, PartitionAudit,
    Result, Session, SessionAnalytics, SessionTimeline, SessionUpdate, TrackBatch, TrackEvent,
};

pub use clock::{Clock, ManualClock, SystemClock};
pub use events::EventStore;
pub use ingest::{IngestConfig, Ingestor};
pub use sessions::{CascadeState, SessionStore};
pub use timeline::{Partition, TimelineEngine};

/// Every engine operation over one shared store.
#[derive(Clone)]
pub struct SessionEngine {
    store: Arc<dyn KvStore>,
    sessions: SessionStore,
    events: EventStore,
    timeline: TimelineEngine,
    ingest: Ingestor,
}

impl SessionEngine {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock), IngestConfig::default())
    }

    pub fn with_clock(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, config: IngestConfig) -> Self {
        let sessions = SessionStore::new(store.clone(), clock.clone());
        let events = EventStore::new(store.clone(), clock, sessions.clone());
        let ingest = Ingestor::new(sessions.clone(), events.clone(), config);

        Self {
            timeline: TimelineEngine::new(store.clone()),
            store,
            sessions,
            events,
            ingest,
        }
    }

    pub fn store(&self) -> &Arc<dyn KvStore> {
        &self.store
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    pub fn events(&self) -> &EventStore {
        &self.events
    }

    pub fn timeline(&self) -> &TimelineEngine {
        &self.timeline
    }

    pub fn ingest(&self) -> &Ingestor {
        &self.ingest
    }

    // Sessions

    pub async fn create_session(
        &self,
        request: CreateSession,
        context: &ClientContext,
    ) -> Result<Session> {
        self.sessions.create(request, context).await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Session> {
        self.sessions.require(session_id).await
    }

    pub async fn update_session(&self, session_id: &str, update: SessionUpdate) -> Result<Session> {
        self.sessions.update(session_id, update).await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<usize> {
        self.sessions.delete_cascade(session_id).await
    }

    pub async fn list_user_sessions(
        &self,
        external_id: &str,
        limit: Option<usize>,
    ) -> Result<Vec<Session>> {
        self.sessions.list_by_user(external_id, limit).await
    }

    // Events

    pub async fn create_event(
        &self,
        session_id: &str,
        request: CreateEvent,
        context: &ClientContext,
    ) -> Result<Event> {
        self.events.create(session_id, request, context).await
    }

    pub async fn get_event(
        &self,
        session_id: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Event> {
        self.events
            .get(session_id, event_id, timestamp)
            .await?
            .ok_or_else(|| tracker_core::Error::not_found("event", event_id))
    }

    pub async fn list_events(&self, session_id: &str) -> Result<Vec<Event>> {
        self.events.list_by_session(session_id).await
    }

    pub async fn update_event(
        &self,
        session_id: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
        update: EventUpdate,
    ) -> Result<Event> {
        self.events
            .update(session_id, event_id, timestamp, update)
            .await
    }

    pub async fn delete_event(
        &self,
        session_id: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        self.events.delete(session_id, event_id, timestamp).await
    }

    // Tracking

    pub async fn track_event(&self, request: TrackEvent, context: &ClientContext) -> Result<Event> {
        self.ingest.track_event(request, context).await
    }

    pub async fn track_batch(&self, batch: TrackBatch, context: &ClientContext) -> Result<BatchReport> {
        self.ingest.track_batch(batch, context).await
    }

    // Derived views

    pub async fn get_timeline(&self, session_id: &str) -> Result<SessionTimeline> {
        self.timeline.get_timeline(session_id).await
    }

    pub async fn get_analytics(&self, session_id: &str) -> Result<SessionAnalytics> {
        self.timeline.get_analytics(session_id).await
    }

    pub async fn audit_session(&self, session_id: &str) -> Result<PartitionAudit> {
        self.timeline.audit(session_id).await
    }

    // Bulk load

    /// Writes whole partitions as-is, in store batches of at most 25 items.
    ///
    /// Entities keep their own ids, timestamps and step counts; nothing is
    /// validated or counted. Returns the number of items written.
    pub async fn import(&self, partitions: Vec<Partition>) -> Result<usize> {
        let mut items = Vec::new();
        for partition in &partitions {
            if let Some(session) = &partition.session {
                items.push(codec::encode_session(session)?);
            }
            for event in &partition.events {
                items.push(codec::encode_event(event)?);
            }
        }

        let written = self.store.batch_put(items, STORE_BATCH_WRITE_LIMIT).await?;
        info!(partitions = partitions.len(), items = written, "Import complete");
        Ok(written)
    }
}

//! Event store: events scoped to a session.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kv_store::{Attributes, KvStore, Query};
use serde_json::Value;
use telemetry::metrics;
use tracing::debug;
use tracker_core::schema::validate_request;
use tracker_core::{ClientContext, CreateEvent, Error, Event, EventType, EventUpdate, Result};
use uuid::Uuid;

use crate::clock::Clock;
use crate::codec::{decode_event, encode_event};
use crate::keys::{event_key, session_partition, truncate_to_millis, EVENT_PREFIX};
use crate::sessions::SessionStore;

#[derive(Clone)]
pub struct EventStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
    sessions: SessionStore,
}

impl EventStore {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>, sessions: SessionStore) -> Self {
        Self {
            store,
            clock,
            sessions,
        }
    }

    /// Writes a new event under the session's partition.
    ///
    /// Does not check that the session exists and does not touch its step
    /// counter.
    pub async fn create(
        &self,
        session_id: &str,
        request: CreateEvent,
        context: &ClientContext,
    ) -> Result<Event> {
        if session_id.is_empty() {
            return Err(Error::validation("sessionId", "must not be empty"));
        }
        validate_request(&request)?;
        let event_type: EventType = request.event_type.parse()?;

        let event = Event {
            event_id: new_event_id(),
            session_id: session_id.to_string(),
            event_type,
            event_data: request.event_data,
            timestamp: truncate_to_millis(self.clock.now()),
            user_agent: context.user_agent.clone(),
            ip_address: context.ip_address.clone(),
        };
        self.store.put(encode_event(&event)?).await?;

        metrics().events_created.inc();
        debug!(
            session_id = %session_id,
            event_id = %event.event_id,
            event_type = %event.event_type,
            "Event created"
        );
        Ok(event)
    }

    pub async fn get(
        &self,
        session_id: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<Option<Event>> {
        self.store
            .get(&event_key(session_id, event_id, timestamp))
            .await?
            .map(decode_event)
            .transpose()
    }

    /// All events of a session, oldest first.
    pub async fn list_by_session(&self, session_id: &str) -> Result<Vec<Event>> {
        let query = Query::new(session_partition(session_id)).begins_with(EVENT_PREFIX);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(decode_event)
            .collect()
    }

    pub async fn update(
        &self,
        session_id: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
        update: EventUpdate,
    ) -> Result<Event> {
        if update.is_empty() {
            return Err(Error::validation(
                "body",
                "no updatable fields (eventType, eventData)",
            ));
        }
        validate_request(&update)?;

        let mut fields = Attributes::new();
        if let Some(raw) = &update.event_type {
            let event_type: EventType = raw.parse()?;
            fields.insert("eventType".into(), Value::from(event_type.as_str()));
        }
        if let Some(data) = update.event_data {
            fields.insert("eventData".into(), Value::Object(data));
        }

        let item = self
            .store
            .update(&event_key(session_id, event_id, timestamp), fields)
            .await?
            .ok_or_else(|| Error::not_found("event", event_id))?;

        metrics().events_updated.inc();
        decode_event(item)
    }

    /// Removes an event, then decrements the session's step counter on a
    /// best-effort basis.
    pub async fn delete(
        &self,
        session_id: &str,
        event_id: &str,
        timestamp: DateTime<Utc>,
    ) -> Result<()> {
        let key = event_key(session_id, event_id, timestamp);
        if self.store.get(&key).await?.is_none() {
            return Err(Error::not_found("event", event_id));
        }
        self.store.delete(&key).await?;

        metrics().events_deleted.inc();
        debug!(session_id = %session_id, event_id = %event_id, "Event deleted");

        self.sessions.adjust_steps_best_effort(session_id, -1).await;
        Ok(())
    }
}

/// `evt_` + 32 hex chars.
pub fn new_event_id() -> String {
    format!("evt_{}", Uuid::new_v4().simple())
}

//! Session store: CRUD, user lookup, and cascading delete.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use kv_store::{Attributes, KvStore, Query, INDEX_PARTITION_KEY_ATTR, INDEX_SORT_KEY_ATTR};
use serde_json::Value;
use telemetry::metrics;
use tracing::{debug, info, warn};
use tracker_core::schema::{resolve_list_limit, validate_request};
use tracker_core::{ClientContext, CreateSession, Error, Result, Session, SessionUpdate};

use crate::clock::Clock;
use crate::codec::{decode_session, encode_session};
use crate::keys::{
    session_key, session_partition, truncate_to_millis, user_partition, user_sort_key,
    SESSION_PREFIX,
};

/// Progress of a cascading delete.
///
/// Items are enumerated once, then removed one by one. Events sort before
/// the metadata item, so an interrupted delete leaves the session visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CascadeState {
    Enumerating,
    Deleting { deleted: usize, total: usize },
    Done { deleted: usize },
    Partial { deleted: usize, total: usize },
}

#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KvStore>,
    clock: Arc<dyn Clock>,
}

impl SessionStore {
    pub fn new(store: Arc<dyn KvStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// Stored timestamps keep millisecond precision.
    fn now(&self) -> DateTime<Utc> {
        truncate_to_millis(self.clock.now())
    }

    /// Writes a new active session. An existing session with the same id is
    /// overwritten.
    pub async fn create(&self, request: CreateSession, context: &ClientContext) -> Result<Session> {
        validate_request(&request)?;

        let session = Session::new(request, context, self.now());
        self.store.put(encode_session(&session)?).await?;

        metrics().sessions_created.inc();
        info!(
            session_id = %session.session_id,
            external_id = ?session.external_id,
            "Session created"
        );
        Ok(session)
    }

    pub async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        self.store
            .get(&session_key(session_id))
            .await?
            .map(decode_session)
            .transpose()
    }

    /// Like [`get`](Self::get), but a missing session is `NotFound`.
    pub async fn require(&self, session_id: &str) -> Result<Session> {
        self.get(session_id)
            .await?
            .ok_or_else(|| Error::not_found("session", session_id))
    }

    /// Sets the supplied fields and stamps `updatedAt`.
    ///
    /// Fields not present in `update` are left alone, so concurrent updates
    /// of different fields both land. Changing `externalId` moves the
    /// session in the user index.
    pub async fn update(&self, session_id: &str, update: SessionUpdate) -> Result<Session> {
        if update.is_empty() {
            return Err(Error::validation(
                "body",
                "no updatable fields (externalId, status, metadata, stepsTaken)",
            ));
        }
        validate_request(&update)?;

        let existing = self.require(session_id).await?;

        let mut fields = Attributes::new();
        if let Some(external_id) = &update.external_id {
            fields.insert("externalId".into(), Value::from(external_id.as_str()));
            fields.insert(
                INDEX_PARTITION_KEY_ATTR.into(),
                Value::from(user_partition(external_id)),
            );
            fields.insert(
                INDEX_SORT_KEY_ATTR.into(),
                Value::from(user_sort_key(existing.created_at)),
            );
        }
        if let Some(status) = update.status {
            fields.insert("status".into(), Value::from(status.as_str()));
        }
        if let Some(metadata) = update.metadata {
            fields.insert("metadata".into(), Value::Object(metadata));
        }
        if let Some(steps) = update.steps_taken {
            fields.insert("stepsTaken".into(), Value::from(steps));
        }
        fields.insert("updatedAt".into(), serde_json::to_value(self.now())?);

        let item = self
            .store
            .update(&session_key(session_id), fields)
            .await?
            .ok_or_else(|| Error::not_found("session", session_id))?;

        metrics().sessions_updated.inc();
        debug!(session_id = %session_id, "Session updated");
        decode_session(item)
    }

    /// Sessions for a user in ascending `createdAt` order.
    pub async fn list_by_user(&self, external_id: &str, limit: Option<usize>) -> Result<Vec<Session>> {
        if external_id.is_empty() {
            return Err(Error::validation("externalId", "must not be empty"));
        }
        let limit = resolve_list_limit(limit)?;
        let index = self.store.schema().user_index()?;

        let query = Query::new(user_partition(external_id))
            .on_index(index.name.clone())
            .begins_with(SESSION_PREFIX)
            .limit(limit);

        self.store
            .query(&query)
            .await?
            .into_iter()
            .map(decode_session)
            .collect()
    }

    /// Removes the session and every item in its partition.
    ///
    /// Returns the number of items removed. Orphaned events without a
    /// metadata item are still removed and counted; an empty partition is
    /// `NotFound`. A failure part way through is `PartialDelete`.
    pub async fn delete_cascade(&self, session_id: &str) -> Result<usize> {
        let schema = self.store.schema();
        let mut keys = Vec::new();
        let mut failure = None;
        let mut state = CascadeState::Enumerating;

        loop {
            state = match state {
                CascadeState::Enumerating => {
                    let items = self
                        .store
                        .query(&Query::new(session_partition(session_id)))
                        .await?;
                    if items.is_empty() {
                        return Err(Error::not_found("session", session_id));
                    }
                    keys = items
                        .iter()
                        .map(|item| schema.key_of(item))
                        .collect::<Result<Vec<_>>>()?;
                    CascadeState::Deleting {
                        deleted: 0,
                        total: keys.len(),
                    }
                }
                CascadeState::Deleting { deleted, total } => match keys.get(deleted) {
                    None => CascadeState::Done { deleted },
                    Some(key) => match self.store.delete(key).await {
                        Ok(()) => CascadeState::Deleting {
                            deleted: deleted + 1,
                            total,
                        },
                        Err(e) => {
                            failure = Some(e);
                            CascadeState::Partial { deleted, total }
                        }
                    },
                },
                CascadeState::Done { deleted } => {
                    metrics().sessions_deleted.inc();
                    info!(session_id = %session_id, deleted, "Session deleted");
                    return Ok(deleted);
                }
                CascadeState::Partial { deleted, total } => {
                    let message = failure
                        .take()
                        .map(|e| e.to_string())
                        .unwrap_or_default();
                    metrics().partial_deletes.inc();
                    warn!(
                        session_id = %session_id,
                        deleted,
                        total,
                        error = %message,
                        "Cascading delete stopped part way"
                    );
                    return Err(Error::PartialDelete {
                        session_id: session_id.to_string(),
                        deleted,
                        total,
                        message,
                    });
                }
            };
        }
    }

    /// Atomically adds `delta` to `stepsTaken`.
    ///
    /// `Ok(None)` when the session is gone or the counter would go negative.
    pub async fn adjust_steps(&self, session_id: &str, delta: i64) -> Result<Option<Session>> {
        let mut fields = Attributes::new();
        fields.insert("updatedAt".into(), serde_json::to_value(self.now())?);

        self.store
            .increment(&session_key(session_id), "stepsTaken", delta, fields)
            .await?
            .map(decode_session)
            .transpose()
    }

    /// [`adjust_steps`](Self::adjust_steps) whose failures are logged, not
    /// returned. The counter is approximate.
    pub async fn adjust_steps_best_effort(&self, session_id: &str, delta: i64) {
        match self.adjust_steps(session_id, delta).await {
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!(session_id = %session_id, delta, "Step counter not adjusted");
            }
            Err(e) => {
                metrics().step_counter_errors.inc();
                warn!(
                    session_id = %session_id,
                    delta,
                    error = %e,
                    "Failed to adjust step counter"
                );
            }
        }
    }
}

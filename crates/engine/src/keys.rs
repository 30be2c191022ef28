//! Key design.
//!
//! A session's metadata item and all of its events share the partition
//! `SESSION#<sessionId>`. Metadata sits under the constant sort key
//! `METADATA`; events under `EVENT#<timestamp>#<eventId>`, where the
//! timestamp is fixed-width UTC with milliseconds, so lexicographic sort-key
//! order is chronological order. Sessions with a known user are re-keyed in
//! the user index as `(USER#<externalId>, SESSION#<createdAt>)`.

use chrono::{DateTime, DurationRound, SecondsFormat, TimeDelta, Utc};
use kv_store::ItemKey;

pub const SESSION_PREFIX: &str = "SESSION#";
pub const EVENT_PREFIX: &str = "EVENT#";
pub const USER_PREFIX: &str = "USER#";
pub const METADATA_SORT_KEY: &str = "METADATA";

/// `itemType` attribute values.
pub const SESSION_ITEM_TYPE: &str = "SESSION";
pub const EVENT_ITEM_TYPE: &str = "EVENT";
pub const ITEM_TYPE_ATTR: &str = "itemType";

pub fn session_partition(session_id: &str) -> String {
    format!("{}{}", SESSION_PREFIX, session_id)
}

pub fn session_key(session_id: &str) -> ItemKey {
    ItemKey::new(session_partition(session_id), METADATA_SORT_KEY)
}

pub fn event_sort_key(timestamp: DateTime<Utc>, event_id: &str) -> String {
    format!("{}{}#{}", EVENT_PREFIX, format_timestamp(timestamp), event_id)
}

pub fn event_key(session_id: &str, event_id: &str, timestamp: DateTime<Utc>) -> ItemKey {
    ItemKey::new(
        session_partition(session_id),
        event_sort_key(timestamp, event_id),
    )
}

pub fn user_partition(external_id: &str) -> String {
    format!("{}{}", USER_PREFIX, external_id)
}

pub fn user_sort_key(created_at: DateTime<Utc>) -> String {
    format!("{}{}", SESSION_PREFIX, format_timestamp(created_at))
}

/// `YYYY-MM-DDTHH:MM:SS.mmmZ`
pub fn format_timestamp(timestamp: DateTime<Utc>) -> String {
    timestamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Drops sub-millisecond precision so a stored timestamp rebuilds its key.
pub fn truncate_to_millis(timestamp: DateTime<Utc>) -> DateTime<Utc> {
    timestamp
        .duration_trunc(TimeDelta::milliseconds(1))
        .unwrap_or(timestamp)
}

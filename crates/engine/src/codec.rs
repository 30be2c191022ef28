//! Entity codec: sessions and events to and from physical items.
//!
//! Domain fields are stored under their camelCase names next to the key
//! attributes and an `itemType` discriminator.

use kv_store::{
    Item, INDEX_PARTITION_KEY_ATTR, INDEX_SORT_KEY_ATTR, PARTITION_KEY_ATTR, SORT_KEY_ATTR,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracker_core::{Error, Event, Result, Session};

use crate::keys::{
    event_sort_key, session_partition, user_partition, user_sort_key, EVENT_ITEM_TYPE,
    ITEM_TYPE_ATTR, METADATA_SORT_KEY, SESSION_ITEM_TYPE,
};

pub fn encode_session(session: &Session) -> Result<Item> {
    let mut item = to_item(session)?;
    item.insert(PARTITION_KEY_ATTR, session_partition(&session.session_id));
    item.insert(SORT_KEY_ATTR, METADATA_SORT_KEY);
    item.insert(ITEM_TYPE_ATTR, SESSION_ITEM_TYPE);

    // No user, no index entry.
    if let Some(external_id) = &session.external_id {
        item.insert(INDEX_PARTITION_KEY_ATTR, user_partition(external_id));
        item.insert(INDEX_SORT_KEY_ATTR, user_sort_key(session.created_at));
    }
    Ok(item)
}

pub fn decode_session(item: Item) -> Result<Session> {
    from_item(item, SESSION_ITEM_TYPE)
}

pub fn encode_event(event: &Event) -> Result<Item> {
    let mut item = to_item(event)?;
    item.insert(PARTITION_KEY_ATTR, session_partition(&event.session_id));
    item.insert(
        SORT_KEY_ATTR,
        event_sort_key(event.timestamp, &event.event_id),
    );
    item.insert(ITEM_TYPE_ATTR, EVENT_ITEM_TYPE);
    Ok(item)
}

pub fn decode_event(item: Item) -> Result<Event> {
    from_item(item, EVENT_ITEM_TYPE)
}

/// Reads the `itemType` discriminator.
pub fn item_type(item: &Item) -> Option<&str> {
    item.get_str(ITEM_TYPE_ATTR)
}

fn to_item<T: Serialize>(value: &T) -> Result<Item> {
    match serde_json::to_value(value)? {
        Value::Object(attributes) => Ok(Item::from_attributes(attributes)),
        other => Err(Error::codec(format!("expected an object, got {}", other))),
    }
}

fn from_item<T: DeserializeOwned>(item: Item, expected: &str) -> Result<T> {
    match item_type(&item) {
        Some(found) if found == expected => {}
        found => {
            return Err(Error::codec(format!(
                "expected {} item, found {}",
                expected,
                found.unwrap_or("untyped item")
            )))
        }
    }

    serde_json::from_value(Value::Object(item.into_attributes()))
        .map_err(|e| Error::codec(format!("undecodable {} item: {}", expected, e)))
}

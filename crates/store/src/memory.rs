//! In-process store backend.
//!
//! Holds the whole table in one ordered map, so main-table range reads come
//! back in key order for free. Used for local runs and tests.

use std::collections::BTreeMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracker_core::{Error, Result};

use crate::client::{KvStore, Query};
use crate::item::{Attributes, Item, ItemKey, TableSchema};

/// In-memory table with secondary-index emulation.
pub struct MemoryStore {
    schema: TableSchema,
    items: RwLock<BTreeMap<ItemKey, Item>>,
}

impl MemoryStore {
    pub fn new(schema: TableSchema) -> Self {
        Self {
            schema,
            items: RwLock::new(BTreeMap::new()),
        }
    }

    /// Number of items in the table.
    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }

    fn query_table(&self, query: &Query) -> Vec<Item> {
        let prefix = query.sort_prefix.as_deref().unwrap_or("");
        let start = ItemKey::new(query.partition.clone(), prefix);
        let limit = query.limit.unwrap_or(usize::MAX);

        self.items
            .read()
            .range(start..)
            .take_while(|(k, _)| k.partition == query.partition && k.sort.starts_with(prefix))
            .take(limit)
            .map(|(_, item)| item.clone())
            .collect()
    }

    fn query_index(&self, index_name: &str, query: &Query) -> Result<Vec<Item>> {
        let index = self.schema.index(index_name)?;
        let prefix = query.sort_prefix.as_deref().unwrap_or("");

        let items = self.items.read();
        let mut matches: Vec<(&str, &ItemKey, &Item)> = items
            .iter()
            .filter_map(|(key, item)| {
                if item.get_str(&index.partition_key) != Some(query.partition.as_str()) {
                    return None;
                }
                let sort = item.get_str(&index.sort_key)?;
                sort.starts_with(prefix).then_some((sort, key, item))
            })
            .collect();

        matches.sort_by(|a, b| a.0.cmp(b.0).then_with(|| a.1.cmp(b.1)));

        Ok(matches
            .into_iter()
            .take(query.limit.unwrap_or(usize::MAX))
            .map(|(_, _, item)| item.clone())
            .collect())
    }

    fn reject_key_fields(&self, fields: &Attributes) -> Result<()> {
        if let Some(name) = fields.keys().find(|n| self.schema.is_key_attribute(n)) {
            return Err(Error::store(format!("key attribute '{}' cannot be updated", name)));
        }
        Ok(())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new(TableSchema::default())
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    fn schema(&self) -> &TableSchema {
        &self.schema
    }

    async fn put(&self, item: Item) -> Result<()> {
        let key = self.schema.key_of(&item)?;
        self.items.write().insert(key, item);
        Ok(())
    }

    async fn get(&self, key: &ItemKey) -> Result<Option<Item>> {
        Ok(self.items.read().get(key).cloned())
    }

    async fn query(&self, query: &Query) -> Result<Vec<Item>> {
        match query.index.as_deref() {
            Some(index) => self.query_index(index, query),
            None => Ok(self.query_table(query)),
        }
    }

    async fn update(&self, key: &ItemKey, fields: Attributes) -> Result<Option<Item>> {
        self.reject_key_fields(&fields)?;

        let mut items = self.items.write();
        Ok(items.get_mut(key).map(|item| {
            item.merge(fields);
            item.clone()
        }))
    }

    async fn increment(
        &self,
        key: &ItemKey,
        attribute: &str,
        delta: i64,
        fields: Attributes,
    ) -> Result<Option<Item>> {
        self.reject_key_fields(&fields)?;

        let mut items = self.items.write();
        let Some(item) = items.get_mut(key) else {
            return Ok(None);
        };

        let current = item.get_u64(attribute).unwrap_or(0) as i64;
        let next = current + delta;
        if next < 0 {
            return Ok(None);
        }

        item.insert(attribute, Value::from(next as u64));
        item.merge(fields);
        Ok(Some(item.clone()))
    }

    async fn delete(&self, key: &ItemKey) -> Result<()> {
        self.items.write().remove(key);
        Ok(())
    }

    async fn batch_put(&self, items: Vec<Item>, max_batch_size: usize) -> Result<usize> {
        let mut written = 0;
        for chunk in items.chunks(max_batch_size.max(1)) {
            let mut keyed = Vec::with_capacity(chunk.len());
            for item in chunk {
                keyed.push((self.schema.key_of(item)?, item.clone()));
            }
            let mut table = self.items.write();
            for (key, item) in keyed {
                table.insert(key, item);
                written += 1;
            }
        }
        Ok(written)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

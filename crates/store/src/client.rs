//! The store client contract.

use async_trait::async_trait;
use tracker_core::Result;

use crate::item::{Attributes, Item, ItemKey, TableSchema};

/// Range read within one partition of the table or of an index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    /// Index to read instead of the main table
    pub index: Option<String>,
    pub partition: String,
    /// Only sort keys starting with this prefix
    pub sort_prefix: Option<String>,
    pub limit: Option<usize>,
}

impl Query {
    pub fn new(partition: impl Into<String>) -> Self {
        Self {
            index: None,
            partition: partition.into(),
            sort_prefix: None,
            limit: None,
        }
    }

    pub fn on_index(mut self, index: impl Into<String>) -> Self {
        self.index = Some(index.into());
        self
    }

    pub fn begins_with(mut self, prefix: impl Into<String>) -> Self {
        self.sort_prefix = Some(prefix.into());
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// Key-value store over one table and its secondary index.
///
/// Every operation touches a single item except `query` and `batch_put`;
/// nothing spans items atomically.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Table layout this store was opened with.
    fn schema(&self) -> &TableSchema;

    /// Upsert. An existing item with the same key is replaced.
    async fn put(&self, item: Item) -> Result<()>;

    async fn get(&self, key: &ItemKey) -> Result<Option<Item>>;

    /// Items in ascending sort-key order. Index reads order by the index
    /// sort key; items lacking the index attributes are not in the index.
    async fn query(&self, query: &Query) -> Result<Vec<Item>>;

    /// Sets `fields` on an existing item. Returns the updated item, or
    /// `None` when no item has this key.
    async fn update(&self, key: &ItemKey, fields: Attributes) -> Result<Option<Item>>;

    /// Atomically adds `delta` to a numeric attribute and sets `fields`.
    /// Not applied (returns `None`) when the item is missing or the result
    /// would be negative.
    async fn increment(
        &self,
        key: &ItemKey,
        attribute: &str,
        delta: i64,
        fields: Attributes,
    ) -> Result<Option<Item>>;

    /// Removes an item. Deleting a missing key is not an error.
    async fn delete(&self, key: &ItemKey) -> Result<()>;

    /// Bulk insert in chunks of at most `max_batch_size` items per request.
    /// Returns the number of items written.
    async fn batch_put(&self, items: Vec<Item>, max_batch_size: usize) -> Result<usize>;

    /// Connectivity probe.
    async fn ping(&self) -> Result<()>;
}

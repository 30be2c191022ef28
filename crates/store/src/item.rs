//! Physical items, keys, and table layout.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracker_core::{Error, Result};

/// Attribute name -> tree-structured value.
pub type Attributes = serde_json::Map<String, Value>;

/// Partition key attribute of the main table.
pub const PARTITION_KEY_ATTR: &str = "PK";
/// Sort key attribute of the main table.
pub const SORT_KEY_ATTR: &str = "SK";
/// Secondary index name.
pub const USER_INDEX_NAME: &str = "GSI1";
/// Secondary index partition key attribute.
pub const INDEX_PARTITION_KEY_ATTR: &str = "GSI1PK";
/// Secondary index sort key attribute.
pub const INDEX_SORT_KEY_ATTR: &str = "GSI1SK";

/// A stored item: key attributes plus any other attributes.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Item(Attributes);

impl Item {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_attributes(attributes: Attributes) -> Self {
        Self(attributes)
    }

    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name)
    }

    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.0.get(name).and_then(Value::as_str)
    }

    pub fn get_u64(&self, name: &str) -> Option<u64> {
        self.0.get(name).and_then(Value::as_u64)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(name.into(), value.into());
    }

    /// Overwrites attributes with the given ones.
    pub fn merge(&mut self, attributes: Attributes) {
        self.0.extend(attributes);
    }

    pub fn attributes(&self) -> &Attributes {
        &self.0
    }

    pub fn into_attributes(self) -> Attributes {
        self.0
    }
}

impl From<Attributes> for Item {
    fn from(attributes: Attributes) -> Self {
        Self(attributes)
    }
}

/// Primary key of one item.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemKey {
    pub partition: String,
    pub sort: String,
}

impl ItemKey {
    pub fn new(partition: impl Into<String>, sort: impl Into<String>) -> Self {
        Self {
            partition: partition.into(),
            sort: sort.into(),
        }
    }
}

/// Secondary index layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSchema {
    pub name: String,
    pub partition_key: String,
    pub sort_key: String,
}

/// Table layout shared by every backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSchema {
    pub table_name: String,
    pub partition_key: String,
    pub sort_key: String,
    pub indexes: Vec<IndexSchema>,
}

impl TableSchema {
    /// The single-table layout: `(PK, SK)` plus the `GSI1` user index.
    pub fn single_table(table_name: impl Into<String>, index_name: impl Into<String>) -> Self {
        Self {
            table_name: table_name.into(),
            partition_key: PARTITION_KEY_ATTR.to_string(),
            sort_key: SORT_KEY_ATTR.to_string(),
            indexes: vec![IndexSchema {
                name: index_name.into(),
                partition_key: INDEX_PARTITION_KEY_ATTR.to_string(),
                sort_key: INDEX_SORT_KEY_ATTR.to_string(),
            }],
        }
    }

    pub fn index(&self, name: &str) -> Result<&IndexSchema> {
        self.indexes
            .iter()
            .find(|i| i.name == name)
            .ok_or_else(|| Error::store(format!("unknown index '{}'", name)))
    }

    /// The user index (the table's only secondary index).
    pub fn user_index(&self) -> Result<&IndexSchema> {
        self.indexes
            .first()
            .ok_or_else(|| Error::store(format!("table '{}' has no secondary index", self.table_name)))
    }

    /// Extracts the primary key of an item.
    pub fn key_of(&self, item: &Item) -> Result<ItemKey> {
        let partition = item
            .get_str(&self.partition_key)
            .ok_or_else(|| Error::store(format!("item missing '{}'", self.partition_key)))?;
        let sort = item
            .get_str(&self.sort_key)
            .ok_or_else(|| Error::store(format!("item missing '{}'", self.sort_key)))?;
        Ok(ItemKey::new(partition, sort))
    }

    /// True for the main table's own key attributes.
    pub fn is_key_attribute(&self, name: &str) -> bool {
        name == self.partition_key || name == self.sort_key
    }
}

impl Default for TableSchema {
    fn default() -> Self {
        Self::single_table("user-sessions", USER_INDEX_NAME)
    }
}

//! Store configuration.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use tracker_core::limits::STORE_BATCH_WRITE_LIMIT;
use tracker_core::Result;

use crate::client::KvStore;
use crate::dynamo::DynamoStore;
use crate::item::{TableSchema, USER_INDEX_NAME};
use crate::memory::MemoryStore;

/// Which backend serves the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Dynamodb,
}

/// Store client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// Table name
    #[serde(default = "default_table_name")]
    pub table_name: String,
    /// User index name
    #[serde(default = "default_index_name")]
    pub index_name: String,
    /// AWS region (falls back to the environment's default chain)
    pub region: Option<String>,
    /// Endpoint override, e.g. a local DynamoDB
    pub endpoint_url: Option<String>,
    /// Items per bulk write request
    #[serde(default = "default_batch_write_size")]
    pub batch_write_size: usize,
    /// Per-operation timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_table_name() -> String {
    "user-sessions".to_string()
}

fn default_index_name() -> String {
    USER_INDEX_NAME.to_string()
}

fn default_batch_write_size() -> usize {
    STORE_BATCH_WRITE_LIMIT
}

fn default_timeout_secs() -> u64 {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            table_name: default_table_name(),
            index_name: default_index_name(),
            region: None,
            endpoint_url: None,
            batch_write_size: default_batch_write_size(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl StoreConfig {
    /// Table layout for this configuration.
    pub fn schema(&self) -> TableSchema {
        TableSchema::single_table(&self.table_name, &self.index_name)
    }
}

/// Opens the configured backend.
pub async fn connect(config: &StoreConfig) -> Result<Arc<dyn KvStore>> {
    let store: Arc<dyn KvStore> = match config.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new(config.schema())),
        StoreBackend::Dynamodb => Arc::new(DynamoStore::connect(config).await?),
    };

    info!(
        backend = ?config.backend,
        table = %config.table_name,
        index = %config.index_name,
        "Opened key-value store"
    );

    Ok(store)
}

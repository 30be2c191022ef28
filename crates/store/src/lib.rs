//! Single-table key-value store client for the session tracker.
//!
//! One physical table keyed by `(PK, SK)` plus one secondary index keyed by
//! `(GSI1PK, GSI1SK)`. Backends implement [`KvStore`].

pub mod client;
pub mod config;
pub mod dynamo;
pub mod health;
pub mod item;
pub mod memory;

pub use client::*;
pub use config::*;
pub use dynamo::DynamoStore;
pub use item::*;
pub use memory::MemoryStore;

//! Store connectivity checks.

use telemetry::health;
use tracing::{debug, error};

use crate::client::KvStore;

/// Probes the store and records the result in the health registry.
pub async fn check_connection(store: &dyn KvStore) -> bool {
    match store.ping().await {
        Ok(()) => {
            debug!(table = %store.schema().table_name, "Store connection OK");
            health().store.set_healthy();
            true
        }
        Err(e) => {
            error!(error = %e, "Store connection check failed");
            health().store.set_unhealthy(e.to_string());
            false
        }
    }
}

//! Common test setup functions.

use std::sync::Arc;

use api::{router, AppState};
use axum::Router;
use axum_test::TestServer;
use chrono::{TimeDelta, TimeZone, Utc};
use kv_store::KvStore;
use session_engine::{IngestConfig, ManualClock, SessionEngine};

use crate::mocks::FlakyStore;

/// Test context: the real router and engine over an in-memory store.
///
/// The clock is manual so timestamps, ordering, and durations are exact.
/// It starts at 2026-01-01T00:00:00Z.
pub struct TestContext {
    pub store: Arc<FlakyStore>,
    pub clock: Arc<ManualClock>,
    pub router: Router,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(IngestConfig::default())
    }

    pub fn with_config(config: IngestConfig) -> Self {
        let store = Arc::new(FlakyStore::new());
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));

        let engine = SessionEngine::with_clock(
            store.clone() as Arc<dyn KvStore>,
            clock.clone(),
            config,
        );
        let router = router(AppState::new(engine));

        Self {
            store,
            clock,
            router,
        }
    }

    /// Server over a clone of the router.
    pub fn server(&self) -> TestServer {
        TestServer::new(self.router.clone()).expect("Failed to create test server")
    }

    /// Moves the clock forward.
    pub fn advance_secs(&self, secs: i64) {
        self.clock.advance(TimeDelta::seconds(secs));
    }

    /// Items physically present in the table.
    pub fn item_count(&self) -> usize {
        self.store.inner().len()
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

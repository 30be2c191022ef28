//! In-process metrics.
//!
//! Lock-free counters and histograms, read through [`Metrics::snapshot`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn dec(&self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s
    buckets: [AtomicU64; 11],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    const BUCKET_BOUNDS: [u64; 11] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        for (i, &bound) in Self::BUCKET_BOUNDS.iter().enumerate() {
            if ms <= bound {
                self.buckets[i].fetch_add(1, Ordering::Relaxed);
                return;
            }
        }
        // Value exceeds all buckets, add to last
        self.buckets[10].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Counters and latencies for the session tracker.
#[derive(Debug, Default)]
pub struct Metrics {
    // Sessions
    pub sessions_created: Counter,
    pub sessions_updated: Counter,
    pub sessions_deleted: Counter,
    pub partial_deletes: Counter,

    // Events
    pub events_created: Counter,
    pub events_updated: Counter,
    pub events_deleted: Counter,
    pub events_tracked: Counter,
    pub step_counter_errors: Counter,

    // Batches
    pub batches_received: Counter,
    pub batch_items_failed: Counter,

    // Requests
    pub validation_failures: Counter,
    pub store_errors: Counter,

    // Latency histograms
    pub request_latency_ms: Histogram,
    pub store_latency_ms: Histogram,
    pub batch_latency_ms: Histogram,

    pub active_requests: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            sessions_created: self.sessions_created.get(),
            sessions_updated: self.sessions_updated.get(),
            sessions_deleted: self.sessions_deleted.get(),
            partial_deletes: self.partial_deletes.get(),
            events_created: self.events_created.get(),
            events_updated: self.events_updated.get(),
            events_deleted: self.events_deleted.get(),
            events_tracked: self.events_tracked.get(),
            step_counter_errors: self.step_counter_errors.get(),
            batches_received: self.batches_received.get(),
            batch_items_failed: self.batch_items_failed.get(),
            validation_failures: self.validation_failures.get(),
            store_errors: self.store_errors.get(),
            request_latency_mean_ms: self.request_latency_ms.mean(),
            store_latency_mean_ms: self.store_latency_ms.mean(),
            batch_latency_mean_ms: self.batch_latency_ms.mean(),
            active_requests: self.active_requests.get(),
        }
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub sessions_created: u64,
    pub sessions_updated: u64,
    pub sessions_deleted: u64,
    pub partial_deletes: u64,
    pub events_created: u64,
    pub events_updated: u64,
    pub events_deleted: u64,
    pub events_tracked: u64,
    pub step_counter_errors: u64,
    pub batches_received: u64,
    pub batch_items_failed: u64,
    pub validation_failures: u64,
    pub store_errors: u64,
    pub request_latency_mean_ms: f64,
    pub store_latency_mean_ms: f64,
    pub batch_latency_mean_ms: f64,
    pub active_requests: u64,
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

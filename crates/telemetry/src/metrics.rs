//! In-process metrics.
//!
//! Counters are process-lifetime totals, exposed through the health endpoint.

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

/// Running latency summary in milliseconds.
#[derive(Debug, Default)]
pub struct Latency {
    count: AtomicU64,
    sum: AtomicU64,
    max: AtomicU64,
}

impl Latency {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&self, ms: u64) {
        self.count.fetch_add(1, Ordering::Relaxed);
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.max.fetch_max(ms, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn max(&self) -> u64 {
        self.max.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        match self.count() {
            0 => 0.0,
            n => self.sum.load(Ordering::Relaxed) as f64 / n as f64,
        }
    }
}

/// Collected metrics for the analytics engine.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub page_views_received: Counter,
    pub clicks_received: Counter,
    pub scroll_events_received: Counter,
    pub sessions_received: Counter,
    pub custom_events_received: Counter,
    pub events_rejected: Counter,

    // Event store
    pub events_inserted: Counter,
    pub insert_errors: Counter,
    pub inserts_skipped_degraded: Counter,
    pub query_errors: Counter,

    // Export
    pub export_cycles: Counter,
    pub export_cycles_skipped: Counter,
    pub export_cycles_rejected: Counter,
    pub export_files_uploaded: Counter,
    pub export_jobs_skipped: Counter,
    pub export_jobs_failed: Counter,

    pub insert_latency_ms: Latency,
    pub export_cycle_latency_ms: Latency,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total tracking payloads accepted across all kinds.
    pub fn events_received(&self) -> u64 {
        self.page_views_received.get()
            + self.clicks_received.get()
            + self.scroll_events_received.get()
            + self.sessions_received.get()
            + self.custom_events_received.get()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub events_received: u64,
    pub events_rejected: u64,
    pub events_inserted: u64,
    pub insert_errors: u64,
    pub inserts_skipped_degraded: u64,
    pub query_errors: u64,
    pub export_cycles: u64,
    pub export_cycles_skipped: u64,
    pub export_cycles_rejected: u64,
    pub export_files_uploaded: u64,
    pub export_jobs_skipped: u64,
    pub export_jobs_failed: u64,
    pub insert_latency_mean_ms: f64,
    pub export_cycle_latency_mean_ms: f64,
    pub export_cycle_latency_max_ms: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            events_received: self.events_received(),
            events_rejected: self.events_rejected.get(),
            events_inserted: self.events_inserted.get(),
            insert_errors: self.insert_errors.get(),
            inserts_skipped_degraded: self.inserts_skipped_degraded.get(),
            query_errors: self.query_errors.get(),
            export_cycles: self.export_cycles.get(),
            export_cycles_skipped: self.export_cycles_skipped.get(),
            export_cycles_rejected: self.export_cycles_rejected.get(),
            export_files_uploaded: self.export_files_uploaded.get(),
            export_jobs_skipped: self.export_jobs_skipped.get(),
            export_jobs_failed: self.export_jobs_failed.get(),
            insert_latency_mean_ms: self.insert_latency_ms.mean(),
            export_cycle_latency_mean_ms: self.export_cycle_latency_ms.mean(),
            export_cycle_latency_max_ms: self.export_cycle_latency_ms.max(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}

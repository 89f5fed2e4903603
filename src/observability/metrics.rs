//! Metrics registry for PetPort
//!
//! Counters only, monotonic, reset on process start.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Operational counters shared by the jobs and the HTTP surface
#[derive(Debug, Default)]
pub struct MetricsRegistry {
    grace_started: AtomicU64,
    grace_suspensions: AtomicU64,
    transitions_skipped: AtomicU64,
    grace_notices_sent: AtomicU64,
    corruption_scans: AtomicU64,
    corrupted_records: AtomicU64,
    notifications_dispatched: AtomicU64,
    dispatch_failures: AtomicU64,
    job_runs: AtomicU64,
    job_failures: AtomicU64,
}

impl MetricsRegistry {
    /// Create a new metrics registry with all counters at zero
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_grace_started(&self) {
        self.grace_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_grace_suspensions(&self) {
        self.grace_suspensions.fetch_add(1, Ordering::Relaxed);
    }

    /// A conditional update found the record already moved on
    pub fn increment_transitions_skipped(&self) {
        self.transitions_skipped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_grace_notices(&self) {
        self.grace_notices_sent.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one completed scan and how many corrupted records it found
    pub fn record_corruption_scan(&self, corrupted: u64) {
        self.corruption_scans.fetch_add(1, Ordering::Relaxed);
        self.corrupted_records.fetch_add(corrupted, Ordering::Relaxed);
    }

    pub fn increment_notifications_dispatched(&self) {
        self.notifications_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_dispatch_failures(&self) {
        self.dispatch_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_job_runs(&self) {
        self.job_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_job_failures(&self) {
        self.job_failures.fetch_add(1, Ordering::Relaxed);
    }

    /// Get all metrics as a snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            grace_started: self.grace_started.load(Ordering::Relaxed),
            grace_suspensions: self.grace_suspensions.load(Ordering::Relaxed),
            transitions_skipped: self.transitions_skipped.load(Ordering::Relaxed),
            grace_notices_sent: self.grace_notices_sent.load(Ordering::Relaxed),
            corruption_scans: self.corruption_scans.load(Ordering::Relaxed),
            corrupted_records: self.corrupted_records.load(Ordering::Relaxed),
            notifications_dispatched: self.notifications_dispatched.load(Ordering::Relaxed),
            dispatch_failures: self.dispatch_failures.load(Ordering::Relaxed),
            job_runs: self.job_runs.load(Ordering::Relaxed),
            job_failures: self.job_failures.load(Ordering::Relaxed),
        }
    }

    /// Current snapshot as a JSON value
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self.snapshot()).unwrap_or_else(|_| serde_json::json!({}))
    }
}

/// A point-in-time snapshot of all metrics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub grace_started: u64,
    pub grace_suspensions: u64,
    pub transitions_skipped: u64,
    pub grace_notices_sent: u64,
    pub corruption_scans: u64,
    pub corrupted_records: u64,
    pub notifications_dispatched: u64,
    pub dispatch_failures: u64,
    pub job_runs: u64,
    pub job_failures: u64,
}

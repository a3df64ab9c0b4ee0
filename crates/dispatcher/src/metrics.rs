//! Per-destination delivery counters
//!
//! Kept beside each `SinkHandle` so the run summary can report sink health
//! without a metrics recorder installed.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

#[derive(Debug, Default)]
pub struct SinkMetrics {
    /// Requests waiting for the sink worker
    depth: AtomicUsize,
    /// Accepted writes
    delivered: AtomicU64,
    /// Rejected attempts; one delivery retried three times counts three
    rejected: AtomicU64,
}

impl SinkMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn depth(&self) -> usize {
        self.depth.load(Ordering::Relaxed)
    }

    pub fn set_depth(&self, depth: usize) {
        self.depth.store(depth, Ordering::Relaxed);
    }

    pub fn delivered(&self) -> u64 {
        self.delivered.load(Ordering::Relaxed)
    }

    pub fn record_delivered(&self) {
        self.delivered.fetch_add(1, Ordering::Relaxed);
    }

    pub fn rejected(&self) -> u64 {
        self.rejected.load(Ordering::Relaxed)
    }

    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Total attempts the sink has answered
    pub fn attempts(&self) -> u64 {
        self.delivered() + self.rejected()
    }

    pub fn snapshot(&self) -> SinkMetricsSnapshot {
        SinkMetricsSnapshot {
            depth: self.depth(),
            delivered: self.delivered(),
            rejected: self.rejected(),
        }
    }
}

/// Point-in-time copy of [`SinkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SinkMetricsSnapshot {
    pub depth: usize,
    pub delivered: u64,
    pub rejected: u64,
}

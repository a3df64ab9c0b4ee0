//! Ingestion metrics

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Ingestion counters
#[derive(Debug, Default)]
pub struct IngestionMetrics {
    /// Raw messages read from the transport
    pub messages_received: AtomicU64,

    /// Messages normalized into EventRecords
    pub events_normalized: AtomicU64,

    /// Messages dropped as malformed (never retried)
    pub malformed: AtomicU64,
}

impl IngestionMetrics {
    /// Create new metrics instance
    pub fn new() -> Self {
        Self::default()
    }

    /// Record raw message received
    pub fn record_received(&self) {
        self.messages_received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_messages_received_total").increment(1);
    }

    /// Record successful normalization
    pub fn record_normalized(&self) {
        self.events_normalized.fetch_add(1, Ordering::Relaxed);
    }

    /// Record malformed message
    pub fn record_malformed(&self) {
        self.malformed.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_malformed_events_total").increment(1);
    }

    /// Get snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            messages_received: self.messages_received.load(Ordering::Relaxed),
            events_normalized: self.events_normalized.load(Ordering::Relaxed),
            malformed: self.malformed.load(Ordering::Relaxed),
        }
    }
}

/// Metrics snapshot
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MetricsSnapshot {
    pub messages_received: u64,
    pub events_normalized: u64,
    pub malformed: u64,
}

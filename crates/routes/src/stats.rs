//! Per-route counters

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

use contracts::{Destination, RouteId};
use dispatcher::{FanOutReport, SinkMetricsSnapshot};

/// Route counters, shared by the route's workers
#[derive(Debug, Default)]
pub struct RouteStats {
    received: AtomicU64,
    excluded: AtomicU64,
    delivered: AtomicU64,
    dead_lettered: AtomicU64,
    misconfigured: AtomicU64,
    not_binary: AtomicU64,
    fixity_success: AtomicU64,
    fixity_failure: AtomicU64,
}

impl RouteStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_received(&self, route_id: RouteId) {
        self.received.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_events_received_total", "route" => route_id.as_str()).increment(1);
    }

    pub(crate) fn record_excluded(&self, route_id: RouteId) {
        self.excluded.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_events_excluded_total", "route" => route_id.as_str()).increment(1);
    }

    /// Dead letter raised before fan-out (classification or fixity sequence)
    pub(crate) fn record_stage_dead_letter(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_not_binary(&self) {
        self.not_binary.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_fixity(&self, success: bool) {
        let (counter, outcome) = if success {
            (&self.fixity_success, "success")
        } else {
            (&self.fixity_failure, "failure")
        };
        counter.fetch_add(1, Ordering::Relaxed);
        metrics::counter!("relay_fixity_outcomes_total", "outcome" => outcome).increment(1);
    }

    pub(crate) fn record_report(&self, report: &FanOutReport) {
        self.delivered
            .fetch_add(report.delivered() as u64, Ordering::Relaxed);
        self.dead_lettered
            .fetch_add(report.dead_lettered() as u64, Ordering::Relaxed);
        self.misconfigured
            .fetch_add(report.misconfigured() as u64, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> RouteStatsSnapshot {
        RouteStatsSnapshot {
            received: self.received.load(Ordering::Relaxed),
            excluded: self.excluded.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            misconfigured: self.misconfigured.load(Ordering::Relaxed),
            not_binary: self.not_binary.load(Ordering::Relaxed),
            fixity_success: self.fixity_success.load(Ordering::Relaxed),
            fixity_failure: self.fixity_failure.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time route counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RouteStatsSnapshot {
    pub received: u64,
    pub excluded: u64,
    /// Destination deliveries (a multicast counts once per destination)
    pub delivered: u64,
    pub dead_lettered: u64,
    pub misconfigured: u64,
    pub not_binary: u64,
    pub fixity_success: u64,
    pub fixity_failure: u64,
}

/// Sink counters for one destination at shutdown
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkSummary {
    pub destination: Destination,
    pub writes: u64,
    pub failures: u64,
}

impl SinkSummary {
    pub(crate) fn from_snapshot(destination: Destination, snapshot: SinkMetricsSnapshot) -> Self {
        Self {
            destination,
            writes: snapshot.delivered,
            failures: snapshot.rejected,
        }
    }
}

/// Final counters for one route
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RouteSummary {
    pub route_id: RouteId,
    pub stats: RouteStatsSnapshot,
    pub sinks: Vec<SinkSummary>,
}

/// Final counters for a router run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub routes: Vec<RouteSummary>,
}

impl RunSummary {
    pub fn route(&self, route_id: RouteId) -> Option<&RouteSummary> {
        self.routes.iter().find(|r| r.route_id == route_id)
    }

    pub fn total_dead_lettered(&self) -> u64 {
        self.routes.iter().map(|r| r.stats.dead_lettered).sum()
    }
}

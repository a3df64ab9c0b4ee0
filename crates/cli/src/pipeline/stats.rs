//! Run statistics.

use std::time::Duration;

use ingestion::MetricsSnapshot;
use routes::RunSummary;
use serde::Serialize;

/// Statistics from a router run
#[derive(Debug, Clone, Default, Serialize)]
pub struct RunStats {
    /// Wall time from router start to drained shutdown
    #[serde(serialize_with = "as_secs")]
    pub duration: Duration,

    /// Transport messages read, normalized and rejected
    pub ingestion: MetricsSnapshot,

    /// Per-route and per-sink counters
    pub summary: RunSummary,

    /// Stopped by a signal rather than end of input
    pub interrupted: bool,
}

fn as_secs<S: serde::Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(duration.as_secs_f64())
}

impl RunStats {
    /// Events per second taken in by the routes
    pub fn throughput(&self) -> f64 {
        let received: u64 = self.summary.routes.iter().map(|r| r.stats.received).sum();
        if self.duration.as_secs_f64() > 0.0 {
            received as f64 / self.duration.as_secs_f64()
        } else {
            0.0
        }
    }

    /// Print detailed summary
    pub fn print_summary(&self) {
        println!("\n=== Run Summary ===\n");
        println!("Overview");
        println!("  Duration: {:.2}s", self.duration.as_secs_f64());
        println!("  Messages received: {}", self.ingestion.messages_received);
        println!("  Events normalized: {}", self.ingestion.events_normalized);
        println!("  Malformed: {}", self.ingestion.malformed);
        println!("  Throughput: {:.2} events/s", self.throughput());
        if self.interrupted {
            println!("  Stopped by signal");
        }

        for route in &self.summary.routes {
            let s = &route.stats;
            println!("\nRoute '{}'", route.route_id);
            println!("  received={} excluded={}", s.received, s.excluded);
            println!(
                "  delivered={} dead_lettered={} misconfigured={}",
                s.delivered, s.dead_lettered, s.misconfigured
            );
            if s.not_binary + s.fixity_success + s.fixity_failure > 0 {
                println!(
                    "  fixity: success={} failure={} not_binary={}",
                    s.fixity_success, s.fixity_failure, s.not_binary
                );
            }
            for sink in &route.sinks {
                println!(
                    "  - {}: writes={} failures={}",
                    sink.destination, sink.writes, sink.failures
                );
            }
        }
        println!();
    }
}

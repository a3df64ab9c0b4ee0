//! # Routes
//!
//! The four routes and the runtime that drives them.
//!
//! | Route | Selects |
//! |-------|---------|
//! | indexing | `update-index` / `delete-index` |
//! | forwarding | `forward-http` |
//! | serialization | metadata and binary archival, update or delete |
//! | fixity | `fixity-success` / `fixity-failure` |
//!
//! Each route owns a bounded queue and `concurrent_consumers` workers. A
//! worker runs one record through classification (retried), rule selection,
//! and fan-out (each destination retried independently).

pub mod fixity;
pub mod forwarding;
pub mod indexing;
pub mod pipeline;
pub mod router;
pub mod serialization;
pub mod stats;

pub use fixity::{outcome_delivery, FixitySequence, FixityState};
pub use pipeline::{Pipeline, ProcessOutcome, RouteLogic};
pub use router::{build_pipeline, RouteCapacity, Router, RouterBuilder};
pub use stats::{RouteStats, RouteStatsSnapshot, RouteSummary, RunSummary, SinkSummary};

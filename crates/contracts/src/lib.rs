//! # Contracts
//!
//! Frozen interface contracts shared by every routing crate: the normalized
//! event, derived routing facts, destinations and their payloads, the error
//! taxonomy, configuration types, and the collaborator traits (repository
//! lookup, destination sinks, dead-letter hook).
//! Business crates depend only on this crate, reverse dependencies are prohibited.
//!
//! ## Delivery model
//! - The transport delivers at least once; sinks are expected to be idempotent
//! - `timestamp_ms` is the repository's event time (epoch millis)

mod blueprint;
mod dead_letter;
mod delivery;
mod destination;
mod error;
mod event;
mod facts;
pub mod repository;
mod route;
mod sink;

pub use blueprint::*;
pub use dead_letter::{DeadLetter, DeadLetterHook};
pub use delivery::DeliveryMessage;
pub use destination::Destination;
pub use error::*;
pub use event::{kinds, EventRecord, EventRecordBuilder};
pub use facts::RoutingFacts;
pub use repository::{FixityReport, ResourceDescription, ResourceFetcher};
pub use route::RouteId;
pub use sink::*;

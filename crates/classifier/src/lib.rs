//! # Classifier
//!
//! Derives [`RoutingFacts`](contracts::RoutingFacts) from an `EventRecord`
//! and, when a route needs resource types, a fetched description.
//!
//! Fetching is lazy: excluded resources and deletes are classified from the
//! record alone, so a deleted resource is never looked up.

mod classifier;
mod exclusion;

pub use classifier::{Classifier, TypeRequirement};
pub use exclusion::ExclusionList;

//! RoutingFacts - derived per dispatch, never persisted

use serde::Serialize;

/// Booleans consulted by branch predicates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RoutingFacts {
    /// Event type set names `NODE_REMOVED`
    pub is_delete: bool,
    /// Resource type set includes the repository's binary type
    pub is_binary: bool,
    /// Indexing is unconditional for the route, or the resource carries the indexable marker
    pub is_indexable: bool,
    /// Identifier equals, or sits under, an excluded container
    pub is_under_excluded_container: bool,
}

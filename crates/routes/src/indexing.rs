//! Indexing route (search index / triplestore)
//!
//! Deletes go to `delete-index`. Anything else is indexed when indexable and
//! removed from the index otherwise, so a resource that loses its indexable
//! marker disappears from the index.

use classifier::TypeRequirement;
use contracts::Destination;
use dispatcher::{RuleTable, Target};

pub fn rules() -> RuleTable {
    RuleTable::new()
        .rule("delete", |f| f.is_delete, vec![Target::to(Destination::DELETE_INDEX)])
        .rule(
            "indexable",
            |f| !f.is_delete && f.is_indexable,
            vec![Target::to(Destination::UPDATE_INDEX)],
        )
        .otherwise(vec![Target::to(Destination::DELETE_INDEX)])
}

/// Marker-gated indexing needs the fetched type set; unconditional does not
pub fn type_requirement(indexing_is_unconditional: bool) -> TypeRequirement {
    if indexing_is_unconditional {
        TypeRequirement::NotNeeded
    } else {
        TypeRequirement::Required
    }
}

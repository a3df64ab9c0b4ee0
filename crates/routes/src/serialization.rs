//! Serialization / archival route
//!
//! Deletes fan out to `delete-metadata` and `delete-binary`; both run even if
//! one fails. Updates go to `update-metadata`, plus `update-binary` for
//! binaries when binary archival is switched on.

use classifier::TypeRequirement;
use contracts::Destination;
use dispatcher::{RuleTable, Target};

pub fn rules(include_binaries: bool) -> RuleTable {
    let mut update = vec![Target::to(Destination::UPDATE_METADATA)];
    if include_binaries {
        update.push(Target::when(Destination::UPDATE_BINARY, |f| f.is_binary));
    }

    RuleTable::new()
        .rule(
            "delete",
            |f| f.is_delete,
            vec![
                Target::to(Destination::DELETE_METADATA),
                Target::to(Destination::DELETE_BINARY),
            ],
        )
        .rule("update", |f| !f.is_delete, update)
}

/// Types matter only for the binary branch
pub fn type_requirement(include_binaries: bool) -> TypeRequirement {
    if include_binaries {
        TypeRequirement::Required
    } else {
        TypeRequirement::NotNeeded
    }
}

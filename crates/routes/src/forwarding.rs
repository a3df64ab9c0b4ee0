//! HTTP forwarding route
//!
//! No branching: every non-excluded event is forwarded. The payload's event
//! types are the record's effective ones, so reindex messages carry `Update`.

use classifier::TypeRequirement;
use contracts::Destination;
use dispatcher::{RuleTable, Target};

pub fn rules() -> RuleTable {
    RuleTable::new().otherwise(vec![Target::to(Destination::FORWARD_HTTP)])
}

pub fn type_requirement() -> TypeRequirement {
    TypeRequirement::NotNeeded
}

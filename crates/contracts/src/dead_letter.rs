//! Dead-letter hook
//!
//! The core keeps no durable dead-letter store. Exhausted messages are handed
//! to a hook that an external logging/alerting collaborator implements.

use serde::Serialize;

use crate::{Destination, RouteId};

/// A message dropped from a stage after redelivery was exhausted or refused
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeadLetter {
    pub route_id: RouteId,
    pub identifier: String,
    /// `None` when the failing stage precedes fan-out (fetch/classify, fixity)
    pub destination: Option<Destination>,
    /// Attempts made, initial attempt included
    pub attempts: u32,
    pub last_error: String,
    /// Error kind label, see `RouterError::kind`
    pub error_kind: &'static str,
}

/// Consumer of dead letters
pub trait DeadLetterHook: Send + Sync {
    fn dead_letter(&self, letter: &DeadLetter);
}

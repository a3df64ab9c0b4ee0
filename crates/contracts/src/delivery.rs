//! DeliveryMessage - the payload handed to a destination

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::{Destination, EventRecord, RouteId};

/// Payload for one (destination, message) pair produced by a dispatch
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeliveryMessage {
    pub route_id: RouteId,
    pub destination: Destination,
    pub base_url: String,
    pub identifier: String,
    pub resource_url: String,
    /// Effective event types; `Update` when the transport carried none
    pub event_types: BTreeSet<String>,
    pub timestamp_ms: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    pub agents: Vec<String>,
    pub resource_types: BTreeSet<String>,
    pub extras: BTreeMap<String, String>,
}

impl DeliveryMessage {
    /// Build the payload for `destination` from the inbound record
    pub fn from_record(route_id: RouteId, destination: Destination, record: &EventRecord) -> Self {
        Self {
            route_id,
            destination,
            base_url: record.base_url().to_string(),
            identifier: record.identifier().to_string(),
            resource_url: record.resource_url(),
            event_types: record.event_types().clone(),
            timestamp_ms: record.timestamp_ms(),
            timestamp: record.timestamp_rfc3339(),
            agents: record.agents().to_vec(),
            resource_types: record.resource_types().clone(),
            extras: record.extras().clone(),
        }
    }

    /// Attach an extra field (e.g. fixity evidence)
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Same payload, redirected to another destination
    pub fn redirect(&self, destination: Destination) -> Self {
        Self {
            destination,
            ..self.clone()
        }
    }
}

//! EventRecord - normalized repository change notification
//!
//! Created once at transport ingress and never mutated afterwards. The
//! builder enforces the record invariants: base URL and identifier are
//! non-empty, and the event type set is never empty.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

use crate::RouterError;

/// Event kind vocabulary
pub mod kinds {
    /// Injected when an inbound message carries no event type (reindexing).
    pub const UPDATE: &str = "Update";
    pub const NODE_ADDED: &str = "NODE_ADDED";
    pub const NODE_REMOVED: &str = "NODE_REMOVED";
    pub const PROPERTY_CHANGED: &str = "PROPERTY_CHANGED";
    pub const FIXITY: &str = "FIXITY";
    /// ActivityStreams deletion (`https://www.w3.org/ns/activitystreams#Delete`)
    pub const ACTIVITY_DELETE: &str = "Delete";

    /// Whether `kind` names `local`, either bare or as the fragment of a
    /// namespaced URI (`http://fedora.info/definitions/v4/event#NODE_REMOVED`).
    /// Comparison is case-sensitive.
    pub fn matches(kind: &str, local: &str) -> bool {
        kind == local
            || kind
                .rsplit_once('#')
                .is_some_and(|(_, fragment)| fragment == local)
    }

    /// Whether `kind` announces a deletion in either vocabulary
    pub fn is_removal(kind: &str) -> bool {
        matches(kind, NODE_REMOVED) || matches(kind, ACTIVITY_DELETE)
    }
}

/// One inbound notification
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EventRecord {
    base_url: String,
    identifier: String,
    timestamp_ms: i64,
    event_types: BTreeSet<String>,
    event_type_defaulted: bool,
    agents: Vec<String>,
    resource_types: BTreeSet<String>,
    extras: BTreeMap<String, String>,
}

impl EventRecord {
    /// Start building a record for `identifier` under `base_url`
    pub fn builder(base_url: impl Into<String>, identifier: impl Into<String>) -> EventRecordBuilder {
        EventRecordBuilder {
            base_url: base_url.into(),
            identifier: identifier.into(),
            timestamp_ms: None,
            event_types: BTreeSet::new(),
            agents: Vec::new(),
            resource_types: BTreeSet::new(),
            extras: BTreeMap::new(),
        }
    }

    /// Repository root
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Path of the affected resource
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Full resource URL (`base_url` + `identifier`)
    pub fn resource_url(&self) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            self.identifier.trim_start_matches('/')
        )
    }

    /// Event time, epoch millis
    pub fn timestamp_ms(&self) -> i64 {
        self.timestamp_ms
    }

    /// Event time as RFC 3339, if representable
    pub fn timestamp_rfc3339(&self) -> Option<String> {
        DateTime::<Utc>::from_timestamp_millis(self.timestamp_ms).map(|t| t.to_rfc3339())
    }

    pub fn event_types(&self) -> &BTreeSet<String> {
        &self.event_types
    }

    /// True when the transport carried no event type and `Update` was injected
    pub fn event_type_defaulted(&self) -> bool {
        self.event_type_defaulted
    }

    pub fn agents(&self) -> &[String] {
        &self.agents
    }

    /// Types known at notification time (may be empty)
    pub fn resource_types(&self) -> &BTreeSet<String> {
        &self.resource_types
    }

    pub fn extras(&self) -> &BTreeMap<String, String> {
        &self.extras
    }

    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }

    /// Whether any event type names `local` (see [`kinds::matches`])
    pub fn has_event_kind(&self, local: &str) -> bool {
        self.event_types.iter().any(|k| kinds::matches(k, local))
    }
}

/// Builder for [`EventRecord`]
#[derive(Debug, Clone)]
pub struct EventRecordBuilder {
    base_url: String,
    identifier: String,
    timestamp_ms: Option<i64>,
    event_types: BTreeSet<String>,
    agents: Vec<String>,
    resource_types: BTreeSet<String>,
    extras: BTreeMap<String, String>,
}

impl EventRecordBuilder {
    pub fn timestamp_ms(mut self, timestamp_ms: i64) -> Self {
        self.timestamp_ms = Some(timestamp_ms);
        self
    }

    pub fn event_type(mut self, kind: impl Into<String>) -> Self {
        self.event_types.insert(kind.into());
        self
    }

    pub fn event_types<I, S>(mut self, kinds: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.event_types.extend(kinds.into_iter().map(Into::into));
        self
    }

    pub fn agent(mut self, agent: impl Into<String>) -> Self {
        self.agents.push(agent.into());
        self
    }

    pub fn agents<I, S>(mut self, agents: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.agents.extend(agents.into_iter().map(Into::into));
        self
    }

    pub fn resource_type(mut self, uri: impl Into<String>) -> Self {
        self.resource_types.insert(uri.into());
        self
    }

    pub fn resource_types<I, S>(mut self, uris: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.resource_types.extend(uris.into_iter().map(Into::into));
        self
    }

    pub fn extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Validate and freeze the record.
    ///
    /// An empty event type set becomes `{Update}`; a missing timestamp becomes
    /// the current time.
    ///
    /// # Errors
    /// `MalformedEvent` when the base URL or identifier is empty.
    pub fn build(self) -> Result<EventRecord, RouterError> {
        if self.base_url.trim().is_empty() {
            return Err(RouterError::malformed("base_url", "missing repository base URL"));
        }
        if self.identifier.trim().is_empty() {
            return Err(RouterError::malformed("identifier", "missing resource identifier"));
        }

        let mut event_types: BTreeSet<String> = self
            .event_types
            .into_iter()
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .collect();
        let event_type_defaulted = event_types.is_empty();
        if event_type_defaulted {
            event_types.insert(kinds::UPDATE.to_string());
        }

        Ok(EventRecord {
            base_url: self.base_url,
            identifier: self.identifier,
            timestamp_ms: self
                .timestamp_ms
                .unwrap_or_else(|| Utc::now().timestamp_millis()),
            event_types,
            event_type_defaulted,
            agents: self.agents,
            resource_types: self.resource_types,
            extras: self.extras,
        })
    }
}

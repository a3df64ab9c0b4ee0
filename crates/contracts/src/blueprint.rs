//! RouterBlueprint - Config Loader output
//!
//! Describes the repository endpoint, route defaults, and one optional table
//! per route. A route whose table is absent, or has `enabled = false`, is not
//! constructed at all.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

use crate::{repository::types, Destination, RouteId};

/// Config version
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ConfigVersion {
    #[default]
    V1,
}

/// Complete router configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouterBlueprint {
    #[serde(default)]
    pub version: ConfigVersion,

    /// Repository endpoint and vocabulary
    #[validate(nested)]
    pub repository: RepositoryConfig,

    /// Settings shared by every route unless overridden
    #[serde(default)]
    #[validate(nested)]
    pub defaults: RouteDefaults,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub indexing: Option<IndexingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub forwarding: Option<ForwardingConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub serialization: Option<SerializationConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(nested)]
    pub fixity: Option<FixityConfig>,
}

/// Repository endpoint
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RepositoryConfig {
    /// Repository root (e.g. "http://localhost:8080/rest")
    #[validate(length(min = 1, message = "repository base_url cannot be empty"))]
    pub base_url: String,

    #[serde(default)]
    pub username: String,

    #[serde(default)]
    pub password: String,

    /// RDF type marking binaries
    #[serde(default = "default_binary_type")]
    pub binary_type: String,

    /// RDF type marking resources that opt into indexing
    #[serde(default = "default_indexable_type")]
    pub indexable_type: String,

    /// Request timeout (ms)
    #[serde(default = "default_timeout_ms")]
    #[validate(range(min = 1))]
    pub timeout_ms: u64,
}

fn default_binary_type() -> String {
    types::BINARY.to_string()
}

fn default_indexable_type() -> String {
    types::INDEXABLE.to_string()
}

fn default_timeout_ms() -> u64 {
    30_000
}

/// Defaults applied to every route
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouteDefaults {
    /// Redeliveries after the initial attempt
    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,

    /// Pause between attempts (ms)
    #[serde(default)]
    pub redelivery_delay_ms: u64,

    /// Workers per route
    #[serde(default = "default_concurrent_consumers")]
    #[validate(range(min = 1))]
    pub concurrent_consumers: usize,

    /// Path prefixes whose events are dropped by every route
    #[serde(default)]
    pub excluded_containers: Vec<String>,

    /// Inbound queue capacity per route
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
}

impl Default for RouteDefaults {
    fn default() -> Self {
        Self {
            max_redeliveries: default_max_redeliveries(),
            redelivery_delay_ms: 0,
            concurrent_consumers: default_concurrent_consumers(),
            excluded_containers: Vec::new(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

fn default_max_redeliveries() -> u32 {
    10
}

fn default_concurrent_consumers() -> usize {
    1
}

fn default_queue_capacity() -> usize {
    100
}

/// Per-route overrides and destination bindings
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RouteSettings {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_redeliveries: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub redelivery_delay_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[validate(range(min = 1))]
    pub concurrent_consumers: Option<usize>,

    /// Replaces (not extends) the default exclusion list
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub excluded_containers: Option<Vec<String>>,

    /// Destination name -> sink binding
    #[serde(default)]
    pub destinations: Vec<SinkConfig>,
}

impl Default for RouteSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            max_redeliveries: None,
            redelivery_delay_ms: None,
            concurrent_consumers: None,
            excluded_containers: None,
            destinations: Vec::new(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

impl RouteSettings {
    /// Merge with defaults into the settings a running route uses
    pub fn resolve(&self, defaults: &RouteDefaults) -> EffectiveSettings {
        EffectiveSettings {
            max_redeliveries: self.max_redeliveries.unwrap_or(defaults.max_redeliveries),
            redelivery_delay: Duration::from_millis(
                self.redelivery_delay_ms
                    .unwrap_or(defaults.redelivery_delay_ms),
            ),
            concurrent_consumers: self
                .concurrent_consumers
                .unwrap_or(defaults.concurrent_consumers),
            excluded_containers: self
                .excluded_containers
                .clone()
                .unwrap_or_else(|| defaults.excluded_containers.clone()),
            queue_capacity: defaults.queue_capacity,
        }
    }
}

/// Resolved route settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectiveSettings {
    pub max_redeliveries: u32,
    pub redelivery_delay: Duration,
    pub concurrent_consumers: usize,
    pub excluded_containers: Vec<String>,
    pub queue_capacity: usize,
}

impl Default for EffectiveSettings {
    fn default() -> Self {
        RouteSettings::default().resolve(&RouteDefaults::default())
    }
}

/// Search index / triplestore route
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct IndexingConfig {
    #[serde(flatten)]
    #[validate(nested)]
    pub settings: RouteSettings,

    /// Index every non-deleted resource, ignoring the indexable marker
    #[serde(default)]
    pub indexing_is_unconditional: bool,
}

/// External HTTP sink route
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct ForwardingConfig {
    #[serde(flatten)]
    #[validate(nested)]
    pub settings: RouteSettings,

    /// Endpoint receiving forwarded events; empty routes to `misconfigured`
    #[serde(default)]
    pub http_base_url: String,

    /// Empty means no Authorization header
    #[serde(default)]
    pub http_auth_username: String,

    #[serde(default)]
    pub http_auth_password: String,
}

/// Archival serializer route
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct SerializationConfig {
    #[serde(flatten)]
    #[validate(nested)]
    pub settings: RouteSettings,

    /// Archive binary content on create/update
    #[serde(default)]
    pub include_binaries: bool,
}

/// Fixity-check route
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct FixityConfig {
    #[serde(flatten)]
    #[validate(nested)]
    pub settings: RouteSettings,

    /// Pause before each fixity request (ms)
    #[serde(default)]
    pub fixity_delay_ms: u64,
}

/// Sink binding for one destination
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Destination name (e.g. "update-index")
    pub name: Destination,

    /// Sink type
    pub sink_type: SinkType,

    /// Queue capacity
    #[serde(default = "default_sink_queue_capacity")]
    pub queue_capacity: usize,

    /// Type-specific parameters
    #[serde(default)]
    pub params: HashMap<String, String>,
}

fn default_sink_queue_capacity() -> usize {
    100
}

/// Sink type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkType {
    /// Log output
    Log,
    /// File archive (write or delete by identifier)
    File,
    /// HTTP POST
    Http,
}

impl RouterBlueprint {
    /// Settings table for `route`, if the route is present and enabled
    pub fn route_settings(&self, route: RouteId) -> Option<&RouteSettings> {
        let settings = match route {
            RouteId::Indexing => self.indexing.as_ref().map(|c| &c.settings),
            RouteId::Forwarding => self.forwarding.as_ref().map(|c| &c.settings),
            RouteId::Serialization => self.serialization.as_ref().map(|c| &c.settings),
            RouteId::Fixity => self.fixity.as_ref().map(|c| &c.settings),
        }?;
        settings.enabled.then_some(settings)
    }

    /// Routes that will be constructed
    pub fn enabled_routes(&self) -> Vec<RouteId> {
        RouteId::ALL
            .into_iter()
            .filter(|route| self.route_settings(*route).is_some())
            .collect()
    }

    /// Resolved settings for `route`, if enabled
    pub fn effective_settings(&self, route: RouteId) -> Option<EffectiveSettings> {
        self.route_settings(route)
            .map(|settings| settings.resolve(&self.defaults))
    }

    /// Minimal blueprint with every route absent
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            version: ConfigVersion::V1,
            repository: RepositoryConfig {
                base_url: base_url.into(),
                username: String::new(),
                password: String::new(),
                binary_type: default_binary_type(),
                indexable_type: default_indexable_type(),
                timeout_ms: default_timeout_ms(),
            },
            defaults: RouteDefaults::default(),
            indexing: None,
            forwarding: None,
            serialization: None,
            fixity: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = EffectiveSettings::default();
        assert_eq!(settings.max_redeliveries, 10);
        assert_eq!(settings.redelivery_delay, Duration::ZERO);
        assert_eq!(settings.concurrent_consumers, 1);
        assert!(settings.excluded_containers.is_empty());
    }

    #[test]
    fn test_overrides_replace_defaults() {
        let defaults = RouteDefaults {
            excluded_containers: vec!["/audit".into()],
            ..Default::default()
        };
        let settings = RouteSettings {
            max_redeliveries: Some(3),
            concurrent_consumers: Some(4),
            excluded_containers: Some(vec!["/tmp".into()]),
            ..Default::default()
        };
        let resolved = settings.resolve(&defaults);
        assert_eq!(resolved.max_redeliveries, 3);
        assert_eq!(resolved.concurrent_consumers, 4);
        assert_eq!(resolved.excluded_containers, vec!["/tmp".to_string()]);
    }

    #[test]
    fn test_disabled_route_is_absent() {
        let mut blueprint = RouterBlueprint::new("http://localhost/rest");
        blueprint.indexing = Some(IndexingConfig::default());
        blueprint.fixity = Some(FixityConfig {
            settings: RouteSettings {
                enabled: false,
                ..Default::default()
            },
            fixity_delay_ms: 0,
        });
        assert_eq!(blueprint.enabled_routes(), vec![RouteId::Indexing]);
        assert!(blueprint.effective_settings(RouteId::Fixity).is_none());
    }
}

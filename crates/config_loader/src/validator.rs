//! Configuration validation
//!
//! Rules:
//! - field-level constraints declared on the config types (non-empty base_url,
//!   concurrent_consumers >= 1, ...)
//! - repository base_url is an http(s) URL
//! - excluded containers are absolute paths
//! - destination bindings are unique per route and name a destination the
//!   route can select
//! - every destination a route always routes to is bound; `forward-http` may
//!   be synthesized from `http_base_url`, and `update-binary` is only required
//!   when binaries are archived
//! - sink-specific required params are present

use std::collections::HashSet;

use contracts::{Destination, RouteId, RouteSettings, RouterBlueprint, RouterError, SinkType};
use validator::Validate;

/// Validate a RouterBlueprint
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(blueprint: &RouterBlueprint) -> Result<(), RouterError> {
    validate_fields(blueprint)?;
    validate_repository(blueprint)?;
    validate_excluded_containers("defaults", &blueprint.defaults.excluded_containers)?;

    for route in blueprint.enabled_routes() {
        let Some(settings) = blueprint.route_settings(route) else {
            continue;
        };
        if let Some(ref containers) = settings.excluded_containers {
            validate_excluded_containers(route.as_str(), containers)?;
        }
        validate_bindings(route, settings)?;
        validate_required(route, settings, &required_destinations(blueprint, route))?;
    }
    Ok(())
}

/// Non-fatal issues worth reporting before a run
pub fn warnings(blueprint: &RouterBlueprint) -> Vec<String> {
    let mut warnings = Vec::new();

    if blueprint.enabled_routes().is_empty() {
        warnings.push("No routes enabled - every event will be dropped".to_string());
    }

    if let Some(ref forwarding) = blueprint.forwarding {
        if forwarding.settings.enabled
            && forwarding.http_base_url.trim().is_empty()
            && !is_bound(&forwarding.settings, &Destination::FORWARD_HTTP)
        {
            warnings.push(
                "forwarding.http_base_url is empty - forwarded events go to 'misconfigured'"
                    .to_string(),
            );
        }
    }

    if let Some(ref serialization) = blueprint.serialization {
        if serialization.settings.enabled
            && !serialization.include_binaries
            && is_bound(&serialization.settings, &Destination::UPDATE_BINARY)
        {
            warnings.push(
                "serialization.update-binary is bound but include_binaries = false".to_string(),
            );
        }
    }

    warnings
}

fn validate_fields(blueprint: &RouterBlueprint) -> Result<(), RouterError> {
    blueprint
        .validate()
        .map_err(|e| RouterError::configuration("blueprint", e.to_string()))
}

fn validate_repository(blueprint: &RouterBlueprint) -> Result<(), RouterError> {
    let base_url = &blueprint.repository.base_url;
    if !(base_url.starts_with("http://") || base_url.starts_with("https://")) {
        return Err(RouterError::configuration(
            "repository.base_url",
            format!("expected an http(s) URL, got '{base_url}'"),
        ));
    }
    Ok(())
}

fn validate_excluded_containers(scope: &str, containers: &[String]) -> Result<(), RouterError> {
    for (idx, container) in containers.iter().enumerate() {
        if !container.starts_with('/') {
            return Err(RouterError::configuration(
                format!("{scope}.excluded_containers[{idx}]"),
                format!("container path must start with '/', got '{container}'"),
            ));
        }
    }
    Ok(())
}

fn validate_bindings(route: RouteId, settings: &RouteSettings) -> Result<(), RouterError> {
    let mut seen = HashSet::new();
    for (idx, sink) in settings.destinations.iter().enumerate() {
        let field = format!("{route}.destinations[{idx}]");

        if !seen.insert(sink.name.as_str()) {
            return Err(RouterError::configuration(
                field,
                format!("duplicate destination '{}'", sink.name),
            ));
        }

        if sink.name != Destination::MISCONFIGURED && !route.destinations().contains(&sink.name) {
            return Err(RouterError::configuration(
                field,
                format!("route '{route}' never routes to '{}'", sink.name),
            ));
        }

        let required_param = match sink.sink_type {
            SinkType::Log => None,
            SinkType::File => Some("base_path"),
            SinkType::Http => Some("url"),
        };
        if let Some(param) = required_param {
            if sink.params.get(param).is_none_or(|v| v.trim().is_empty()) {
                return Err(RouterError::configuration(
                    format!("{field}.params.{param}"),
                    format!("{:?} sink '{}' requires '{param}'", sink.sink_type, sink.name),
                ));
            }
        }
    }
    Ok(())
}

fn validate_required(
    route: RouteId,
    settings: &RouteSettings,
    required: &[Destination],
) -> Result<(), RouterError> {
    for destination in required {
        if !is_bound(settings, destination) {
            return Err(RouterError::configuration(
                format!("{route}.destinations"),
                format!("missing binding for destination '{destination}'"),
            ));
        }
    }
    Ok(())
}

/// Destinations that must be bound in the config file for `route`
fn required_destinations(blueprint: &RouterBlueprint, route: RouteId) -> Vec<Destination> {
    match route {
        RouteId::Serialization => {
            let include_binaries = blueprint
                .serialization
                .as_ref()
                .is_some_and(|c| c.include_binaries);
            route
                .destinations()
                .iter()
                .filter(|d| include_binaries || **d != Destination::UPDATE_BINARY)
                .cloned()
                .collect()
        }
        // Synthesized from http_base_url, or sent to `misconfigured`
        RouteId::Forwarding => Vec::new(),
        RouteId::Indexing | RouteId::Fixity => route.destinations().to_vec(),
    }
}

fn is_bound(settings: &RouteSettings, destination: &Destination) -> bool {
    settings.destinations.iter().any(|s| &s.name == destination)
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::{
        FixityConfig, ForwardingConfig, IndexingConfig, SerializationConfig, SinkConfig,
    };
    use std::collections::HashMap;

    fn log_sink(name: Destination) -> SinkConfig {
        SinkConfig {
            name,
            sink_type: SinkType::Log,
            queue_capacity: 10,
            params: HashMap::new(),
        }
    }

    fn settings_with(destinations: Vec<SinkConfig>) -> RouteSettings {
        RouteSettings {
            destinations,
            ..Default::default()
        }
    }

    fn indexing_blueprint() -> RouterBlueprint {
        let mut bp = RouterBlueprint::new("http://localhost:8080/rest");
        bp.indexing = Some(IndexingConfig {
            settings: settings_with(vec![
                log_sink(Destination::UPDATE_INDEX),
                log_sink(Destination::DELETE_INDEX),
            ]),
            indexing_is_unconditional: false,
        });
        bp
    }

    #[test]
    fn test_valid_indexing_blueprint() {
        assert!(validate(&indexing_blueprint()).is_ok());
    }

    #[test]
    fn test_empty_base_url_rejected() {
        let mut bp = indexing_blueprint();
        bp.repository.base_url = String::new();
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_non_http_base_url_rejected() {
        let mut bp = indexing_blueprint();
        bp.repository.base_url = "ftp://repo".into();
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("http(s)"));
    }

    #[test]
    fn test_zero_consumers_rejected() {
        let mut bp = indexing_blueprint();
        bp.defaults.concurrent_consumers = 0;
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_relative_excluded_container_rejected() {
        let mut bp = indexing_blueprint();
        bp.defaults.excluded_containers = vec!["audit".into()];
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("must start with '/'"));
    }

    #[test]
    fn test_duplicate_binding_rejected() {
        let mut bp = indexing_blueprint();
        if let Some(ref mut indexing) = bp.indexing {
            indexing
                .settings
                .destinations
                .push(log_sink(Destination::UPDATE_INDEX));
        }
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("duplicate"));
    }

    #[test]
    fn test_foreign_destination_rejected() {
        let mut bp = indexing_blueprint();
        if let Some(ref mut indexing) = bp.indexing {
            indexing
                .settings
                .destinations
                .push(log_sink(Destination::FIXITY_SUCCESS));
        }
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("never routes to"));
    }

    #[test]
    fn test_missing_required_binding_rejected() {
        let mut bp = RouterBlueprint::new("http://localhost/rest");
        bp.fixity = Some(FixityConfig {
            settings: settings_with(vec![log_sink(Destination::FIXITY_SUCCESS)]),
            fixity_delay_ms: 0,
        });
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("fixity-failure"));
    }

    #[test]
    fn test_update_binary_required_only_with_binaries() {
        let mut bp = RouterBlueprint::new("http://localhost/rest");
        bp.serialization = Some(SerializationConfig {
            settings: settings_with(vec![
                log_sink(Destination::UPDATE_METADATA),
                log_sink(Destination::DELETE_METADATA),
                log_sink(Destination::DELETE_BINARY),
            ]),
            include_binaries: false,
        });
        assert!(validate(&bp).is_ok());

        if let Some(ref mut serialization) = bp.serialization {
            serialization.include_binaries = true;
        }
        assert!(validate(&bp).is_err());
    }

    #[test]
    fn test_file_sink_requires_base_path() {
        let mut bp = indexing_blueprint();
        if let Some(ref mut indexing) = bp.indexing {
            indexing.settings.destinations[0].sink_type = SinkType::File;
        }
        let err = validate(&bp).unwrap_err();
        assert!(err.to_string().contains("base_path"));
    }

    #[test]
    fn test_disabled_route_not_validated() {
        let mut bp = RouterBlueprint::new("http://localhost/rest");
        bp.fixity = Some(FixityConfig {
            settings: RouteSettings {
                enabled: false,
                ..Default::default()
            },
            fixity_delay_ms: 0,
        });
        assert!(validate(&bp).is_ok());
    }

    #[test]
    fn test_forwarding_warning_without_base_url() {
        let mut bp = RouterBlueprint::new("http://localhost/rest");
        bp.forwarding = Some(ForwardingConfig::default());
        assert!(validate(&bp).is_ok());
        let warnings = warnings(&bp);
        assert!(warnings.iter().any(|w| w.contains("misconfigured")));
    }
}

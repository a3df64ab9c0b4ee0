//! `info` command implementation.

use anyhow::{Context, Result};
use contracts::{RouteId, RouterBlueprint};
use serde::Serialize;
use tracing::info;

use crate::cli::InfoArgs;

/// Configuration info for JSON output
#[derive(Serialize)]
struct ConfigInfo {
    version: String,
    repository: RepositoryInfo,
    routes: Vec<RouteInfo>,
}

#[derive(Serialize)]
struct RepositoryInfo {
    base_url: String,
    authenticated: bool,
    binary_type: String,
    indexable_type: String,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct RouteInfo {
    route: RouteId,
    max_redeliveries: u32,
    redelivery_delay_ms: u128,
    concurrent_consumers: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    excluded_containers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    destinations: Vec<DestinationInfo>,
}

#[derive(Serialize)]
struct DestinationInfo {
    name: String,
    sink_type: String,
}

/// Execute the `info` command
pub fn run_info(args: &InfoArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration info");

    let blueprint = super::load_blueprint(&args.config, None)?;
    let info = build_config_info(&blueprint, args);

    if args.json {
        let json =
            serde_json::to_string_pretty(&info).context("Failed to serialize config info")?;
        println!("{}", json);
    } else {
        print_config_info(&info);
    }

    Ok(())
}

fn build_config_info(blueprint: &RouterBlueprint, args: &InfoArgs) -> ConfigInfo {
    let routes = blueprint
        .enabled_routes()
        .into_iter()
        .filter_map(|route| {
            let settings = blueprint.route_settings(route)?;
            let effective = settings.resolve(&blueprint.defaults);
            let destinations = if args.destinations {
                settings
                    .destinations
                    .iter()
                    .map(|d| DestinationInfo {
                        name: d.name.to_string(),
                        sink_type: format!("{:?}", d.sink_type),
                    })
                    .collect()
            } else {
                Vec::new()
            };
            Some(RouteInfo {
                route,
                max_redeliveries: effective.max_redeliveries,
                redelivery_delay_ms: effective.redelivery_delay.as_millis(),
                concurrent_consumers: effective.concurrent_consumers,
                excluded_containers: effective.excluded_containers,
                destinations,
            })
        })
        .collect();

    let repository = &blueprint.repository;
    ConfigInfo {
        version: format!("{:?}", blueprint.version),
        repository: RepositoryInfo {
            base_url: repository.base_url.clone(),
            authenticated: !repository.username.is_empty(),
            binary_type: repository.binary_type.clone(),
            indexable_type: repository.indexable_type.clone(),
            timeout_ms: repository.timeout_ms,
        },
        routes,
    }
}

fn print_config_info(info: &ConfigInfo) {
    println!("=== Relay Configuration ===\n");

    println!("Repository");
    println!("  Version: {}", info.version);
    println!("  Base URL: {}", info.repository.base_url);
    println!("  Authenticated: {}", info.repository.authenticated);
    println!("  Binary type: {}", info.repository.binary_type);
    println!("  Indexable type: {}", info.repository.indexable_type);

    println!("\nRoutes ({})", info.routes.len());
    for route in &info.routes {
        println!(
            "  {} - redeliveries={} delay={}ms consumers={}",
            route.route,
            route.max_redeliveries,
            route.redelivery_delay_ms,
            route.concurrent_consumers
        );
        if !route.excluded_containers.is_empty() {
            println!("    excluded: {}", route.excluded_containers.join(", "));
        }
        for destination in &route.destinations {
            println!("    -> {} ({})", destination.name, destination.sink_type);
        }
    }
    println!();
}

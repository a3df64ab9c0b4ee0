//! `reindex` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::ReindexArgs;
use crate::pipeline::{Orchestrator, OrchestratorConfig};

/// Execute the `reindex` command
pub async fn run_reindex(args: &ReindexArgs) -> Result<()> {
    let blueprint = super::load_blueprint(&args.config, args.repository_url.as_deref())?;
    info!(
        route = %args.route,
        count = args.identifiers.len(),
        "Reindexing resources"
    );

    let orchestrator = Orchestrator::new(OrchestratorConfig {
        blueprint,
        input: String::new(),
        buffer_size: args.identifiers.len().max(1),
        metrics_port: None,
    });
    let stats = orchestrator
        .reindex(args.route, args.identifiers.clone())
        .await
        .context("Reindex failed")?;

    super::run::report(&stats, args.json)
}

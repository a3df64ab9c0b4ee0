//! `run` command implementation.

use anyhow::{Context, Result};
use tracing::info;

use crate::cli::RunArgs;
use crate::error::CliError;
use crate::pipeline::{Orchestrator, OrchestratorConfig, RunStats};

/// Execute the `run` command
pub async fn run_router(args: &RunArgs) -> Result<()> {
    info!(config = %args.config.display(), "Loading configuration");
    let blueprint = super::load_blueprint(&args.config, args.repository_url.as_deref())?;

    info!(
        repository = %blueprint.repository.base_url,
        routes = ?blueprint.enabled_routes(),
        "Configuration loaded"
    );

    if args.dry_run {
        info!("Dry run mode - configuration is valid, exiting");
        for warning in config_loader::warnings(&blueprint) {
            println!("warning: {warning}");
        }
        println!("Routes: {:?}", blueprint.enabled_routes());
        return Ok(());
    }

    let orchestrator = Orchestrator::new(OrchestratorConfig {
        blueprint,
        input: args.input.clone(),
        buffer_size: args.buffer_size,
        metrics_port: (args.metrics_port != 0).then_some(args.metrics_port),
    });

    info!(input = %args.input, "Starting router...");
    let stats = orchestrator
        .run(shutdown_signal())
        .await
        .context("Router run failed")?;

    report(&stats, args.json)?;
    info!("Relay finished");
    Ok(())
}

/// Print the summary and fail when anything was dead-lettered
pub(crate) fn report(stats: &RunStats, json: bool) -> Result<()> {
    info!(
        duration_secs = stats.duration.as_secs_f64(),
        malformed = stats.ingestion.malformed,
        dead_lettered = stats.summary.total_dead_lettered(),
        "Run complete"
    );
    if json {
        let rendered =
            serde_json::to_string_pretty(stats).context("Failed to serialize run summary")?;
        println!("{rendered}");
    } else {
        stats.print_summary();
    }

    match stats.summary.total_dead_lettered() {
        0 => Ok(()),
        count => Err(CliError::DeadLetters { count }.into()),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

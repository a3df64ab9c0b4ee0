//! Orchestrator - wires source, ingestion and router together.

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use contracts::{RouteId, RouterBlueprint};
use ingestion::{IngestionPipeline, JsonLinesSource, MetricsSnapshot};
use repository::HttpRepositoryClient;
use routes::Router;
use tracing::{info, warn};

use super::RunStats;
use crate::error::CliError;

/// Orchestrator configuration
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub blueprint: RouterBlueprint,

    /// JSON-lines input; `-` reads stdin
    pub input: String,

    /// Channel buffer size
    pub buffer_size: usize,

    /// Metrics server port (None = disabled)
    pub metrics_port: Option<u16>,
}

/// Main router orchestrator
pub struct Orchestrator {
    config: OrchestratorConfig,
}

impl Orchestrator {
    pub fn new(config: OrchestratorConfig) -> Self {
        Self { config }
    }

    fn start_router(&self) -> Result<Router<HttpRepositoryClient>> {
        let blueprint = &self.config.blueprint;

        if let Some(port) = self.config.metrics_port {
            observability::init_metrics_only(port)?;
            info!("Metrics endpoint available on port {}", port);
        }

        let fetcher = HttpRepositoryClient::new(&blueprint.repository)
            .context("Failed to build repository client")?;
        let router = Router::from_blueprint(blueprint, Arc::new(fetcher))
            .map_err(CliError::router)?;

        info!(
            repository = %blueprint.repository.base_url,
            routes = ?router.routes(),
            "Router started"
        );
        Ok(router)
    }

    /// Route events until the input ends or `shutdown` resolves, then drain.
    pub async fn run<S>(self, shutdown: S) -> Result<RunStats>
    where
        S: Future<Output = ()>,
    {
        let start_time = Instant::now();
        let router = self.start_router()?;

        let (raw_tx, raw_rx) = async_channel::bounded(self.config.buffer_size.max(1));
        let mut ingestion = IngestionPipeline::new(self.config.buffer_size);
        let records = ingestion
            .take_receiver()
            .context("ingestion receiver already taken")?;
        let ingest_task = ingestion.start(raw_rx);
        let ingestion_metrics = ingestion.into_metrics();

        let source = JsonLinesSource::from_arg(&self.config.input);
        let source_task = tokio::spawn(source.run(raw_tx));

        tokio::pin!(shutdown);
        let mut interrupted = false;
        loop {
            tokio::select! {
                received = records.recv() => {
                    let Ok(record) = received else { break };
                    router.publish(record).await.map_err(CliError::router)?;
                }
                _ = &mut shutdown => {
                    warn!("Received shutdown signal, stopping intake...");
                    interrupted = true;
                    break;
                }
            }
        }

        // Stop intake: closing the record channel stops ingestion, which in
        // turn closes the source's channel.
        records.close();
        if interrupted {
            source_task.abort();
        }
        match source_task.await {
            Ok(Ok(forwarded)) => info!(forwarded, "Source finished"),
            Ok(Err(e)) => warn!(error = %e, "Source failed"),
            Err(e) if e.is_cancelled() => info!("Source stopped"),
            Err(e) => warn!(error = %e, "Source task panicked"),
        }
        if let Err(e) = ingest_task.await {
            warn!(error = %e, "Ingestion task panicked");
        }

        info!("Draining route queues...");
        let summary = router.shutdown().await;

        Ok(RunStats {
            duration: start_time.elapsed(),
            ingestion: ingestion_metrics.snapshot(),
            summary,
            interrupted,
        })
    }

    /// Push reindex events for `identifiers` through `route`, then drain.
    pub async fn reindex(self, route: RouteId, identifiers: Vec<String>) -> Result<RunStats> {
        let start_time = Instant::now();
        if self.config.blueprint.route_settings(route).is_none() {
            return Err(CliError::RouteDisabled { route }.into());
        }

        let router = self.start_router()?;
        let base_url = self.config.blueprint.repository.base_url.clone();
        let queued = router
            .reindex(route, &base_url, identifiers)
            .await
            .map_err(CliError::router)?;
        info!(route = %route, queued, "Reindex events queued");

        let summary = router.shutdown().await;
        Ok(RunStats {
            duration: start_time.elapsed(),
            ingestion: MetricsSnapshot::default(),
            summary,
            interrupted: false,
        })
    }
}

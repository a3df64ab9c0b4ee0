//! Router - one queue and worker pool per enabled route
//!
//! Every published record is offered to every running route. Routes never
//! share workers, so a slow sink on one route only backs up that route's
//! queue.

use std::sync::Arc;
use std::time::Duration;

use async_channel::{Receiver, Sender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument, warn};

use classifier::{Classifier, ExclusionList};
use contracts::{
    DeadLetterHook, Destination, EventRecord, ForwardingConfig, ResourceFetcher, RouteId,
    RouteSettings, RouterBlueprint, RouterError,
};
use dispatcher::{
    Dispatcher, DispatcherBuilder, DispatcherError, FanOut, HttpSink, HttpSinkConfig,
    LoggingDeadLetterHook, RetryPolicy,
};

use crate::fixity::FixitySequence;
use crate::pipeline::{Pipeline, RouteLogic};
use crate::stats::{RouteSummary, RunSummary, SinkSummary};
use crate::{forwarding, indexing, serialization};

/// Queue and worker sizing for one route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteCapacity {
    pub queue_capacity: usize,
    pub concurrent_consumers: usize,
}

impl Default for RouteCapacity {
    fn default() -> Self {
        Self {
            queue_capacity: 100,
            concurrent_consumers: 1,
        }
    }
}

struct RunningRoute<F> {
    route_id: RouteId,
    tx: Sender<EventRecord>,
    workers: Vec<JoinHandle<()>>,
    pipeline: Arc<Pipeline<F>>,
}

/// Builder for [`Router`]
pub struct RouterBuilder<F> {
    routes: Vec<(Pipeline<F>, RouteCapacity)>,
}

impl<F> Default for RouterBuilder<F> {
    fn default() -> Self {
        Self { routes: Vec::new() }
    }
}

impl<F> RouterBuilder<F>
where
    F: ResourceFetcher + Send + Sync + 'static,
{
    /// Add a route. A second pipeline for the same route is rejected.
    pub fn route(
        mut self,
        pipeline: Pipeline<F>,
        capacity: RouteCapacity,
    ) -> Result<Self, RouterError> {
        let route_id = pipeline.route_id();
        if self.routes.iter().any(|(p, _)| p.route_id() == route_id) {
            return Err(RouterError::configuration(
                route_id.as_str(),
                "route registered more than once",
            ));
        }
        self.routes.push((pipeline, capacity));
        Ok(self)
    }

    /// Spawn every route's workers. Must be called inside a tokio runtime.
    pub fn start(self) -> Router<F> {
        let routes = self
            .routes
            .into_iter()
            .map(|(pipeline, capacity)| spawn_route(pipeline, capacity))
            .collect();
        Router { routes }
    }
}

fn spawn_route<F>(pipeline: Pipeline<F>, capacity: RouteCapacity) -> RunningRoute<F>
where
    F: ResourceFetcher + Send + Sync + 'static,
{
    let route_id = pipeline.route_id();
    let (tx, rx) = async_channel::bounded(capacity.queue_capacity.max(1));
    let pipeline = Arc::new(pipeline);
    let consumers = capacity.concurrent_consumers.max(1);

    let workers = (0..consumers)
        .map(|worker| tokio::spawn(worker_loop(worker, rx.clone(), Arc::clone(&pipeline))))
        .collect();

    info!(
        route_id = %route_id,
        consumers,
        queue_capacity = capacity.queue_capacity,
        "route started"
    );
    RunningRoute {
        route_id,
        tx,
        workers,
        pipeline,
    }
}

async fn worker_loop<F>(worker: usize, rx: Receiver<EventRecord>, pipeline: Arc<Pipeline<F>>)
where
    F: ResourceFetcher + Send + Sync + 'static,
{
    while let Ok(record) = rx.recv().await {
        let outcome = pipeline.process(&record).await;
        debug!(
            route_id = %pipeline.route_id(),
            worker,
            identifier = %record.identifier(),
            outcome = ?outcome,
            "record processed"
        );
    }
    debug!(route_id = %pipeline.route_id(), worker, "route worker stopped");
}

/// Running router
pub struct Router<F> {
    routes: Vec<RunningRoute<F>>,
}

impl<F> Router<F>
where
    F: ResourceFetcher + Send + Sync + 'static,
{
    pub fn builder() -> RouterBuilder<F> {
        RouterBuilder::default()
    }

    /// Build and start every enabled route from `blueprint`, dead-lettering
    /// through the logging hook.
    pub fn from_blueprint(blueprint: &RouterBlueprint, fetcher: Arc<F>) -> Result<Self, DispatcherError> {
        Self::from_blueprint_with_hook(blueprint, fetcher, Arc::new(LoggingDeadLetterHook))
    }

    #[instrument(
        name = "router_from_blueprint",
        skip(blueprint, fetcher, hook),
        fields(routes = blueprint.enabled_routes().len())
    )]
    pub fn from_blueprint_with_hook(
        blueprint: &RouterBlueprint,
        fetcher: Arc<F>,
        hook: Arc<dyn DeadLetterHook>,
    ) -> Result<Self, DispatcherError> {
        let mut builder = Self::builder();
        for route_id in blueprint.enabled_routes() {
            let (pipeline, capacity) =
                build_pipeline(blueprint, route_id, Arc::clone(&fetcher), Arc::clone(&hook))?;
            builder = builder.route(pipeline, capacity)?;
        }
        if builder.routes.is_empty() {
            warn!("no routes enabled; published events will be dropped");
        }
        Ok(builder.start())
    }

    /// Routes that are running
    pub fn routes(&self) -> Vec<RouteId> {
        self.routes.iter().map(|r| r.route_id).collect()
    }

    /// Offer `record` to every running route. Waits while a route's queue is
    /// full.
    ///
    /// # Errors
    /// `Configuration` when a route has already stopped accepting events.
    pub async fn publish(&self, record: EventRecord) -> Result<(), RouterError> {
        for route in &self.routes {
            self.enqueue(route, record.clone()).await?;
        }
        Ok(())
    }

    /// Offer `record` to one route only
    pub async fn publish_to(&self, route_id: RouteId, record: EventRecord) -> Result<(), RouterError> {
        let route = self.running(route_id)?;
        self.enqueue(route, record).await
    }

    /// Queue reindex events for `identifiers` on one route.
    ///
    /// Reindex events carry no event type, so they take the `Update` path.
    ///
    /// # Errors
    /// `Configuration` for a route that is not running, `MalformedEvent` for
    /// a blank identifier.
    #[instrument(name = "router_reindex", skip(self, base_url, identifiers), fields(route_id = %route_id))]
    pub async fn reindex<I, S>(
        &self,
        route_id: RouteId,
        base_url: &str,
        identifiers: I,
    ) -> Result<u64, RouterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let route = self.running(route_id)?;
        let mut queued = 0;
        for identifier in identifiers {
            let record = EventRecord::builder(base_url, identifier).build()?;
            self.enqueue(route, record).await?;
            queued += 1;
        }
        info!(queued, "reindex events queued");
        Ok(queued)
    }

    fn running(&self, route_id: RouteId) -> Result<&RunningRoute<F>, RouterError> {
        self.routes
            .iter()
            .find(|r| r.route_id == route_id)
            .ok_or_else(|| RouterError::configuration(route_id.as_str(), "route is not enabled"))
    }

    async fn enqueue(&self, route: &RunningRoute<F>, record: EventRecord) -> Result<(), RouterError> {
        route.tx.send(record).await.map_err(|_| {
            RouterError::configuration(route.route_id.as_str(), "route is no longer accepting events")
        })
    }

    /// Stop accepting events, drain every queue, and tear down sinks.
    #[instrument(name = "router_shutdown", skip(self))]
    pub async fn shutdown(self) -> RunSummary {
        for route in &self.routes {
            route.tx.close();
        }

        let mut summary = RunSummary::default();
        for route in self.routes {
            for worker in route.workers {
                if let Err(e) = worker.await {
                    error!(route_id = %route.route_id, error = %e, "route worker panicked");
                }
            }

            let stats = route.pipeline.stats().snapshot();
            let sinks = route
                .pipeline
                .dispatcher()
                .metrics()
                .into_iter()
                .map(|(destination, snapshot)| SinkSummary::from_snapshot(destination, snapshot))
                .collect();
            summary.routes.push(RouteSummary {
                route_id: route.route_id,
                stats,
                sinks,
            });

            match Arc::try_unwrap(route.pipeline) {
                Ok(pipeline) => pipeline.shutdown().await,
                Err(_) => error!(route_id = %route.route_id, "route pipeline still shared at shutdown"),
            }
        }

        info!(routes = summary.routes.len(), "router stopped");
        summary
    }
}

/// Build one route's pipeline from the blueprint
pub fn build_pipeline<F>(
    blueprint: &RouterBlueprint,
    route_id: RouteId,
    fetcher: Arc<F>,
    hook: Arc<dyn DeadLetterHook>,
) -> Result<(Pipeline<F>, RouteCapacity), DispatcherError>
where
    F: ResourceFetcher + Send + Sync + 'static,
{
    let (Some(route_settings), Some(settings)) = (
        blueprint.route_settings(route_id),
        blueprint.effective_settings(route_id),
    ) else {
        return Err(RouterError::configuration(route_id.as_str(), "route is not enabled").into());
    };
    let repository = &blueprint.repository;

    let mut classifier = Classifier::new(
        ExclusionList::new(&settings.excluded_containers),
        repository.binary_type.as_str(),
        repository.indexable_type.as_str(),
    );

    let mut dispatcher = Dispatcher::builder(route_id)
        .bind_all(&route_settings.destinations)?
        .retry(RetryPolicy::from_settings(&settings))
        .dead_letter_hook(hook);

    let logic = match route_id {
        RouteId::Indexing => {
            let unconditional = blueprint
                .indexing
                .as_ref()
                .is_some_and(|c| c.indexing_is_unconditional);
            classifier = classifier.with_unconditional_indexing(unconditional);
            RouteLogic::Table {
                rules: indexing::rules(),
                requirement: indexing::type_requirement(unconditional),
            }
        }
        RouteId::Forwarding => {
            if let Some(config) = blueprint.forwarding.as_ref() {
                dispatcher = bind_forward_http(dispatcher, route_settings, config, repository.timeout_ms)?;
            }
            RouteLogic::Table {
                rules: forwarding::rules(),
                requirement: forwarding::type_requirement(),
            }
        }
        RouteId::Serialization => {
            let include_binaries = blueprint
                .serialization
                .as_ref()
                .is_some_and(|c| c.include_binaries);
            dispatcher = dispatcher.fan_out(FanOut::Parallel);
            RouteLogic::Table {
                rules: serialization::rules(include_binaries),
                requirement: serialization::type_requirement(include_binaries),
            }
        }
        RouteId::Fixity => {
            let delay_ms = blueprint.fixity.as_ref().map_or(0, |c| c.fixity_delay_ms);
            RouteLogic::Fixity(FixitySequence::new(Duration::from_millis(delay_ms)))
        }
    };

    let capacity = RouteCapacity {
        queue_capacity: settings.queue_capacity,
        concurrent_consumers: settings.concurrent_consumers,
    };
    Ok((
        Pipeline::new(classifier, logic, dispatcher.build(), fetcher),
        capacity,
    ))
}

/// Bind `forward-http` to the configured endpoint unless an explicit sink
/// already claims it. An empty endpoint leaves it unbound, so events land on
/// `misconfigured`.
fn bind_forward_http(
    dispatcher: DispatcherBuilder,
    settings: &RouteSettings,
    config: &ForwardingConfig,
    timeout_ms: u64,
) -> Result<DispatcherBuilder, DispatcherError> {
    if settings
        .destinations
        .iter()
        .any(|d| d.name == Destination::FORWARD_HTTP)
    {
        return Ok(dispatcher);
    }
    if config.http_base_url.trim().is_empty() {
        warn!("forwarding enabled without http_base_url; events will be routed to misconfigured");
        return Ok(dispatcher);
    }

    let mut http = HttpSinkConfig::new(config.http_base_url.as_str())
        .with_basic_auth(config.http_auth_username.as_str(), config.http_auth_password.as_str());
    http.timeout = Duration::from_millis(timeout_ms);
    let sink = HttpSink::new(Destination::FORWARD_HTTP.as_str(), http)?;
    dispatcher.sink(Destination::FORWARD_HTTP, sink, 100)
}

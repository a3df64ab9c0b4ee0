//! Dispatcher - fan-out of one message to its selected destinations
//!
//! Every destination is delivered independently under its own retry policy
//! run: one destination's exhaustion never suppresses its siblings.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::task::JoinSet;
use tracing::{debug, error, info, instrument};

use contracts::{
    DeadLetter, DeadLetterHook, DeliveryMessage, Destination, DestinationSink, RouteId, RouterError,
    SinkConfig, SinkType,
};

use crate::dead_letter::LoggingDeadLetterHook;
use crate::error::DispatcherError;
use crate::handle::SinkHandle;
use crate::metrics::SinkMetricsSnapshot;
use crate::retry::RetryPolicy;
use crate::sinks::{FileSink, HttpSink, LogSink, MISCONFIGURED_INTENDED};

/// How sibling destinations are delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FanOut {
    /// One after another on the dispatching worker
    #[default]
    Sequential,
    /// Concurrent branches; outcomes are collected per branch
    Parallel,
}

/// What happened to one (destination, message) pair
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryStatus {
    Delivered { attempts: u32 },
    DeadLettered { attempts: u32, error_kind: &'static str, error: String },
    /// No sink bound; sent to the `misconfigured` sink instead
    Misconfigured,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub destination: Destination,
    pub status: DeliveryStatus,
}

/// Outcomes of one fan-out, in selection order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FanOutReport {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl FanOutReport {
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn delivered(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Delivered { .. }))
    }

    pub fn dead_lettered(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::DeadLettered { .. }))
    }

    pub fn misconfigured(&self) -> usize {
        self.count(|s| matches!(s, DeliveryStatus::Misconfigured))
    }

    fn count(&self, pred: impl Fn(&DeliveryStatus) -> bool) -> usize {
        self.outcomes.iter().filter(|o| pred(&o.status)).count()
    }
}

/// Create a SinkHandle from configuration
#[instrument(
    name = "dispatcher_create_sink_handle",
    skip(config),
    fields(sink = %config.name, sink_type = ?config.sink_type)
)]
pub fn create_sink_handle(config: &SinkConfig) -> Result<SinkHandle, DispatcherError> {
    let name = config.name.as_str();
    match config.sink_type {
        SinkType::Log => {
            let sink = if config.name == Destination::MISCONFIGURED {
                LogSink::misconfigured()
            } else {
                LogSink::new(name)
            };
            Ok(SinkHandle::spawn(config.name.clone(), sink, config.queue_capacity))
        }
        SinkType::File => {
            let sink = FileSink::from_params(name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(name, e.to_string()))?;
            Ok(SinkHandle::spawn(config.name.clone(), sink, config.queue_capacity))
        }
        SinkType::Http => {
            let sink = HttpSink::from_params(name, &config.params)
                .map_err(|e| DispatcherError::sink_creation(name, e.to_string()))?;
            Ok(SinkHandle::spawn(config.name.clone(), sink, config.queue_capacity))
        }
    }
}

/// Builder for creating a Dispatcher
pub struct DispatcherBuilder {
    route_id: RouteId,
    handles: HashMap<Destination, SinkHandle>,
    retry: RetryPolicy,
    dead_letters: Arc<dyn DeadLetterHook>,
    fan_out: FanOut,
}

impl DispatcherBuilder {
    /// Bind `destination` to a running sink handle
    pub fn handle(mut self, handle: SinkHandle) -> Result<Self, DispatcherError> {
        let destination = handle.destination().clone();
        if self.handles.contains_key(&destination) {
            return Err(DispatcherError::DuplicateBinding(destination.to_string()));
        }
        self.handles.insert(destination, handle);
        Ok(self)
    }

    /// Bind `destination` to `sink`, spawning its worker
    pub fn sink<S: DestinationSink + 'static>(
        self,
        destination: Destination,
        sink: S,
        queue_capacity: usize,
    ) -> Result<Self, DispatcherError> {
        self.handle(SinkHandle::spawn(destination, sink, queue_capacity))
    }

    /// Bind every configured destination
    #[instrument(
        name = "dispatcher_builder_bind",
        skip(self, configs),
        fields(route_id = %self.route_id, sink_count = configs.len())
    )]
    pub fn bind_all(mut self, configs: &[SinkConfig]) -> Result<Self, DispatcherError> {
        for config in configs {
            self = self.handle(create_sink_handle(config)?)?;
        }
        Ok(self)
    }

    pub fn retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn dead_letter_hook(mut self, hook: Arc<dyn DeadLetterHook>) -> Self {
        self.dead_letters = hook;
        self
    }

    pub fn fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    /// Build the dispatcher. An unbound `misconfigured` destination gets the
    /// alerting log sink.
    pub fn build(mut self) -> Dispatcher {
        let misconfigured = self
            .handles
            .remove(&Destination::MISCONFIGURED)
            .unwrap_or_else(|| SinkHandle::spawn(Destination::MISCONFIGURED, LogSink::misconfigured(), 100));

        Dispatcher {
            route_id: self.route_id,
            handles: self.handles,
            misconfigured,
            retry: self.retry,
            dead_letters: self.dead_letters,
            fan_out: self.fan_out,
        }
    }
}

/// Delivers dispatched messages for one route
pub struct Dispatcher {
    route_id: RouteId,
    handles: HashMap<Destination, SinkHandle>,
    misconfigured: SinkHandle,
    retry: RetryPolicy,
    dead_letters: Arc<dyn DeadLetterHook>,
    fan_out: FanOut,
}

impl Dispatcher {
    pub fn builder(route_id: RouteId) -> DispatcherBuilder {
        DispatcherBuilder {
            route_id,
            handles: HashMap::new(),
            retry: RetryPolicy::default(),
            dead_letters: Arc::new(LoggingDeadLetterHook),
            fan_out: FanOut::default(),
        }
    }

    pub fn route_id(&self) -> RouteId {
        self.route_id
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }

    pub fn dead_letter_hook(&self) -> &Arc<dyn DeadLetterHook> {
        &self.dead_letters
    }

    pub fn is_bound(&self, destination: &Destination) -> bool {
        self.handles.contains_key(destination)
    }

    /// Get metrics for all sinks, `misconfigured` included
    pub fn metrics(&self) -> Vec<(Destination, SinkMetricsSnapshot)> {
        let mut all: Vec<_> = self
            .handles
            .values()
            .chain(std::iter::once(&self.misconfigured))
            .map(|h| (h.destination().clone(), h.metrics().snapshot()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    /// Deliver every pair, each under its own retry run
    #[instrument(
        name = "dispatcher_deliver",
        skip(self, deliveries),
        fields(route_id = %self.route_id, fan_out = deliveries.len())
    )]
    pub async fn deliver(
        self: &Arc<Self>,
        deliveries: Vec<(Destination, DeliveryMessage)>,
    ) -> FanOutReport {
        let outcomes = match self.fan_out {
            FanOut::Parallel if deliveries.len() > 1 => self.deliver_parallel(deliveries).await,
            _ => {
                let mut outcomes = Vec::with_capacity(deliveries.len());
                for (destination, message) in deliveries {
                    outcomes.push(self.deliver_one(destination, message).await);
                }
                outcomes
            }
        };
        FanOutReport { outcomes }
    }

    async fn deliver_parallel(
        self: &Arc<Self>,
        deliveries: Vec<(Destination, DeliveryMessage)>,
    ) -> Vec<DeliveryOutcome> {
        let mut branches = JoinSet::new();
        let mut pending: Vec<Destination> = Vec::with_capacity(deliveries.len());
        for (index, (destination, message)) in deliveries.into_iter().enumerate() {
            pending.push(destination.clone());
            let this = Arc::clone(self);
            branches.spawn(async move { (index, this.deliver_one(destination, message).await) });
        }

        let mut slots: Vec<Option<DeliveryOutcome>> = vec![None; pending.len()];
        while let Some(joined) = branches.join_next().await {
            match joined {
                Ok((index, outcome)) => slots[index] = Some(outcome),
                Err(e) => error!(route_id = %self.route_id, error = %e, "delivery branch panicked"),
            }
        }

        slots
            .into_iter()
            .zip(pending)
            .map(|(slot, destination)| {
                slot.unwrap_or_else(|| DeliveryOutcome {
                    destination,
                    status: DeliveryStatus::DeadLettered {
                        attempts: 0,
                        error_kind: "panic",
                        error: "delivery branch panicked".to_string(),
                    },
                })
            })
            .collect()
    }

    #[instrument(
        name = "dispatcher_deliver_one",
        skip(self, message),
        fields(route_id = %self.route_id, identifier = %message.identifier, destination = %destination)
    )]
    async fn deliver_one(&self, destination: Destination, message: DeliveryMessage) -> DeliveryOutcome {
        let Some(handle) = self.handles.get(&destination) else {
            self.send_misconfigured(&destination, &message).await;
            return DeliveryOutcome {
                destination,
                status: DeliveryStatus::Misconfigured,
            };
        };

        let label = destination.as_str();
        let result = self
            .retry
            .run(label, |attempt| {
                debug!(attempt, "delivery attempt");
                handle.deliver(message.clone())
            })
            .await;

        let status = match result {
            Ok(attempted) => {
                metrics::counter!(
                    "relay_deliveries_total",
                    "route" => self.route_id.as_str(),
                    "destination" => destination.to_string()
                )
                .increment(1);
                DeliveryStatus::Delivered {
                    attempts: attempted.attempts,
                }
            }
            Err(exhausted) => {
                let letter = DeadLetter {
                    route_id: self.route_id,
                    identifier: message.identifier.clone(),
                    destination: Some(destination.clone()),
                    attempts: exhausted.attempts,
                    last_error: exhausted.error.to_string(),
                    error_kind: exhausted.error.kind(),
                };
                self.dead_letters.dead_letter(&letter);
                DeliveryStatus::DeadLettered {
                    attempts: exhausted.attempts,
                    error_kind: letter.error_kind,
                    error: letter.last_error,
                }
            }
        };
        DeliveryOutcome { destination, status }
    }

    /// Route a message whose destination has no sink to `misconfigured`.
    /// Terminal; never retried.
    async fn send_misconfigured(&self, destination: &Destination, message: &DeliveryMessage) {
        let error = RouterError::configuration(
            format!("{}.destinations", self.route_id),
            format!("no sink bound for destination '{destination}'"),
        );
        error!(
            route_id = %self.route_id,
            identifier = %message.identifier,
            destination = %destination,
            error = %error,
            "routing to misconfigured sink"
        );

        let redirected = message
            .redirect(Destination::MISCONFIGURED)
            .with_extra(MISCONFIGURED_INTENDED, destination.as_str());
        if let Err(e) = self.misconfigured.deliver(redirected).await {
            error!(route_id = %self.route_id, error = %e, "misconfigured sink failed");
        }
    }

    /// Shutdown every sink worker, flushing and closing sinks
    #[instrument(name = "dispatcher_shutdown", skip(self), fields(route_id = %self.route_id))]
    pub async fn shutdown(self) {
        for (_, handle) in self.handles {
            handle.shutdown().await;
        }
        self.misconfigured.shutdown().await;
        info!(route_id = %self.route_id, "Dispatcher shutdown complete");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dead_letter::CollectingDeadLetterHook;
    use crate::sinks::MemorySink;
    use contracts::EventRecord;
    use std::collections::HashMap as Map;

    fn message(destination: Destination) -> (Destination, DeliveryMessage) {
        let record = EventRecord::builder("http://localhost/rest", "/a")
            .build()
            .unwrap();
        (
            destination.clone(),
            DeliveryMessage::from_record(RouteId::Serialization, destination, &record),
        )
    }

    #[tokio::test]
    async fn test_sibling_isolation() {
        for fan_out in [FanOut::Sequential, FanOut::Parallel] {
            let hook = Arc::new(CollectingDeadLetterHook::new());
            let failing = MemorySink::new("meta").always_failing();
            let healthy = MemorySink::new("bin");
            let written = healthy.written();

            let dispatcher = Arc::new(
                Dispatcher::builder(RouteId::Serialization)
                    .sink(Destination::DELETE_METADATA, failing, 10)
                    .unwrap()
                    .sink(Destination::DELETE_BINARY, healthy, 10)
                    .unwrap()
                    .retry(RetryPolicy::new(2))
                    .dead_letter_hook(hook.clone())
                    .fan_out(fan_out)
                    .build(),
            );

            let report = dispatcher
                .deliver(vec![
                    message(Destination::DELETE_METADATA),
                    message(Destination::DELETE_BINARY),
                ])
                .await;

            assert_eq!(report.delivered(), 1);
            assert_eq!(report.dead_lettered(), 1);
            assert_eq!(report.outcomes[0].destination, Destination::DELETE_METADATA);
            assert_eq!(
                report.outcomes[0].status,
                DeliveryStatus::DeadLettered {
                    attempts: 3,
                    error_kind: "sink",
                    error: "sink 'meta' error: injected failure".to_string()
                }
            );
            assert_eq!(written.len(), 1);

            let letters = hook.letters();
            assert_eq!(letters.len(), 1);
            assert_eq!(letters[0].destination, Some(Destination::DELETE_METADATA));
            assert_eq!(letters[0].attempts, 3);
        }
    }

    #[tokio::test]
    async fn test_unbound_destination_goes_to_misconfigured() {
        let misconfigured = MemorySink::new("misconfigured");
        let written = misconfigured.written();
        let dispatcher = Arc::new(
            Dispatcher::builder(RouteId::Forwarding)
                .sink(Destination::MISCONFIGURED, misconfigured, 10)
                .unwrap()
                .build(),
        );

        let report = dispatcher.deliver(vec![message(Destination::FORWARD_HTTP)]).await;
        assert_eq!(report.misconfigured(), 1);

        let messages = written.messages();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].destination, Destination::MISCONFIGURED);
        assert_eq!(
            messages[0].extras.get(MISCONFIGURED_INTENDED).map(String::as_str),
            Some("forward-http")
        );
        assert_eq!(written.attempts(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_binding_rejected() {
        let result = Dispatcher::builder(RouteId::Indexing)
            .sink(Destination::UPDATE_INDEX, MemorySink::new("a"), 1)
            .unwrap()
            .sink(Destination::UPDATE_INDEX, MemorySink::new("b"), 1);
        assert!(matches!(result, Err(DispatcherError::DuplicateBinding(_))));
    }

    #[tokio::test]
    async fn test_bind_all_from_config() {
        let configs = vec![SinkConfig {
            name: Destination::UPDATE_INDEX,
            sink_type: SinkType::Log,
            queue_capacity: 50,
            params: Map::new(),
        }];

        let dispatcher = Dispatcher::builder(RouteId::Indexing)
            .bind_all(&configs)
            .unwrap()
            .build();
        assert!(dispatcher.is_bound(&Destination::UPDATE_INDEX));
        assert!(!dispatcher.is_bound(&Destination::DELETE_INDEX));
        assert_eq!(dispatcher.metrics().len(), 2);
        dispatcher.shutdown().await;
    }

    #[tokio::test]
    async fn test_file_sink_without_base_path_fails() {
        let config = SinkConfig {
            name: Destination::UPDATE_METADATA,
            sink_type: SinkType::File,
            queue_capacity: 1,
            params: Map::new(),
        };
        assert!(matches!(
            create_sink_handle(&config),
            Err(DispatcherError::SinkCreation { .. })
        ));
    }
}

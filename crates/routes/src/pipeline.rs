//! One route: Classifier + Dispatcher + RetryPolicy

use std::sync::Arc;

use tracing::{debug, error, instrument};

use classifier::{Classifier, TypeRequirement};
use contracts::{DeadLetter, EventRecord, ResourceFetcher, RouteId};
use dispatcher::{dispatch, Dispatcher, FanOutReport, RetryPolicy, RuleTable};

use crate::fixity::{outcome_delivery, FixitySequence, FixityState};
use crate::stats::RouteStats;

/// How a route picks its destinations
#[derive(Debug, Clone)]
pub enum RouteLogic {
    /// Predicate table over routing facts
    Table {
        rules: RuleTable,
        requirement: TypeRequirement,
    },
    /// Fixity state sequence, then success/failure
    Fixity(FixitySequence),
}

/// What happened to one record on one route
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Under an excluded container; dropped without error
    Excluded,
    /// Fixity skipped a deleted resource
    Removed,
    /// Fixity found nothing to check
    NotBinary,
    /// Classification or fixity sequence exhausted its redeliveries
    DeadLettered,
    Dispatched(FanOutReport),
}

/// A running route's processing logic, shared by its workers
pub struct Pipeline<F> {
    route_id: RouteId,
    classifier: Classifier,
    logic: RouteLogic,
    dispatcher: Arc<Dispatcher>,
    fetcher: Arc<F>,
    stats: Arc<RouteStats>,
}

impl<F> Pipeline<F>
where
    F: ResourceFetcher + Send + Sync + 'static,
{
    pub fn new(
        classifier: Classifier,
        logic: RouteLogic,
        dispatcher: Dispatcher,
        fetcher: Arc<F>,
    ) -> Self {
        Self {
            route_id: dispatcher.route_id(),
            classifier,
            logic,
            dispatcher: Arc::new(dispatcher),
            fetcher,
            stats: Arc::new(RouteStats::new()),
        }
    }

    pub fn route_id(&self) -> RouteId {
        self.route_id
    }

    pub fn stats(&self) -> &Arc<RouteStats> {
        &self.stats
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    fn retry(&self) -> RetryPolicy {
        self.dispatcher.retry_policy()
    }

    /// Process one record. Never fails: every error ends as a dead letter,
    /// a misconfigured delivery, or a logged drop.
    #[instrument(
        name = "route_process",
        skip(self, record),
        fields(route_id = %self.route_id, identifier = %record.identifier())
    )]
    pub async fn process(&self, record: &EventRecord) -> ProcessOutcome {
        self.stats.record_received(self.route_id);

        if self.classifier.exclusions().matches(record.identifier()) {
            debug!("excluded container, dropping");
            self.stats.record_excluded(self.route_id);
            return ProcessOutcome::Excluded;
        }

        let outcome = match &self.logic {
            RouteLogic::Table { rules, requirement } => {
                self.process_table(record, rules, *requirement).await
            }
            RouteLogic::Fixity(sequence) => self.process_fixity(record, sequence).await,
        };

        if let ProcessOutcome::Dispatched(ref report) = outcome {
            self.stats.record_report(report);
        }
        outcome
    }

    async fn process_table(
        &self,
        record: &EventRecord,
        rules: &RuleTable,
        requirement: TypeRequirement,
    ) -> ProcessOutcome {
        let fetcher = self.fetcher.as_ref();
        let classified = self
            .retry()
            .run("classify", |_| {
                self.classifier.classify_with(record, fetcher, requirement)
            })
            .await;

        let facts = match classified {
            Ok(attempted) => attempted.value,
            Err(exhausted) => {
                self.stage_dead_letter(record, exhausted.attempts, &exhausted.error);
                return ProcessOutcome::DeadLettered;
            }
        };

        let deliveries = dispatch(self.route_id, record, &facts, rules);
        ProcessOutcome::Dispatched(self.dispatcher.deliver(deliveries).await)
    }

    async fn process_fixity(&self, record: &EventRecord, sequence: &FixitySequence) -> ProcessOutcome {
        let fetcher = self.fetcher.as_ref();
        let ran = self
            .retry()
            .run("fixity", |_| sequence.run(record, &self.classifier, fetcher))
            .await;

        let terminal = match ran {
            Ok(attempted) => attempted.value,
            Err(exhausted) => {
                self.stage_dead_letter(record, exhausted.attempts, &exhausted.error);
                return ProcessOutcome::DeadLettered;
            }
        };

        match outcome_delivery(record, &terminal) {
            Some(delivery) => {
                self.stats
                    .record_fixity(matches!(terminal, FixityState::Success(_)));
                ProcessOutcome::Dispatched(self.dispatcher.deliver(vec![delivery]).await)
            }
            None if terminal == FixityState::Removed => {
                debug!("resource deleted, nothing to verify");
                ProcessOutcome::Removed
            }
            None => {
                debug!("not a binary, fixity sequence ends");
                self.stats.record_not_binary();
                ProcessOutcome::NotBinary
            }
        }
    }

    fn stage_dead_letter(&self, record: &EventRecord, attempts: u32, error: &contracts::RouterError) {
        error!(
            route_id = %self.route_id,
            identifier = %record.identifier(),
            attempts,
            error = %error,
            "stage failed terminally"
        );
        self.stats.record_stage_dead_letter();
        self.dispatcher.dead_letter_hook().dead_letter(&DeadLetter {
            route_id: self.route_id,
            identifier: record.identifier().to_string(),
            destination: None,
            attempts,
            last_error: error.to_string(),
            error_kind: error.kind(),
        });
    }

    /// Tear down the route's sinks; requires every worker to be finished
    pub(crate) async fn shutdown(self) {
        match Arc::try_unwrap(self.dispatcher) {
            Ok(dispatcher) => dispatcher.shutdown().await,
            Err(_) => error!(route_id = %self.route_id, "dispatcher still in use at shutdown"),
        }
    }
}

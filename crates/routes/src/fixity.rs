//! Fixity-check sequence
//!
//! `Fetching -> Filtering(isBinary) -> Delaying -> Verifying -> {Success, Failure}`
//!
//! Non-binary resources end the sequence at `Filtering` and deletions end it
//! before `Fetching`; both are normal terminations. The sequence has no retry loop of its own: the route wraps
//! the whole run in its `RetryPolicy`, so a redelivery starts over at
//! `Fetching`.

use std::fmt;
use std::time::Duration;

use tracing::{debug, instrument};

use classifier::Classifier;
use contracts::{DeliveryMessage, Destination, EventRecord, FixityReport, ResourceFetcher, RouteId, RouterError};

/// Extra keys carrying the fixity evidence to the outcome sinks
pub mod extras {
    pub const OUTCOME: &str = "fixity.outcome";
    pub const DIGEST: &str = "fixity.digest";
    pub const SIZE: &str = "fixity.size";
}

/// Sequence state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FixityState {
    Fetching,
    Filtering { is_binary: bool },
    Delaying,
    Verifying,
    /// Terminal: the resource was deleted, there is nothing left to fetch
    Removed,
    /// Terminal: nothing to check
    NotBinary,
    /// Terminal: outcome literal is exactly `SUCCESS`
    Success(FixityReport),
    /// Terminal: any other outcome
    Failure(FixityReport),
}

impl FixityState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Removed | Self::NotBinary | Self::Success(_) | Self::Failure(_))
    }

    fn label(&self) -> &'static str {
        match self {
            Self::Fetching => "fetching",
            Self::Filtering { .. } => "filtering",
            Self::Delaying => "delaying",
            Self::Verifying => "verifying",
            Self::Removed => "removed",
            Self::NotBinary => "not_binary",
            Self::Success(_) => "success",
            Self::Failure(_) => "failure",
        }
    }
}

impl fmt::Display for FixityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Fixity sequence with its configured pause
#[derive(Debug, Clone, Copy, Default)]
pub struct FixitySequence {
    delay: Duration,
}

impl FixitySequence {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Drive the sequence to a terminal state.
    ///
    /// The delay suspends only the calling task.
    ///
    /// # Errors
    /// Fetch errors from either repository call, unchanged.
    #[instrument(
        name = "fixity_sequence_run",
        skip(self, record, classifier, fetcher),
        fields(identifier = %record.identifier())
    )]
    pub async fn run<F>(
        &self,
        record: &EventRecord,
        classifier: &Classifier,
        fetcher: &F,
    ) -> Result<FixityState, RouterError>
    where
        F: ResourceFetcher + Sync,
    {
        let mut state = FixityState::Fetching;
        while !state.is_terminal() {
            let next = self.step(state, record, classifier, fetcher).await?;
            debug!(state = %next, "fixity transition");
            state = next;
        }
        Ok(state)
    }

    async fn step<F>(
        &self,
        state: FixityState,
        record: &EventRecord,
        classifier: &Classifier,
        fetcher: &F,
    ) -> Result<FixityState, RouterError>
    where
        F: ResourceFetcher + Sync,
    {
        Ok(match state {
            FixityState::Fetching if classifier.classify(record, None).is_delete => {
                FixityState::Removed
            }
            FixityState::Fetching => {
                let description = fetcher
                    .describe(record.base_url(), record.identifier())
                    .await?;
                let facts = classifier.classify(record, Some(&description));
                FixityState::Filtering {
                    is_binary: facts.is_binary,
                }
            }
            FixityState::Filtering { is_binary: false } => FixityState::NotBinary,
            FixityState::Filtering { is_binary: true } => FixityState::Delaying,
            FixityState::Delaying => {
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
                FixityState::Verifying
            }
            FixityState::Verifying => {
                let report = fetcher
                    .check_fixity(record.base_url(), record.identifier())
                    .await?;
                if report.is_success() {
                    FixityState::Success(report)
                } else {
                    FixityState::Failure(report)
                }
            }
            terminal => terminal,
        })
    }
}

/// Outcome delivery for a terminal state; `None` for `Removed` and `NotBinary`
pub fn outcome_delivery(
    record: &EventRecord,
    terminal: &FixityState,
) -> Option<(Destination, DeliveryMessage)> {
    let (destination, report) = match terminal {
        FixityState::Success(report) => (Destination::FIXITY_SUCCESS, report),
        FixityState::Failure(report) => (Destination::FIXITY_FAILURE, report),
        _ => return None,
    };

    let mut message = DeliveryMessage::from_record(RouteId::Fixity, destination.clone(), record)
        .with_extra(extras::OUTCOME, report.outcome.as_str());
    if let Some(ref digest) = report.digest {
        message = message.with_extra(extras::DIGEST, digest.as_str());
    }
    if let Some(size) = report.size {
        message = message.with_extra(extras::SIZE, size.to_string());
    }
    Some((destination, message))
}

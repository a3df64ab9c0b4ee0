//! Ingestion Pipeline main entry

use std::sync::Arc;

use async_channel::{bounded, Receiver, Sender};
use contracts::EventRecord;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, instrument};

use crate::message::RawMessage;
use crate::metrics::IngestionMetrics;
use crate::normalize::normalize;

/// Ingestion Pipeline
///
/// Normalizes raw transport messages into [`EventRecord`]s and hands them
/// downstream. Malformed messages are counted and dropped, never retried.
pub struct IngestionPipeline {
    /// Shared metrics
    metrics: Arc<IngestionMetrics>,

    /// Record sender
    tx: Sender<EventRecord>,

    /// Record receiver
    rx: Option<Receiver<EventRecord>>,
}

impl IngestionPipeline {
    /// Create new Ingestion Pipeline
    ///
    /// # Arguments
    /// * `channel_capacity` - Capacity of the outbound record channel
    pub fn new(channel_capacity: usize) -> Self {
        let (tx, rx) = bounded(channel_capacity.max(1));

        Self {
            metrics: Arc::new(IngestionMetrics::new()),
            tx,
            rx: Some(rx),
        }
    }

    /// Normalize one message, recording the outcome
    pub fn process(&self, message: &RawMessage) -> Option<EventRecord> {
        process_message(&self.metrics, message)
    }

    /// Drain `input` until it closes, forwarding every normalized record.
    ///
    /// The outbound channel closes once the task finishes and every clone of
    /// the sender is gone.
    #[instrument(name = "ingestion_start", skip(self, input))]
    pub fn start(&self, input: Receiver<RawMessage>) -> JoinHandle<()> {
        let tx = self.tx.clone();
        let metrics = self.metrics.clone();

        tokio::spawn(async move {
            while let Ok(message) = input.recv().await {
                let Some(record) = process_message(&metrics, &message) else {
                    continue;
                };
                if tx.send(record).await.is_err() {
                    debug!("record receiver dropped, stopping ingestion");
                    break;
                }
            }
            let snapshot = metrics.snapshot();
            info!(
                received = snapshot.messages_received,
                normalized = snapshot.events_normalized,
                malformed = snapshot.malformed,
                "ingestion finished"
            );
        })
    }

    /// Get record stream receiver
    ///
    /// Note: Can only be called once, subsequent calls return None
    pub fn take_receiver(&mut self) -> Option<Receiver<EventRecord>> {
        self.rx.take()
    }

    /// Consume the pipeline, dropping its own sender so the record channel
    /// closes once the running task finishes
    pub fn into_metrics(self) -> Arc<IngestionMetrics> {
        self.metrics
    }

    /// Get metrics reference
    pub fn metrics(&self) -> Arc<IngestionMetrics> {
        self.metrics.clone()
    }
}

fn process_message(metrics: &IngestionMetrics, message: &RawMessage) -> Option<EventRecord> {
    metrics.record_received();
    match normalize(message) {
        Ok(record) => {
            metrics.record_normalized();
            debug!(identifier = %record.identifier(), "normalized event");
            Some(record)
        }
        Err(e) => {
            metrics.record_malformed();
            error!(error = %e, kind = e.kind(), "dropping malformed event");
            None
        }
    }
}

//! SinkHandle - manages a sink with isolated queue and worker task
//!
//! Callers await the write result through a oneshot reply so the retry
//! policy can react to each attempt.

use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, instrument};

use contracts::{DeliveryMessage, Destination, DestinationSink, RouterError};

use crate::metrics::SinkMetrics;

/// One write request and the channel its result goes back on
struct DeliveryRequest {
    message: DeliveryMessage,
    reply: oneshot::Sender<Result<(), RouterError>>,
}

/// Handle to a running sink worker
pub struct SinkHandle {
    /// Destination this sink is bound to
    destination: Destination,
    /// Sink name
    name: String,
    /// Channel to send requests to worker
    tx: mpsc::Sender<DeliveryRequest>,
    /// Shared metrics
    metrics: Arc<SinkMetrics>,
    /// Worker task handle
    worker_handle: JoinHandle<()>,
}

impl SinkHandle {
    /// Create a new SinkHandle and spawn the worker task
    pub fn spawn<S: DestinationSink + 'static>(
        destination: Destination,
        sink: S,
        queue_capacity: usize,
    ) -> Self {
        let name = sink.name().to_string();
        let (tx, rx) = mpsc::channel(queue_capacity.max(1));
        let metrics = Arc::new(SinkMetrics::new());

        let worker_metrics = Arc::clone(&metrics);
        let worker_name = name.clone();

        let worker_handle = tokio::spawn(async move {
            sink_worker(sink, rx, worker_metrics, worker_name).await;
        });

        Self {
            destination,
            name,
            tx,
            metrics,
            worker_handle,
        }
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    /// Get sink name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get current metrics
    pub fn metrics(&self) -> &Arc<SinkMetrics> {
        &self.metrics
    }

    /// Write one message and wait for the sink's answer.
    ///
    /// Waits for queue space rather than dropping: every delivery must be
    /// accounted for by the retry policy.
    pub async fn deliver(&self, message: DeliveryMessage) -> Result<(), RouterError> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(DeliveryRequest { message, reply })
            .await
            .map_err(|_| RouterError::sink(self.destination.as_str(), "sink worker stopped"))?;
        let depth = self.queue_len();
        self.metrics.set_depth(depth);
        metrics::gauge!("relay_sink_queue_depth", "destination" => self.destination.to_string())
            .set(depth as f64);

        response.await.map_err(|_| {
            RouterError::sink(self.destination.as_str(), "sink worker dropped the request")
        })?
    }

    fn queue_len(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Shutdown the sink worker gracefully
    #[instrument(name = "sink_handle_shutdown", skip(self), fields(sink = %self.name))]
    pub async fn shutdown(self) {
        // Drop sender to signal worker to stop
        drop(self.tx);
        // Wait for worker to finish
        if let Err(e) = self.worker_handle.await {
            error!(sink = %self.name, error = ?e, "Worker task panicked");
        }
        debug!(sink = %self.name, "SinkHandle shutdown complete");
    }
}

/// Worker task that consumes requests and writes to sink
#[instrument(
    name = "sink_worker_loop",
    skip(sink, rx, metrics),
    fields(sink = %name)
)]
async fn sink_worker<S: DestinationSink>(
    mut sink: S,
    mut rx: mpsc::Receiver<DeliveryRequest>,
    metrics: Arc<SinkMetrics>,
    name: String,
) {
    debug!(sink = %name, "Sink worker started");

    while let Some(request) = rx.recv().await {
        metrics.set_depth(rx.len());

        let result = sink.write(&request.message).await;
        match &result {
            Ok(()) => metrics.record_delivered(),
            Err(e) => {
                metrics.record_rejected();
                debug!(
                    sink = %name,
                    identifier = %request.message.identifier,
                    error = %e,
                    "Write failed"
                );
            }
        }
        // Caller may have gone away; the write already happened
        let _ = request.reply.send(result);
    }

    // Cleanup
    if let Err(e) = sink.flush().await {
        error!(sink = %name, error = %e, "Flush failed on shutdown");
    }
    if let Err(e) = sink.close().await {
        error!(sink = %name, error = %e, "Close failed on shutdown");
    }

    debug!(sink = %name, "Sink worker stopped");
}

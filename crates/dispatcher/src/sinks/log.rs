//! LogSink - logs delivery summary via tracing

use contracts::{DeliveryMessage, DestinationSink, RouterError};
use tracing::{error, info, instrument};

/// Sink that logs delivery summaries.
///
/// The `misconfigured` destination uses the alerting variant, which logs at
/// error level.
pub struct LogSink {
    name: String,
    alert: bool,
}

impl LogSink {
    /// Create a new LogSink with the given name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            alert: false,
        }
    }

    /// Sink for messages whose destination could not be resolved
    pub fn misconfigured() -> Self {
        Self {
            name: contracts::Destination::MISCONFIGURED.to_string(),
            alert: true,
        }
    }

    fn log_summary(&self, message: &DeliveryMessage) {
        let event_types: Vec<&str> = message.event_types.iter().map(String::as_str).collect();
        if self.alert {
            error!(
                sink = %self.name,
                route_id = %message.route_id,
                identifier = %message.identifier,
                intended = %message.extras.get(MISCONFIGURED_INTENDED).map_or("", String::as_str),
                "Message routed to misconfigured sink"
            );
        } else {
            info!(
                sink = %self.name,
                route_id = %message.route_id,
                destination = %message.destination,
                identifier = %message.identifier,
                event_types = ?event_types,
                "Delivery received"
            );
        }
    }
}

/// Extra key naming the destination a misconfigured message was meant for
pub const MISCONFIGURED_INTENDED: &str = "relay.intended_destination";

impl DestinationSink for LogSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "log_sink_write",
        skip(self, message),
        fields(sink = %self.name, identifier = %message.identifier)
    )]
    async fn write(&mut self, message: &DeliveryMessage) -> Result<(), RouterError> {
        self.log_summary(message);
        Ok(())
    }

    #[instrument(name = "log_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), RouterError> {
        // Nothing to flush for log sink
        Ok(())
    }

    #[instrument(name = "log_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), RouterError> {
        info!(sink = %self.name, "LogSink closed");
        Ok(())
    }
}

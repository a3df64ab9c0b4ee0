//! DestinationSink trait - Dispatcher output interface
//!
//! Defines the abstract interface for destination adapters.

use crate::{DeliveryMessage, RouterError};

/// Destination output trait
///
/// All sink implementations must implement this trait. Sinks are assumed
/// idempotent: the transport delivers at least once.
#[trait_variant::make(DestinationSink: Send)]
pub trait LocalDestinationSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Write one delivery
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, message: &DeliveryMessage) -> Result<(), RouterError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), RouterError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), RouterError>;
}

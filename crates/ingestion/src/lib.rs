//! # Ingestion
//!
//! Transport-facing half of the router.
//!
//! Responsibilities:
//! - Read raw broker messages (JSON lines from a file or stdin, or memory)
//! - Normalize headers and ActivityStreams bodies into `EventRecord`
//! - Drop malformed messages with an error log, never retrying them
//! - Send records downstream via async-channel
//!
//! ## Usage Example
//!
//! ```ignore
//! use ingestion::{IngestionPipeline, JsonLinesSource};
//!
//! let (raw_tx, raw_rx) = async_channel::bounded(100);
//! tokio::spawn(JsonLinesSource::from_arg("-").run(raw_tx));
//!
//! let mut pipeline = IngestionPipeline::new(100);
//! let records = pipeline.take_receiver().unwrap();
//! pipeline.start(raw_rx);
//! while let Ok(record) = records.recv().await {
//!     router.publish(record).await?;
//! }
//! ```

mod message;
mod metrics;
mod mock;
mod normalize;
mod pipeline;
mod source;

// Re-exports
pub use message::{headers, RawMessage};
pub use metrics::{IngestionMetrics, MetricsSnapshot};
pub use mock::MockEventSource;
pub use normalize::normalize;
pub use pipeline::IngestionPipeline;
pub use source::{JsonLinesSource, LineInput};

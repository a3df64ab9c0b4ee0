//! # Dispatcher
//!
//! Routing and delivery core.
//!
//! Responsibilities:
//! - Evaluate ordered, first-match-wins rule tables over `RoutingFacts`
//! - Drop excluded resources before any rule runs
//! - Fan out to every selected destination, each under its own `RetryPolicy`
//! - Isolate sinks behind worker tasks; hand exhausted messages to the
//!   dead-letter hook

pub mod dead_letter;
pub mod dispatcher;
pub mod error;
pub mod handle;
pub mod metrics;
pub mod retry;
pub mod rules;
pub mod sinks;

pub use contracts::{DeliveryMessage, DestinationSink};
pub use dead_letter::{CollectingDeadLetterHook, LoggingDeadLetterHook};
pub use dispatcher::{
    create_sink_handle, DeliveryOutcome, DeliveryStatus, Dispatcher, DispatcherBuilder, FanOut,
    FanOutReport,
};
pub use error::DispatcherError;
pub use handle::SinkHandle;
pub use metrics::{SinkMetrics, SinkMetricsSnapshot};
pub use retry::{Attempted, Exhausted, RetryPolicy};
pub use rules::{dispatch, Predicate, Rule, RuleTable, Selection, Target};
pub use sinks::{FileSink, HttpSink, HttpSinkConfig, LogSink, MemorySink, Recorded};

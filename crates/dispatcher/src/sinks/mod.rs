//! Sink implementations
//!
//! Contains LogSink, FileSink, HttpSink, and the in-memory MemorySink.

mod file;
mod http;
mod log;
mod memory;

pub use self::file::{FileMode, FileSink, FileSinkConfig};
pub use self::http::{HttpSink, HttpSinkConfig};
pub use self::log::{LogSink, MISCONFIGURED_INTENDED};
pub use self::memory::{MemorySink, Recorded};

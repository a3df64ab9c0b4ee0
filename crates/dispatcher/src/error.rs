//! Dispatcher error types

use thiserror::Error;

use contracts::RouterError;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Sink creation error
    #[error("failed to create sink '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// Two bindings for the same destination
    #[error("destination '{0}' is bound more than once")]
    DuplicateBinding(String),

    /// Sink error (from contract)
    #[error("sink error: {0}")]
    Router(#[from] RouterError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

//! Layered error definitions
//!
//! Categorized by source: config / event / fetch / sink

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum RouterError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Required setting missing or invalid (e.g. empty HTTP base URL)
    #[error("configuration error at '{field}': {message}")]
    Configuration { field: String, message: String },

    // ===== Event Errors =====
    /// Inbound message could not be normalized
    #[error("malformed event, '{field}': {message}")]
    MalformedEvent { field: String, message: String },

    // ===== Repository Errors =====
    /// Resource lookup failed
    #[error("fetch of '{identifier}' failed: {message}")]
    Fetch {
        identifier: String,
        message: String,
        /// HTTP status, when the repository answered at all
        status: Option<u16>,
    },

    // ===== Sink Errors =====
    /// Destination write failed
    #[error("sink '{destination}' error: {message}")]
    Sink {
        destination: String,
        message: String,
    },

    // ===== General Errors =====
    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl RouterError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration error
    pub fn configuration(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Configuration {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create malformed event error
    pub fn malformed(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::MalformedEvent {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create fetch error
    pub fn fetch(identifier: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Fetch {
            identifier: identifier.into(),
            message: message.into(),
            status: None,
        }
    }

    /// Create fetch error carrying the repository's HTTP status
    pub fn fetch_status(identifier: impl Into<String>, status: u16) -> Self {
        Self::Fetch {
            identifier: identifier.into(),
            message: format!("repository responded with status {status}"),
            status: Some(status),
        }
    }

    /// Create sink write error
    pub fn sink(destination: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Sink {
            destination: destination.into(),
            message: message.into(),
        }
    }

    /// Whether redelivery may succeed.
    ///
    /// Only transient fetch and sink failures are retried; malformed events and
    /// misconfiguration are terminal on first sight.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Fetch { .. } | Self::Sink { .. } | Self::Io(_))
    }

    /// Short label used as a metrics/log dimension
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } => "config_parse",
            Self::Configuration { .. } => "configuration",
            Self::MalformedEvent { .. } => "malformed_event",
            Self::Fetch { .. } => "fetch",
            Self::Sink { .. } => "sink",
            Self::Io(_) => "io",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_taxonomy() {
        assert!(RouterError::fetch("/a", "timeout").is_retryable());
        assert!(RouterError::sink("update-index", "503").is_retryable());
        assert!(!RouterError::malformed("identifier", "missing").is_retryable());
        assert!(!RouterError::configuration("http_base_url", "empty").is_retryable());
    }

    #[test]
    fn test_fetch_status_message() {
        let err = RouterError::fetch_status("/gone", 404);
        assert!(err.to_string().contains("404"));
        assert!(matches!(err, RouterError::Fetch { status: Some(404), .. }));
    }
}

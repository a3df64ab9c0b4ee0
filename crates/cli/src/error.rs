//! Error types for CLI operations.

use std::path::Path;

use thiserror::Error;

use contracts::{RouteId, RouterError};

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Failed to load configuration from {path}: {source}")]
    Config {
        path: String,
        #[source]
        source: RouterError,
    },

    /// Requested route is absent or disabled
    #[error("Route '{route}' is not enabled in the configuration")]
    RouteDisabled { route: RouteId },

    /// Router construction or routing failure
    #[error("Router error: {0}")]
    Router(String),

    /// Events ended in dead letters
    #[error("{count} message(s) were dead-lettered")]
    DeadLetters { count: u64 },
}

impl CliError {
    pub fn config_not_found(path: &Path) -> Self {
        Self::ConfigNotFound {
            path: path.display().to_string(),
        }
    }

    pub fn config(path: &Path, source: RouterError) -> Self {
        Self::Config {
            path: path.display().to_string(),
            source,
        }
    }

    pub fn router(error: impl std::fmt::Display) -> Self {
        Self::Router(error.to_string())
    }
}

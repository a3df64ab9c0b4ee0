//! FileSink - writes or removes one file per resource

use contracts::{DeliveryMessage, DestinationSink, RouterError};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, instrument};

const ROOT_FILE_STEM: &str = "index";

/// What the sink does with each delivery
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileMode {
    /// Write the delivery as JSON
    Write,
    /// Remove the file; a missing file is fine
    Delete,
}

/// Configuration for FileSink
#[derive(Debug, Clone)]
pub struct FileSinkConfig {
    /// Base output directory
    pub base_path: PathBuf,
    /// File extension, without the dot
    pub extension: String,
    pub mode: FileMode,
}

impl FileSinkConfig {
    /// Create config from params map.
    ///
    /// `mode` defaults to `delete` for `delete-*` destinations and `write`
    /// otherwise.
    pub fn from_params(name: &str, params: &HashMap<String, String>) -> Result<Self, String> {
        let base_path = params
            .get("base_path")
            .map(PathBuf::from)
            .ok_or_else(|| "missing 'base_path' parameter".to_string())?;

        let extension = params
            .get("extension")
            .map(|e| e.trim_start_matches('.').to_string())
            .unwrap_or_else(|| "json".to_string());

        let mode = match params.get("mode").map(String::as_str) {
            Some("write") => FileMode::Write,
            Some("delete") => FileMode::Delete,
            None if name.starts_with("delete-") => FileMode::Delete,
            None => FileMode::Write,
            Some(other) => return Err(format!("unknown mode '{other}'")),
        };

        Ok(Self {
            base_path,
            extension,
            mode,
        })
    }
}

/// Sink that keeps `{base_path}/{identifier}.{extension}` in step with the
/// repository
pub struct FileSink {
    name: String,
    config: FileSinkConfig,
}

impl FileSink {
    /// Create a new FileSink
    pub fn new(name: impl Into<String>, config: FileSinkConfig) -> std::io::Result<Self> {
        // Create base directory if it doesn't exist
        std::fs::create_dir_all(&config.base_path)?;

        Ok(Self {
            name: name.into(),
            config,
        })
    }

    /// Create from params map (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> std::io::Result<Self> {
        let name = name.into();
        let config = FileSinkConfig::from_params(&name, params)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Self::new(name, config)
    }

    /// Target path for `identifier`; refuses paths escaping `base_path`.
    /// The repository root maps to `{base_path}/index.{extension}`.
    fn path_for(&self, identifier: &str) -> Result<PathBuf, RouterError> {
        let trimmed = identifier.trim_matches('/');
        let relative = Path::new(if trimmed.is_empty() {
            ROOT_FILE_STEM
        } else {
            trimmed
        });
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(RouterError::malformed(
                "identifier",
                format!("'{identifier}' cannot be mapped to a file"),
            ));
        }

        let mut path = self.config.base_path.join(relative).into_os_string();
        path.push(".");
        path.push(&self.config.extension);
        Ok(PathBuf::from(path))
    }

    async fn persist(&self, path: &Path, message: &DeliveryMessage) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let body = serde_json::to_vec_pretty(message)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        tokio::fs::write(path, body).await
    }

    async fn remove(&self, path: &Path) -> std::io::Result<()> {
        match tokio::fs::remove_file(path).await {
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "file already absent");
                Ok(())
            }
            other => other,
        }
    }
}

impl DestinationSink for FileSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "file_sink_write",
        skip(self, message),
        fields(sink = %self.name, identifier = %message.identifier)
    )]
    async fn write(&mut self, message: &DeliveryMessage) -> Result<(), RouterError> {
        let path = self.path_for(&message.identifier)?;
        let result = match self.config.mode {
            FileMode::Write => self.persist(&path, message).await,
            FileMode::Delete => self.remove(&path).await,
        };
        result.map_err(|e| RouterError::sink(&self.name, format!("{}: {e}", path.display())))
    }

    #[instrument(name = "file_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), RouterError> {
        Ok(())
    }

    #[instrument(name = "file_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), RouterError> {
        debug!(sink = %self.name, "FileSink closed");
        Ok(())
    }
}

//! HttpSink - POSTs each delivery as JSON

use contracts::{DeliveryMessage, DestinationSink, RouterError};
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Configuration for HttpSink
#[derive(Debug, Clone)]
pub struct HttpSinkConfig {
    /// Target endpoint
    pub url: String,
    /// Empty means no Authorization header
    pub username: String,
    pub password: String,
    pub timeout: Duration,
}

impl HttpSinkConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            username: String::new(),
            password: String::new(),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn with_basic_auth(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = username.into();
        self.password = password.into();
        self
    }

    /// Create config from params map
    pub fn from_params(params: &HashMap<String, String>) -> Result<Self, String> {
        let url = params
            .get("url")
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| "missing 'url' parameter".to_string())?;

        let timeout_ms = match params.get("timeout_ms") {
            Some(raw) => raw
                .parse::<u64>()
                .map_err(|e| format!("invalid timeout_ms '{raw}': {e}"))?,
            None => 30_000,
        };

        Ok(Self {
            url: url.clone(),
            username: params.get("username").cloned().unwrap_or_default(),
            password: params.get("password").cloned().unwrap_or_default(),
            timeout: Duration::from_millis(timeout_ms),
        })
    }
}

/// Sink that forwards deliveries to an HTTP endpoint
pub struct HttpSink {
    name: String,
    config: HttpSinkConfig,
    client: reqwest::Client,
}

impl HttpSink {
    /// Create a new HttpSink
    pub fn new(name: impl Into<String>, config: HttpSinkConfig) -> Result<Self, RouterError> {
        let name = name.into();
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| RouterError::configuration(name.as_str(), e.to_string()))?;

        debug!(sink = %name, url = %config.url, "HttpSink ready");
        Ok(Self {
            name,
            config,
            client,
        })
    }

    /// Create from params (for factory)
    pub fn from_params(
        name: impl Into<String>,
        params: &HashMap<String, String>,
    ) -> Result<Self, RouterError> {
        let name = name.into();
        let config = HttpSinkConfig::from_params(params)
            .map_err(|e| RouterError::configuration(name.as_str(), e))?;
        Self::new(name, config)
    }
}

impl DestinationSink for HttpSink {
    fn name(&self) -> &str {
        &self.name
    }

    #[instrument(
        name = "http_sink_write",
        skip(self, message),
        fields(sink = %self.name, identifier = %message.identifier)
    )]
    async fn write(&mut self, message: &DeliveryMessage) -> Result<(), RouterError> {
        let mut request = self.client.post(&self.config.url).json(message);
        if !self.config.username.is_empty() {
            request = request.basic_auth(&self.config.username, Some(&self.config.password));
        }

        let response = request
            .send()
            .await
            .map_err(|e| RouterError::sink(&self.name, e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(sink = %self.name, status = %status, body = %body, "HTTP sink rejected delivery");
            return Err(RouterError::sink(
                &self.name,
                format!("endpoint responded with status {status}"),
            ));
        }
        Ok(())
    }

    #[instrument(name = "http_sink_flush", skip(self))]
    async fn flush(&mut self) -> Result<(), RouterError> {
        Ok(())
    }

    #[instrument(name = "http_sink_close", skip(self))]
    async fn close(&mut self) -> Result<(), RouterError> {
        debug!(sink = %self.name, "HttpSink closed");
        Ok(())
    }
}

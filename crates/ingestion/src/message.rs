//! RawMessage - one transport delivery before normalization

use std::collections::BTreeMap;

use bytes::Bytes;
use serde::Deserialize;

/// Header names carried by repository notifications
pub mod headers {
    pub const BASE_URL: &str = "org.fcrepo.jms.baseURL";
    pub const IDENTIFIER: &str = "org.fcrepo.jms.identifier";
    pub const TIMESTAMP: &str = "org.fcrepo.jms.timestamp";
    pub const EVENT_TYPE: &str = "org.fcrepo.jms.eventType";
    pub const RESOURCE_TYPE: &str = "org.fcrepo.jms.resourceType";
    pub const AGENT: &str = "org.fcrepo.jms.agent";
    pub const USER: &str = "org.fcrepo.jms.user";
    pub const USER_AGENT: &str = "org.fcrepo.jms.userAgent";
    pub const EVENT_ID: &str = "org.fcrepo.jms.eventID";
}

/// Transport headers plus opaque body
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawMessage {
    pub headers: BTreeMap<String, String>,
    pub body: Bytes,
}

impl RawMessage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Header value, ignoring blank values
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .get(name)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    /// Comma-separated multi-valued header
    pub fn header_values(&self, name: &str) -> Vec<String> {
        self.header(name)
            .map(|v| {
                v.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// JSON-lines wire form: `{"headers": {...}, "body": <string|object>}`
#[derive(Debug, Deserialize)]
struct WireMessage {
    #[serde(default)]
    headers: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    body: Option<serde_json::Value>,
}

impl RawMessage {
    /// Parse one JSON line as written by a broker bridge
    pub fn from_json_line(line: &str) -> Result<Self, serde_json::Error> {
        let wire: WireMessage = serde_json::from_str(line)?;

        let headers = wire
            .headers
            .into_iter()
            .map(|(k, v)| {
                let value = match v {
                    serde_json::Value::String(s) => s,
                    serde_json::Value::Array(items) => items
                        .iter()
                        .map(|item| match item {
                            serde_json::Value::String(s) => s.clone(),
                            other => other.to_string(),
                        })
                        .collect::<Vec<_>>()
                        .join(","),
                    other => other.to_string(),
                };
                (k, value)
            })
            .collect();

        let body = match wire.body {
            None | Some(serde_json::Value::Null) => Bytes::new(),
            Some(serde_json::Value::String(s)) => Bytes::from(s),
            Some(other) => Bytes::from(serde_json::to_vec(&other)?),
        };

        Ok(Self { headers, body })
    }
}

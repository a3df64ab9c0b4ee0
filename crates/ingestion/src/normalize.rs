//! Raw transport message -> EventRecord
//!
//! Headers are authoritative. When a header is missing, the ActivityStreams
//! body (if any) fills the gap. Missing event types default to `Update`
//! (reindex messages carry none); missing agents yield an empty sequence.

use chrono::DateTime;
use serde::Deserialize;
use tracing::{debug, instrument};

use contracts::{kinds, EventRecord, RouterError};

use crate::message::{headers, RawMessage};

/// Headers folded into typed fields; everything else lands in `extras`
const CONSUMED_HEADERS: [&str; 8] = [
    headers::BASE_URL,
    headers::IDENTIFIER,
    headers::TIMESTAMP,
    headers::EVENT_TYPE,
    headers::RESOURCE_TYPE,
    headers::AGENT,
    headers::USER,
    headers::USER_AGENT,
];

/// Normalize one transport message.
///
/// # Errors
/// `MalformedEvent` when base URL or identifier cannot be determined, or the
/// timestamp header is not epoch millis.
#[instrument(name = "ingestion_normalize", skip(message), fields(header_count = message.headers.len()))]
pub fn normalize(message: &RawMessage) -> Result<EventRecord, RouterError> {
    let body = parse_body(message);

    let base_url = message
        .header(headers::BASE_URL)
        .map(str::to_string)
        .or_else(|| body.as_ref().and_then(ActivityBody::base_url))
        .ok_or_else(|| RouterError::malformed(headers::BASE_URL, "missing repository base URL"))?;

    let identifier = message
        .header(headers::IDENTIFIER)
        .map(str::to_string)
        .or_else(|| body.as_ref().and_then(|b| b.identifier(&base_url)))
        .ok_or_else(|| RouterError::malformed(headers::IDENTIFIER, "missing resource identifier"))?;

    let mut builder = EventRecord::builder(base_url, identifier);

    if let Some(ts) = timestamp(message, body.as_ref())? {
        builder = builder.timestamp_ms(ts);
    }

    let mut event_types = message.header_values(headers::EVENT_TYPE);
    if event_types.is_empty() {
        event_types = body.iter().flat_map(|b| b.types.iter().cloned()).collect();
    }
    // Routes key deletions on NODE_REMOVED; ActivityStreams says `Delete`
    if event_types.iter().any(|k| kinds::is_removal(k))
        && !event_types.iter().any(|k| kinds::matches(k, kinds::NODE_REMOVED))
    {
        event_types.push(kinds::NODE_REMOVED.to_string());
    }
    builder = builder.event_types(event_types);

    let resource_types = message.header_values(headers::RESOURCE_TYPE);
    builder = if resource_types.is_empty() {
        builder.resource_types(
            body.iter()
                .filter_map(|b| b.object.as_ref())
                .flat_map(|o| o.types.iter().cloned()),
        )
    } else {
        builder.resource_types(resource_types)
    };

    builder = builder.agents(agents(message, body.as_ref()));

    for (name, value) in &message.headers {
        if !CONSUMED_HEADERS.contains(&name.as_str()) {
            builder = builder.extra(name.clone(), value.clone());
        }
    }

    builder.build()
}

fn timestamp(message: &RawMessage, body: Option<&ActivityBody>) -> Result<Option<i64>, RouterError> {
    if let Some(raw) = message.header(headers::TIMESTAMP) {
        return raw.parse::<i64>().map(Some).map_err(|e| {
            RouterError::malformed(headers::TIMESTAMP, format!("'{raw}' is not epoch millis: {e}"))
        });
    }

    Ok(body
        .and_then(|b| b.published.as_deref())
        .and_then(|p| DateTime::parse_from_rfc3339(p).ok())
        .map(|t| t.timestamp_millis()))
}

fn agents(message: &RawMessage, body: Option<&ActivityBody>) -> Vec<String> {
    let listed = message.header_values(headers::AGENT);
    if !listed.is_empty() {
        return listed;
    }

    let from_headers: Vec<String> = [headers::USER, headers::USER_AGENT]
        .iter()
        .filter_map(|h| message.header(h))
        .map(str::to_string)
        .collect();
    if !from_headers.is_empty() {
        return from_headers;
    }

    body.map(|b| b.actor.iter().filter_map(Actor::label).collect())
        .unwrap_or_default()
}

fn parse_body(message: &RawMessage) -> Option<ActivityBody> {
    if message.body.is_empty() {
        return None;
    }
    match serde_json::from_slice::<ActivityBody>(&message.body) {
        Ok(body) => Some(body),
        Err(e) => {
            debug!(error = %e, "ignoring unparseable message body");
            None
        }
    }
}

/// The subset of an ActivityStreams notification the router reads
#[derive(Debug, Default, Deserialize)]
struct ActivityBody {
    #[serde(rename = "type", default, deserialize_with = "one_or_many")]
    types: Vec<String>,
    #[serde(default)]
    object: Option<ActivityObject>,
    #[serde(default, deserialize_with = "one_or_many")]
    actor: Vec<Actor>,
    #[serde(default)]
    published: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ActivityObject {
    #[serde(default)]
    id: Option<String>,
    #[serde(rename = "type", default, deserialize_with = "one_or_many")]
    types: Vec<String>,
    #[serde(rename = "isPartOf", default)]
    is_part_of: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct Actor {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl Actor {
    fn label(&self) -> Option<String> {
        self.id.clone().or_else(|| self.name.clone())
    }
}

impl ActivityBody {
    fn base_url(&self) -> Option<String> {
        self.object.as_ref()?.is_part_of.clone()
    }

    /// Object URL relative to `base_url`
    fn identifier(&self, base_url: &str) -> Option<String> {
        let id = self.object.as_ref()?.id.as_deref()?;
        let base = base_url.trim_end_matches('/');
        let path = id.strip_prefix(base).unwrap_or(id);
        if path.is_empty() {
            Some("/".to_string())
        } else {
            Some(path.to_string())
        }
    }
}

fn one_or_many<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany<T> {
        One(T),
        Many(Vec<T>),
    }

    Ok(match OneOrMany::<T>::deserialize(deserializer)? {
        OneOrMany::One(item) => vec![item],
        OneOrMany::Many(items) => items,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_message() -> RawMessage {
        RawMessage::new()
            .with_header(headers::BASE_URL, "http://localhost:8080/rest")
            .with_header(headers::IDENTIFIER, "/foo")
    }

    #[test]
    fn test_headers_only() {
        let msg = base_message()
            .with_header(headers::TIMESTAMP, "1700000000000")
            .with_header(headers::EVENT_TYPE, "NODE_ADDED,PROPERTY_CHANGED")
            .with_header(headers::RESOURCE_TYPE, "http://fedora.info/definitions/v4/repository#Container")
            .with_header(headers::USER, "fedoraAdmin")
            .with_header(headers::USER_AGENT, "curl/8.0")
            .with_header("org.fcrepo.jms.digest", "urn:sha1:abc");

        let record = normalize(&msg).unwrap();
        assert_eq!(record.identifier(), "/foo");
        assert_eq!(record.timestamp_ms(), 1_700_000_000_000);
        assert!(record.has_event_kind(kinds::NODE_ADDED));
        assert!(!record.event_type_defaulted());
        assert_eq!(record.agents(), &["fedoraAdmin".to_string(), "curl/8.0".to_string()]);
        assert_eq!(record.resource_types().len(), 1);
        assert_eq!(record.extra("org.fcrepo.jms.digest"), Some("urn:sha1:abc"));
        assert_eq!(record.extra(headers::IDENTIFIER), None);
    }

    #[test]
    fn test_missing_event_type_defaults_to_update() {
        let record = normalize(&base_message()).unwrap();
        assert!(record.event_type_defaulted());
        assert!(record.has_event_kind(kinds::UPDATE));
        assert!(record.agents().is_empty());
    }

    #[test]
    fn test_missing_identifier_is_malformed() {
        let msg = RawMessage::new().with_header(headers::BASE_URL, "http://localhost/rest");
        let err = normalize(&msg).unwrap_err();
        assert!(matches!(err, RouterError::MalformedEvent { .. }));
    }

    #[test]
    fn test_missing_base_url_is_malformed() {
        let msg = RawMessage::new().with_header(headers::IDENTIFIER, "/foo");
        let err = normalize(&msg).unwrap_err();
        assert!(matches!(err, RouterError::MalformedEvent { ref field, .. } if field == headers::BASE_URL));
    }

    #[test]
    fn test_bad_timestamp_is_malformed() {
        let msg = base_message().with_header(headers::TIMESTAMP, "yesterday");
        assert!(normalize(&msg).is_err());
    }

    #[test]
    fn test_body_fills_missing_headers() {
        let body = r#"{
            "id": "urn:uuid:1",
            "type": ["Delete"],
            "published": "2024-01-02T03:04:05Z",
            "actor": [{"id": "info:fedora/local-user#admin"}, {"name": "client/1.0"}],
            "object": {
                "id": "http://localhost:8080/rest/a/b",
                "type": "http://fedora.info/definitions/v4/repository#Binary",
                "isPartOf": "http://localhost:8080/rest"
            }
        }"#;
        let msg = RawMessage::new().with_body(body.to_string());
        let record = normalize(&msg).unwrap();
        assert_eq!(record.base_url(), "http://localhost:8080/rest");
        assert_eq!(record.identifier(), "/a/b");
        assert!(record.event_types().contains("Delete"));
        assert!(record.has_event_kind(kinds::NODE_REMOVED));
        assert_eq!(record.agents().len(), 2);
        assert_eq!(record.timestamp_rfc3339().as_deref(), Some("2024-01-02T03:04:05+00:00"));
    }

    #[test]
    fn test_headers_win_over_body() {
        let body = r#"{"type": "Create", "object": {"id": "http://other/x", "isPartOf": "http://other"}}"#;
        let msg = base_message()
            .with_header(headers::EVENT_TYPE, "NODE_REMOVED")
            .with_body(body.to_string());
        let record = normalize(&msg).unwrap();
        assert_eq!(record.identifier(), "/foo");
        assert!(record.has_event_kind(kinds::NODE_REMOVED));
        assert!(!record.event_types().contains("Create"));
    }

    #[test]
    fn test_activity_delete_header_marks_removal() {
        let msg = base_message()
            .with_header(headers::EVENT_TYPE, "https://www.w3.org/ns/activitystreams#Delete");
        let record = normalize(&msg).unwrap();
        assert!(record.has_event_kind(kinds::NODE_REMOVED));
        assert_eq!(record.event_types().len(), 2);
    }

    #[test]
    fn test_update_is_not_removal() {
        let body = r#"{"type": "Update", "object": {"id": "http://localhost/rest/a", "isPartOf": "http://localhost/rest"}}"#;
        let record = normalize(&RawMessage::new().with_body(body.to_string())).unwrap();
        assert!(!record.has_event_kind(kinds::NODE_REMOVED));
    }

    #[test]
    fn test_garbage_body_ignored_when_headers_complete() {
        let msg = base_message().with_body("not json".to_string());
        assert!(normalize(&msg).is_ok());
    }
}

//! In-memory message source
//!
//! Used by tests and offline runs without a broker.

use async_channel::{bounded, Receiver};
use tracing::trace;

use crate::message::{headers, RawMessage};

/// Replays a fixed list of messages
#[derive(Debug, Clone, Default)]
pub struct MockEventSource {
    messages: Vec<RawMessage>,
}

impl MockEventSource {
    pub fn new(messages: Vec<RawMessage>) -> Self {
        Self { messages }
    }

    /// Convenience message with base URL, identifier and optional event type
    pub fn message(base_url: &str, identifier: &str, event_type: Option<&str>) -> RawMessage {
        let msg = RawMessage::new()
            .with_header(headers::BASE_URL, base_url)
            .with_header(headers::IDENTIFIER, identifier);
        match event_type {
            Some(kind) => msg.with_header(headers::EVENT_TYPE, kind),
            None => msg,
        }
    }

    /// Spawn a task that sends every message, then closes the channel
    pub fn start(self, capacity: usize) -> Receiver<RawMessage> {
        let (tx, rx) = bounded(capacity.max(1));
        tokio::spawn(async move {
            for message in self.messages {
                trace!(headers = message.headers.len(), "mock source sending");
                if tx.send(message).await.is_err() {
                    break;
                }
            }
        });
        rx
    }
}

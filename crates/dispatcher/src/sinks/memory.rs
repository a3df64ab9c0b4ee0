//! MemorySink - records deliveries in memory
//!
//! Used by tests and dry runs. Can be told to fail its first N writes, or
//! every write, to exercise redelivery.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use contracts::{DeliveryMessage, DestinationSink, RouterError};

/// Shared view of what a [`MemorySink`] has accepted
#[derive(Debug, Clone, Default)]
pub struct Recorded {
    inner: Arc<Mutex<RecordedState>>,
}

#[derive(Debug, Default)]
struct RecordedState {
    messages: Vec<DeliveryMessage>,
    attempts: u64,
}

impl Recorded {
    fn lock(&self) -> MutexGuard<'_, RecordedState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Accepted deliveries
    pub fn messages(&self) -> Vec<DeliveryMessage> {
        self.lock().messages.clone()
    }

    pub fn identifiers(&self) -> Vec<String> {
        self.lock()
            .messages
            .iter()
            .map(|m| m.identifier.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.lock().messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Writes attempted, failed ones included
    pub fn attempts(&self) -> u64 {
        self.lock().attempts
    }
}

/// In-memory sink
pub struct MemorySink {
    name: String,
    recorded: Recorded,
    /// Failures left before writes succeed; `None` fails forever
    failures_left: Option<u32>,
}

impl MemorySink {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            recorded: Recorded::default(),
            failures_left: Some(0),
        }
    }

    /// Fail the first `n` writes
    pub fn failing_first(mut self, n: u32) -> Self {
        self.failures_left = Some(n);
        self
    }

    /// Fail every write
    pub fn always_failing(mut self) -> Self {
        self.failures_left = None;
        self
    }

    /// Handle for inspecting deliveries after the sink moved into a worker
    pub fn written(&self) -> Recorded {
        self.recorded.clone()
    }
}

impl DestinationSink for MemorySink {
    fn name(&self) -> &str {
        &self.name
    }

    async fn write(&mut self, message: &DeliveryMessage) -> Result<(), RouterError> {
        let mut state = self.recorded.lock();
        state.attempts += 1;
        match self.failures_left.as_mut() {
            None => Err(RouterError::sink(&self.name, "injected failure")),
            Some(left) if *left > 0 => {
                *left -= 1;
                Err(RouterError::sink(&self.name, "injected failure"))
            }
            Some(_) => {
                state.messages.push(message.clone());
                Ok(())
            }
        }
    }

    async fn flush(&mut self) -> Result<(), RouterError> {
        Ok(())
    }

    async fn close(&mut self) -> Result<(), RouterError> {
        Ok(())
    }
}

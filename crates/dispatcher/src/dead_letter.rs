//! Dead-letter hooks

use std::sync::{Arc, Mutex, PoisonError};

use tracing::error;

use contracts::{DeadLetter, DeadLetterHook};

/// Logs every dead letter at error level and counts it
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDeadLetterHook;

impl DeadLetterHook for LoggingDeadLetterHook {
    fn dead_letter(&self, letter: &DeadLetter) {
        let destination = letter.destination.as_ref().map_or("-", |d| d.as_str());
        error!(
            route_id = %letter.route_id,
            identifier = %letter.identifier,
            destination = %destination,
            attempts = letter.attempts,
            error_kind = letter.error_kind,
            error = %letter.last_error,
            "message dead-lettered"
        );
        metrics::counter!(
            "relay_dead_letters_total",
            "route" => letter.route_id.as_str(),
            "destination" => destination.to_string()
        )
        .increment(1);
    }
}

/// Keeps dead letters in memory (tests, run summaries)
#[derive(Debug, Clone, Default)]
pub struct CollectingDeadLetterHook {
    letters: Arc<Mutex<Vec<DeadLetter>>>,
}

impl CollectingDeadLetterHook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn letters(&self) -> Vec<DeadLetter> {
        self.letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl DeadLetterHook for CollectingDeadLetterHook {
    fn dead_letter(&self, letter: &DeadLetter) {
        LoggingDeadLetterHook.dead_letter(letter);
        self.letters
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(letter.clone());
    }
}

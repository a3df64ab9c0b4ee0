//! Bounded redelivery
//!
//! A policy wraps one stage. Each call to [`RetryPolicy::run`] owns its own
//! attempt counter, so counters are never shared across stages or messages.

use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use contracts::{EffectiveSettings, RouterError};

/// Redelivery settings for one stage
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_redeliveries: u32,
    redelivery_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(10)
    }
}

/// Successful stage result and the attempts it took
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attempted<T> {
    pub value: T,
    pub attempts: u32,
}

/// Terminal stage failure
#[derive(Debug)]
pub struct Exhausted {
    /// Attempts made, the initial one included
    pub attempts: u32,
    pub error: RouterError,
}

impl RetryPolicy {
    pub fn new(max_redeliveries: u32) -> Self {
        Self {
            max_redeliveries,
            redelivery_delay: Duration::ZERO,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    pub fn from_settings(settings: &EffectiveSettings) -> Self {
        Self::new(settings.max_redeliveries).with_delay(settings.redelivery_delay)
    }

    pub fn max_redeliveries(&self) -> u32 {
        self.max_redeliveries
    }

    /// Initial attempt plus redeliveries
    pub fn max_attempts(&self) -> u32 {
        self.max_redeliveries.saturating_add(1)
    }

    /// Run `stage` until it succeeds, fails with a non-retryable error, or
    /// `max_redeliveries + 1` attempts have failed.
    ///
    /// `stage` receives the 1-based attempt number. The delay between
    /// attempts suspends only the calling task.
    pub async fn run<T, F, Fut>(&self, label: &str, mut stage: F) -> Result<Attempted<T>, Exhausted>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, RouterError>>,
    {
        let max_attempts = self.max_attempts();
        let mut attempt = 1;
        loop {
            match stage(attempt).await {
                Ok(value) => {
                    if attempt > 1 {
                        debug!(stage = label, attempt, "stage succeeded after redelivery");
                    }
                    return Ok(Attempted {
                        value,
                        attempts: attempt,
                    });
                }
                Err(error) if !error.is_retryable() || attempt >= max_attempts => {
                    return Err(Exhausted {
                        attempts: attempt,
                        error,
                    });
                }
                Err(error) => {
                    warn!(
                        stage = label,
                        attempt,
                        max_attempts,
                        error = %error,
                        "stage failed, redelivering"
                    );
                    if !self.redelivery_delay.is_zero() {
                        tokio::time::sleep(self.redelivery_delay).await;
                    }
                    attempt += 1;
                }
            }
        }
    }
}

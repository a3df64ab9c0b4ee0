//! In-memory repository
//!
//! Canned descriptions and fixity reports, with optional transient failures
//! per identifier. Call counters let tests assert whether a fetch happened.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use contracts::{FixityReport, ResourceDescription, ResourceFetcher, RouterError};

#[derive(Debug, Default)]
struct State {
    descriptions: HashMap<String, ResourceDescription>,
    fixity: HashMap<String, FixityReport>,
    /// Remaining failures before calls for the identifier succeed
    failures: HashMap<String, u32>,
}

/// Repository stand-in for tests and offline runs
#[derive(Debug, Default)]
pub struct MockRepository {
    state: Mutex<State>,
    describe_calls: AtomicU64,
    fixity_calls: AtomicU64,
}

impl MockRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a resource with the given type set
    pub fn with_resource<I, S>(self, identifier: &str, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.lock()
            .descriptions
            .insert(identifier.to_string(), ResourceDescription::new(identifier, types));
        self
    }

    /// Register the fixity outcome reported for `identifier`
    pub fn with_fixity(self, identifier: &str, outcome: &str) -> Self {
        self.lock().fixity.insert(
            identifier.to_string(),
            FixityReport {
                outcome: outcome.to_string(),
                digest: Some(format!("urn:sha1:{:040x}", identifier.len())),
                size: Some(0),
            },
        );
        self
    }

    /// Fail the next `times` calls (describe or fixity) for `identifier`
    pub fn fail_times(&self, identifier: &str, times: u32) {
        self.lock().failures.insert(identifier.to_string(), times);
    }

    pub fn describe_calls(&self) -> u64 {
        self.describe_calls.load(Ordering::Relaxed)
    }

    pub fn fixity_calls(&self) -> u64 {
        self.fixity_calls.load(Ordering::Relaxed)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn take_failure(state: &mut State, identifier: &str) -> Result<(), RouterError> {
        match state.failures.get_mut(identifier) {
            Some(remaining) if *remaining > 0 => {
                *remaining -= 1;
                Err(RouterError::fetch(identifier, "injected failure"))
            }
            _ => Ok(()),
        }
    }
}

impl ResourceFetcher for MockRepository {
    async fn describe(
        &self,
        _base_url: &str,
        identifier: &str,
    ) -> Result<ResourceDescription, RouterError> {
        self.describe_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();
        Self::take_failure(&mut state, identifier)?;
        state
            .descriptions
            .get(identifier)
            .cloned()
            .ok_or_else(|| RouterError::fetch_status(identifier, 404))
    }

    async fn check_fixity(
        &self,
        _base_url: &str,
        identifier: &str,
    ) -> Result<FixityReport, RouterError> {
        self.fixity_calls.fetch_add(1, Ordering::Relaxed);
        let mut state = self.lock();
        Self::take_failure(&mut state, identifier)?;
        state
            .fixity
            .get(identifier)
            .cloned()
            .ok_or_else(|| RouterError::fetch_status(identifier, 404))
    }
}

//! Deferred, memoized hardware reads
//!
//! Calibration tables are fetched on first access, not at construction, so
//! a fetch failure surfaces to the caller that forced it. The state mutex
//! is held across the fetch: concurrent first callers block on the one
//! in-flight command and share its outcome, and the command never runs
//! more than once per cache lifetime.

use std::sync::Mutex;

use crate::error::HwMonitorError;

enum FetchState<T> {
    Unevaluated,
    Evaluated(T),
    Failed(HwMonitorError),
}

/// Single-flight memoizing thunk around one hardware read.
pub struct CachedFetch<T> {
    state: Mutex<FetchState<T>>,
}

impl<T: Clone> CachedFetch<T> {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FetchState::Unevaluated),
        }
    }

    /// Return the memoized value, running `fetch` on the first call only.
    /// Both outcomes are memoized; a failed fetch is not retried.
    pub fn get_or_fetch(
        &self,
        fetch: impl FnOnce() -> Result<T, HwMonitorError>,
    ) -> Result<T, HwMonitorError> {
        let mut state = self.state.lock().unwrap_or_else(|e| e.into_inner());
        if let FetchState::Unevaluated = *state {
            *state = match fetch() {
                Ok(value) => FetchState::Evaluated(value),
                Err(err) => FetchState::Failed(err),
            };
        }
        match &*state {
            FetchState::Evaluated(value) => Ok(value.clone()),
            FetchState::Failed(err) => Err(err.clone()),
            FetchState::Unevaluated => unreachable!("fetch state settled above"),
        }
    }
}

impl<T: Clone> Default for CachedFetch<T> {
    fn default() -> Self {
        Self::new()
    }
}

//! Single-writer handle to a measurement session
//!
//! A transition holds exclusive access for its whole duration, external
//! service calls included. A second caller arriving meanwhile is turned away
//! with `SessionBusy` instead of queueing behind the first.

use crate::session::measurement::MeasurementSession;
use crate::validation::error::{LocatorResult, UsageError};
use std::sync::{Arc, Mutex, TryLockError};
use tracing::warn;

#[derive(Debug, Clone, Default)]
pub struct SharedSession {
    inner: Arc<Mutex<MeasurementSession>>,
}

impl SharedSession {
    pub fn new(session: MeasurementSession) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Run `transition` with exclusive access, or fail with `SessionBusy`.
    ///
    /// Access is released when `transition` returns, successfully or not.
    pub fn transition<T, F>(&self, transition: F) -> LocatorResult<T>
    where
        F: FnOnce(&mut MeasurementSession) -> LocatorResult<T>,
    {
        let mut guard = match self.inner.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                warn!("transition rejected, session busy");
                return Err(UsageError::SessionBusy.into());
            }
            // Transitions validate before mutating, so the state is consistent
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };
        transition(&mut guard)
    }

    /// Read-only access; waits for an in-flight transition to finish
    pub fn read<T>(&self, f: impl FnOnce(&MeasurementSession) -> T) -> T {
        let guard = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&guard)
    }
}

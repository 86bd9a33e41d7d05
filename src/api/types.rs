//! Common API types

use crate::session::SessionSnapshot;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Session state plus lifetime counters of an API instance
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionStatus {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    /// Measurements committed since the API was created, resets included
    pub runs_committed: u64,
    /// Successful solves
    pub solves: u64,
    /// Operations that returned an error
    pub failures: u64,
}

#[derive(Debug, Default)]
pub(crate) struct ApiCounters {
    runs_committed: AtomicU64,
    solves: AtomicU64,
    failures: AtomicU64,
}

impl ApiCounters {
    pub(crate) fn record_commit(&self) {
        self.runs_committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_solve(&self) {
        self.solves.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failure(&self) {
        self.failures.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn status(&self, session: SessionSnapshot) -> SessionStatus {
        SessionStatus {
            session,
            runs_committed: self.runs_committed.load(Ordering::Relaxed),
            solves: self.solves.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
        }
    }
}

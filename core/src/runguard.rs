use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Single-permit guard that keeps two runs from overlapping.
pub struct RunGuard {
    sem: Arc<Semaphore>,
}

impl Clone for RunGuard {
    fn clone(&self) -> Self { RunGuard { sem: self.sem.clone() } }
}

impl Default for RunGuard {
    fn default() -> Self { Self::new() }
}

/// Held for the lifetime of a run; dropping it lets the next run start.
pub struct RunPermit {
    _permit: OwnedSemaphorePermit,
}

impl RunGuard {
    pub fn new() -> Self {
        RunGuard { sem: Arc::new(Semaphore::new(1)) }
    }

    /// Never waits: returns `None` when another run holds the permit.
    pub fn try_begin(&self) -> Option<RunPermit> {
        self.sem.clone().try_acquire_owned().ok().map(|p| RunPermit { _permit: p })
    }

    pub fn is_running(&self) -> bool {
        self.sem.available_permits() == 0
    }
}

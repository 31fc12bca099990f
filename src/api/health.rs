//! Shared health state for the /health endpoint.
//! Updated by the batch runner in main, read by the API.

use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

#[derive(Default)]
pub struct HealthState {
    /// True while a batch run is in progress.
    pub batch_running: AtomicBool,
    /// Id of the last completed run (0 = none).
    pub last_run_id: AtomicI64,
    pub runs_completed: AtomicU64,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn run_started(&self) {
        self.batch_running.store(true, Ordering::Relaxed);
    }

    pub fn run_finished(&self, run_id: i64) {
        self.last_run_id.store(run_id, Ordering::Relaxed);
        self.runs_completed.fetch_add(1, Ordering::Relaxed);
        self.batch_running.store(false, Ordering::Relaxed);
    }

    pub fn batch_running(&self) -> bool {
        self.batch_running.load(Ordering::Relaxed)
    }

    pub fn last_run_id(&self) -> Option<i64> {
        match self.last_run_id.load(Ordering::Relaxed) {
            0 => None,
            id => Some(id),
        }
    }

    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::Relaxed)
    }
}

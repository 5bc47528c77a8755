use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Running total of persisted records, shared by every load worker.
#[derive(Debug)]
pub struct LoadProgress {
    started: Instant,
    persisted: AtomicU64,
}

impl LoadProgress {
    pub fn start() -> Self {
        Self {
            started: Instant::now(),
            persisted: AtomicU64::new(0),
        }
    }

    /// Folds one committed batch into the total and returns the new total.
    pub fn record(&self, inserted: u64) -> u64 {
        self.persisted.fetch_add(inserted, Ordering::Relaxed) + inserted
    }

    pub fn persisted(&self) -> u64 {
        self.persisted.load(Ordering::Relaxed)
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Records per second for the given total since the run started.
    pub fn rate(&self, total: u64) -> f64 {
        let secs = self.elapsed().as_secs_f64();
        if secs > 0.0 { total as f64 / secs } else { 0.0 }
    }
}

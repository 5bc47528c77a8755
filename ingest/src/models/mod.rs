use chrono::{DateTime, Utc};
use common::Listing;
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Ordered group of listings written in one transaction.
#[derive(Debug, Clone)]
pub struct Batch {
    pub seq: u64,
    pub records: Vec<Listing>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.records.len()
    }
}

/// Final summary of a load run. Row and batch failures show up in the logs only.
#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub started_at: DateTime<Utc>,
    pub rows_read: u64,
    pub batches: u64,
    pub persisted: u64,
    pub elapsed: Duration,
}

impl LoadReport {
    /// Persisted records per second.
    pub fn rate(&self) -> f64 {
        let secs = self.elapsed.as_secs_f64();
        if secs > 0.0 {
            self.persisted as f64 / secs
        } else {
            0.0
        }
    }
}

impl fmt::Display for LoadReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Load finished in {:.2?}. Persisted {} records ({:.0} records/sec)",
            self.elapsed,
            self.persisted,
            self.rate()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_handles_zero_elapsed() {
        let report = LoadReport {
            started_at: Utc::now(),
            rows_read: 10,
            batches: 1,
            persisted: 10,
            elapsed: Duration::ZERO,
        };
        assert_eq!(report.rate(), 0.0);

        let report = LoadReport {
            elapsed: Duration::from_secs(2),
            ..report
        };
        assert_eq!(report.rate(), 5.0);
        assert!(report.to_string().contains("Persisted 10 records"));
    }
}

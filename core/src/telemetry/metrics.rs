use serde::Serialize;
use std::sync::Mutex;

/// Counts processed and skipped items of a bulk operation.
pub struct OperationCounters {
    inner: Mutex<Counts>,
}

/// Copy of the counters at one point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Counts {
    pub processed: usize,
    pub skipped: usize,
}

impl OperationCounters {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Counts::default()),
        }
    }

    pub fn record_processed(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.processed += 1;
        }
    }

    pub fn record_skipped(&self) {
        if let Ok(mut counts) = self.inner.lock() {
            counts.skipped += 1;
        }
    }

    pub fn snapshot(&self) -> Counts {
        if let Ok(counts) = self.inner.lock() {
            *counts
        } else {
            Counts::default()
        }
    }
}

impl Default for OperationCounters {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_track_both_outcomes() {
        let counters = OperationCounters::new();
        counters.record_processed();
        counters.record_processed();
        counters.record_skipped();
        assert_eq!(
            counters.snapshot(),
            Counts {
                processed: 2,
                skipped: 1
            }
        );
    }
}

//! Shared atomics for ambient observability. Nothing in the core reads these
//! by default; an embedding host can poll `WorkerClient::stats()` for a
//! dashboard or a periodic status line.

use std::sync::atomic::{AtomicI64, AtomicU32, AtomicU64, Ordering};

/// Point-in-time snapshot of the Poller's and Submitter's shared counters.
#[derive(Debug, Clone, Copy, Default)]
pub struct SdkStatsSnapshot {
    pub poll_iterations: u64,
    pub items_polled_total: u64,
    pub last_poll_item_count: u64,
    pub consecutive_poll_failures: u32,
    pub submissions_sent: u64,
    pub submissions_failed: u64,
    pub submission_queue_depth: i64,
}

/// Atomics backing `SdkStatsSnapshot`. Cheap to update from any number of
/// concurrent tasks; `snapshot()` takes a relaxed read of each counter —
/// these are diagnostics, not a consistency boundary.
#[derive(Default)]
pub struct SdkStats {
    poll_iterations: AtomicU64,
    items_polled_total: AtomicU64,
    last_poll_item_count: AtomicU64,
    consecutive_poll_failures: AtomicU32,
    submissions_sent: AtomicU64,
    submissions_failed: AtomicU64,
    submission_queue_depth: AtomicI64,
}

impl SdkStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_poll_iteration(&self, items_returned: u64, failed: bool) {
        self.poll_iterations.fetch_add(1, Ordering::Relaxed);
        self.items_polled_total
            .fetch_add(items_returned, Ordering::Relaxed);
        self.last_poll_item_count
            .store(items_returned, Ordering::Relaxed);

        if failed {
            self.consecutive_poll_failures
                .fetch_add(1, Ordering::Relaxed);
        } else {
            self.consecutive_poll_failures.store(0, Ordering::Relaxed);
        }
    }

    pub fn record_submission(&self, succeeded: bool) {
        if succeeded {
            self.submissions_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            self.submissions_failed.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn set_submission_queue_depth(&self, depth: usize) {
        self.submission_queue_depth
            .store(depth as i64, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> SdkStatsSnapshot {
        SdkStatsSnapshot {
            poll_iterations: self.poll_iterations.load(Ordering::Relaxed),
            items_polled_total: self.items_polled_total.load(Ordering::Relaxed),
            last_poll_item_count: self.last_poll_item_count.load(Ordering::Relaxed),
            consecutive_poll_failures: self.consecutive_poll_failures.load(Ordering::Relaxed),
            submissions_sent: self.submissions_sent.load(Ordering::Relaxed),
            submissions_failed: self.submissions_failed.load(Ordering::Relaxed),
            submission_queue_depth: self.submission_queue_depth.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn consecutive_failures_reset_on_success() {
        let stats = SdkStats::new();
        stats.record_poll_iteration(0, true);
        stats.record_poll_iteration(0, true);
        assert_eq!(stats.snapshot().consecutive_poll_failures, 2);

        stats.record_poll_iteration(3, false);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.consecutive_poll_failures, 0);
        assert_eq!(snapshot.last_poll_item_count, 3);
        assert_eq!(snapshot.items_polled_total, 3);
    }

    #[test]
    fn submission_counters_track_independently() {
        let stats = SdkStats::new();
        stats.record_submission(true);
        stats.record_submission(false);
        stats.record_submission(true);
        let snapshot = stats.snapshot();
        assert_eq!(snapshot.submissions_sent, 2);
        assert_eq!(snapshot.submissions_failed, 1);
    }
}

//! Credit-based concurrency accounting for a single handler.
//!
//! Each registered handler owns one `PermitPool` sized to its
//! `max_in_progress`. A permit is acquired by the polling controller before a
//! work item for that handler is requested from the engine, travels with the
//! work item through dispatch, and is released exactly once when the
//! submission tracker observes a terminal outcome for that execution.

use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

/// Bounds the number of concurrently in-flight executions for one handler.
#[derive(Clone)]
pub struct PermitPool {
    semaphore: Arc<Semaphore>,
    capacity: u32,
}

impl PermitPool {
    #[must_use]
    pub fn new(capacity: u32) -> Self {
        Self {
            semaphore: Arc::new(Semaphore::new(capacity as usize)),
            capacity,
        }
    }

    #[must_use]
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Credits currently free to spend.
    #[must_use]
    pub fn available(&self) -> u32 {
        self.semaphore.available_permits() as u32
    }

    /// Attempt to acquire a single permit without waiting. Returns `None`
    /// when the handler is already at `max_in_progress`.
    #[must_use]
    pub fn try_acquire(&self) -> Option<PermitGuard> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(PermitGuard::new)
    }

    /// Acquire as many individual permits as are currently available, up to
    /// `count`. Unlike `try_acquire_many`, each returned guard owns exactly
    /// one permit, so they can be released independently as each execution
    /// they were acquired for finishes at its own pace — this is what the
    /// Polling Controller uses to size its next request per handler.
    #[must_use]
    pub fn try_acquire_up_to(&self, count: u32) -> Vec<PermitGuard> {
        (0..count).map_while(|_| self.try_acquire()).collect()
    }

    /// Acquire `count` permits at once without waiting, for batched polling.
    /// Returns `None` if fewer than `count` are currently available — no
    /// partial acquisition occurs.
    #[must_use]
    pub fn try_acquire_many(&self, count: u32) -> Option<PermitGuard> {
        if count == 0 {
            return None;
        }
        Arc::clone(&self.semaphore)
            .try_acquire_many_owned(count)
            .ok()
            .map(PermitGuard::new)
    }
}

/// One or more permits borrowed from a `PermitPool`.
///
/// Dropping the guard releases the permits back to the pool. The submission
/// tracker holds this for the lifetime of an execution and drops it exactly
/// once, on the terminal response for that `step_execution_id`.
pub struct PermitGuard {
    _permit: OwnedSemaphorePermit,
}

impl PermitGuard {
    fn new(permit: OwnedSemaphorePermit) -> Self {
        Self { _permit: permit }
    }
}

impl std::fmt::Debug for PermitGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PermitGuard").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_bounds_concurrent_permits() {
        let pool = PermitPool::new(2);
        let first = pool.try_acquire().expect("first permit");
        let second = pool.try_acquire().expect("second permit");
        assert!(pool.try_acquire().is_none());

        drop(first);
        assert!(pool.try_acquire().is_some());
        drop(second);
    }

    #[test]
    fn available_reflects_outstanding_permits() {
        let pool = PermitPool::new(3);
        assert_eq!(pool.available(), 3);
        let guard = pool.try_acquire().unwrap();
        assert_eq!(pool.available(), 2);
        drop(guard);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn batch_acquire_is_all_or_nothing() {
        let pool = PermitPool::new(3);
        assert!(pool.try_acquire_many(4).is_none());
        assert_eq!(pool.available(), 3);

        let guard = pool.try_acquire_many(3).expect("exact capacity batch");
        assert_eq!(pool.available(), 0);
        drop(guard);
        assert_eq!(pool.available(), 3);
    }

    #[test]
    fn zero_sized_batch_request_yields_nothing() {
        let pool = PermitPool::new(3);
        assert!(pool.try_acquire_many(0).is_none());
    }

    #[test]
    fn acquire_up_to_stops_at_availability_not_count() {
        let pool = PermitPool::new(2);
        let guards = pool.try_acquire_up_to(5);
        assert_eq!(guards.len(), 2);
        assert_eq!(pool.available(), 0);
        drop(guards);
        assert_eq!(pool.available(), 2);
    }

    #[test]
    fn acquire_up_to_never_exceeds_requested_count() {
        let pool = PermitPool::new(5);
        let guards = pool.try_acquire_up_to(3);
        assert_eq!(guards.len(), 3);
        assert_eq!(pool.available(), 2);
    }
}

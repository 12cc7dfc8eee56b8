//! Response Submitter: batches `WorkResponse`s, submits them in bulk, and
//! classifies failures as transient (retry) or permanent (drop), releasing
//! each tracker's permit exactly once on a terminal outcome.
//!
//! The queue is a `Mutex<VecDeque<_>>` rather than a lock-free structure —
//! straightforward batch-draining semantics, documented as a simplification
//! in DESIGN.md. The single background drain loop is the only writer, so the
//! mutex is never contended across tasks beyond `enqueue`'s brief insert.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{PermitGuard, WorkResponse};
use crate::ports::engine_client::EngineClient;
use crate::stats::SdkStats;

const DRAIN_INTERVAL: Duration = Duration::from_millis(100);

/// One `WorkResponse` awaiting delivery to the engine, plus the permit its
/// originating execution still holds. Dropping the permit (on success,
/// permanent failure, or attempt exhaustion) is the only way it is released.
pub struct SubmissionTracker {
    pub response: WorkResponse,
    pub permit: PermitGuard,
    pub attempt_count: u32,
    pub enqueued_at: Instant,
}

impl SubmissionTracker {
    #[must_use]
    pub fn new(response: WorkResponse, permit: PermitGuard) -> Self {
        Self {
            response,
            permit,
            attempt_count: 0,
            enqueued_at: Instant::now(),
        }
    }
}

/// Configuration the Submitter needs, lifted out of `SdkConfig` so the
/// submitter doesn't depend on the whole config surface.
#[derive(Debug, Clone)]
pub struct SubmitterConfig {
    pub batch_size: usize,
    pub max_submit_attempts: u32,
    pub permanent_error_keywords: Vec<String>,
    pub enabled: bool,
}

/// Asynchronous batching submitter. `enqueue` is cheap and non-blocking;
/// the real work happens in the background loop started by `run`.
pub struct ResponseSubmitter {
    engine: Arc<dyn EngineClient>,
    queue: Mutex<VecDeque<SubmissionTracker>>,
    config: SubmitterConfig,
    stats: Arc<SdkStats>,
}

impl ResponseSubmitter {
    #[must_use]
    pub fn new(engine: Arc<dyn EngineClient>, config: SubmitterConfig, stats: Arc<SdkStats>) -> Self {
        Self {
            engine,
            queue: Mutex::new(VecDeque::new()),
            config,
            stats,
        }
    }

    /// Hand a freshly-dispatched response off to the durable submission
    /// queue. Ownership of the permit transfers here; it is released only
    /// when this tracker reaches a terminal outcome.
    pub async fn enqueue(&self, tracker: SubmissionTracker) {
        let mut queue = self.queue.lock().await;
        queue.push_back(tracker);
        self.stats.set_submission_queue_depth(queue.len());
    }

    /// Current number of trackers awaiting submission, for observability.
    pub async fn queue_depth(&self) -> usize {
        self.queue.lock().await.len()
    }

    /// Background drain loop: paces itself at a fixed interval, selecting
    /// against `shutdown_rx` so shutdown is prompt even mid-sleep. Runs one
    /// final drain after the shutdown signal fires so whatever is already
    /// queued gets one last delivery attempt before the loop exits.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        if !self.config.enabled {
            info!("batch processing disabled; submitter loop will not start");
            return;
        }

        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            self.drain_batch().await;

            tokio::select! {
                () = tokio::time::sleep(DRAIN_INTERVAL) => {}
                _ = shutdown_rx.changed() => {}
            }
        }

        debug!("submitter loop shutting down, draining remaining queue once");
        self.drain_batch().await;
    }

    #[instrument(skip(self))]
    async fn drain_batch(&self) {
        let batch = {
            let mut queue = self.queue.lock().await;
            let take = self.config.batch_size.min(queue.len());
            let batch: Vec<SubmissionTracker> = queue.drain(..take).collect();
            self.stats.set_submission_queue_depth(queue.len());
            batch
        };

        if batch.is_empty() {
            return;
        }

        let responses: Vec<WorkResponse> = batch.iter().map(|t| t.response.clone()).collect();

        match self.engine.submit_bulk_results(&responses).await {
            Ok(()) => {
                let count = batch.len();
                for tracker in batch {
                    drop(tracker.permit);
                    self.stats.record_submission(true);
                }
                debug!(count, "submitted batch of responses");
            }
            Err(err) => {
                let permanent = is_permanent_error(err.classification_text(), &self.config.permanent_error_keywords);
                warn!(%err, permanent, batch_size = batch.len(), "bulk submission failed");
                self.reconcile_failed_batch(batch, permanent).await;
            }
        }
    }

    async fn reconcile_failed_batch(&self, batch: Vec<SubmissionTracker>, permanent: bool) {
        let mut retry = Vec::new();
        for mut tracker in batch {
            tracker.attempt_count += 1;
            if permanent || tracker.attempt_count >= self.config.max_submit_attempts {
                error!(
                    step_execution_id = tracker.response.step_execution_id,
                    attempt_count = tracker.attempt_count,
                    permanent,
                    "dropping response after permanent failure or attempt exhaustion"
                );
                drop(tracker.permit);
                self.stats.record_submission(false);
            } else {
                retry.push(tracker);
            }
        }

        if !retry.is_empty() {
            let mut queue = self.queue.lock().await;
            for tracker in retry {
                queue.push_back(tracker);
            }
            self.stats.set_submission_queue_depth(queue.len());
        }
    }
}

/// Case-insensitive substring match against the configured permanent-error
/// keyword list. An empty keyword list never matches.
#[must_use]
pub fn is_permanent_error(body: &str, keywords: &[String]) -> bool {
    let lowered = body.to_lowercase();
    keywords.iter().any(|keyword| lowered.contains(&keyword.to_lowercase()))
}

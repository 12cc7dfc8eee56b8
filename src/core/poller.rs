//! Polling Controller: the credit-based pull engine. Computes available
//! permits per handler, requests exactly that much work from the engine,
//! releases whatever wasn't used, and hands the rest to the Dispatcher.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::domain::{HandlerTable, PermitGuard};
use crate::ports::engine_client::{EngineClient, EngineError, PollRequest};
use crate::stats::SdkStats;

use super::dispatcher::Dispatcher;

/// Fixed pacing between poll iterations, to avoid busy-looping when no
/// permits are free.
const POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Backoff applied specifically after a poll transport failure.
const POLL_FAILURE_BACKOFF: Duration = Duration::from_secs(1);
/// Absolute cap on a single handler's requested batch size, regardless of
/// configuration or available permits.
const ABSOLUTE_BATCH_CAP: u32 = 5000;

/// Continuously pulls work in quantities the host can immediately accept.
pub struct PollingController {
    handlers: Arc<HandlerTable>,
    engine: Arc<dyn EngineClient>,
    dispatcher: Arc<Dispatcher>,
    batch_size: u32,
    stats: Arc<SdkStats>,
    error_suppressed: AtomicBool,
}

impl PollingController {
    #[must_use]
    pub fn new(
        handlers: Arc<HandlerTable>,
        engine: Arc<dyn EngineClient>,
        dispatcher: Arc<Dispatcher>,
        batch_size: u32,
        stats: Arc<SdkStats>,
    ) -> Self {
        Self {
            handlers,
            engine,
            dispatcher,
            batch_size,
            stats,
            error_suppressed: AtomicBool::new(false),
        }
    }

    /// Run the poll loop until `shutdown_rx` fires. Checked via
    /// `tokio::select!` against the pacing sleep so shutdown is prompt even
    /// mid-sleep.
    pub async fn run(self: Arc<Self>, mut shutdown_rx: watch::Receiver<bool>) {
        loop {
            if *shutdown_rx.borrow() {
                break;
            }

            let sleep_for = match self.poll_once().await {
                PollOutcome::HadItems | PollOutcome::Empty => POLL_INTERVAL,
                PollOutcome::Failed => POLL_FAILURE_BACKOFF,
            };

            tokio::select! {
                () = tokio::time::sleep(sleep_for) => {}
                _ = shutdown_rx.changed() => { break; }
            }
        }

        debug!("poll loop shutting down");
    }

    #[instrument(skip(self))]
    async fn poll_once(&self) -> PollOutcome {
        let mut acquired: HashMap<(String, String), VecDeque<PermitGuard>> = HashMap::new();
        let mut requests = Vec::new();

        for handler in self.handlers.iter() {
            let available = handler.permits.available();
            let size = available.min(self.batch_size).min(ABSOLUTE_BATCH_CAP);
            if size == 0 {
                continue;
            }

            let guards = handler.permits.try_acquire_up_to(size);
            if guards.is_empty() {
                continue;
            }

            requests.push(PollRequest {
                namespace: handler.namespace.clone(),
                name: handler.name.clone(),
                size: guards.len() as u32,
            });
            acquired.insert((handler.namespace.clone(), handler.name.clone()), guards.into());
        }

        if requests.is_empty() {
            return PollOutcome::Empty;
        }

        match self.engine.poll(&requests).await {
            Ok(items) => {
                let item_count = items.len();
                self.on_poll_success(item_count);

                for item in items {
                    let key = (item.step_namespace.clone(), item.step_name.clone());
                    match acquired.get_mut(&key).and_then(VecDeque::pop_front) {
                        Some(guard) => self.dispatcher.dispatch(item, guard),
                        None => {
                            warn!(
                                step_namespace = %item.step_namespace,
                                step_name = %item.step_name,
                                "engine returned a work item for a handler we did not request it for; dropping"
                            );
                        }
                    }
                }

                if item_count > 0 {
                    info!(item_count, "poll returned work items");
                } else {
                    debug!("poll returned no work items");
                }

                self.stats.record_poll_iteration(item_count as u64, false);
                // Remaining guards in `acquired` drop here, releasing any
                // permits the engine didn't have work for.
                if item_count > 0 {
                    PollOutcome::HadItems
                } else {
                    PollOutcome::Empty
                }
            }
            Err(err) => {
                self.on_poll_failure(&err);
                self.stats.record_poll_iteration(0, true);
                // `acquired` drops here: every borrowed permit is released
                // since none of them were handed to the dispatcher.
                PollOutcome::Failed
            }
        }
    }

    fn on_poll_failure(&self, err: &EngineError) {
        if !self.error_suppressed.swap(true, Ordering::SeqCst) {
            error!(%err, "poll request failed; further failures suppressed until recovery");
        }
    }

    fn on_poll_success(&self, item_count: usize) {
        if item_count > 0 && self.error_suppressed.swap(false, Ordering::SeqCst) {
            info!("poll recovered after prior failures");
        }
    }
}

enum PollOutcome {
    HadItems,
    Empty,
    Failed,
}

//! Work Dispatcher: routes a polled `WorkItem` to its registered handler,
//! runs it in the handler's scheduling domain, enforces a per-step timeout,
//! normalizes the outcome into a `StepResult`, and hands the resulting
//! `WorkResponse` off to the Submitter.
//!
//! Permit accounting invariant: every `WorkItem` passed to `dispatch` carries
//! exactly one `PermitGuard`, and exactly one release occurs for it — either
//! immediately here (unknown handler) or later, when the Submitter retires
//! the `SubmissionTracker` it is handed off in.

use std::sync::Arc;
use std::time::Duration;

use tokio::runtime::Runtime;
use tracing::{instrument, warn};

use crate::domain::context;
use crate::domain::{
    Handler, HandlerOutcome, HandlerTable, PermitGuard, SchedulingDomain, StepResult, WorkItem,
    WorkResponse,
};

use super::submitter::{ResponseSubmitter, SubmissionTracker};

/// A step timeout at or above this value is treated as "never" and no
/// deadline is installed at all, per the concurrency model's special case.
fn effective_timeout(step_timeout_millis: u64) -> Option<Duration> {
    const NO_TIMEOUT_THRESHOLD_MILLIS: u64 = i32::MAX as u64;
    if step_timeout_millis == 0 || step_timeout_millis >= NO_TIMEOUT_THRESHOLD_MILLIS {
        None
    } else {
        Some(Duration::from_millis(step_timeout_millis))
    }
}

/// Routes work items to handlers and normalizes their results.
///
/// Holds a dedicated multi-threaded Tokio runtime for the CPU scheduling
/// domain, built once at construction and shared by every CPU-bound
/// handler; I/O-bound handlers are spawned on the ambient runtime the
/// `WorkerClient` itself was constructed on.
pub struct Dispatcher {
    handlers: Arc<HandlerTable>,
    submitter: Arc<ResponseSubmitter>,
    cpu_runtime: Runtime,
    step_timeout: Option<Duration>,
}

impl Dispatcher {
    /// Build a dispatcher with its own bounded CPU-domain runtime of
    /// `fixed_thread_pool_size` worker threads.
    pub fn new(
        handlers: Arc<HandlerTable>,
        submitter: Arc<ResponseSubmitter>,
        fixed_thread_pool_size: usize,
        step_timeout_millis: u64,
    ) -> std::io::Result<Self> {
        let cpu_runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(fixed_thread_pool_size.max(1))
            .thread_name("unmeshed-cpu-worker")
            .enable_all()
            .build()?;

        Ok(Self {
            handlers,
            submitter,
            cpu_runtime,
            step_timeout: effective_timeout(step_timeout_millis),
        })
    }

    /// Dispatch one work item. `permit` was already borrowed by the Polling
    /// Controller on this handler's behalf; ownership transfers into the
    /// `SubmissionTracker` once the handler finishes, or is released
    /// immediately if the handler can't be found.
    #[instrument(skip(self, permit), fields(step_execution_id = item.step_execution_id, step_namespace = %item.step_namespace, step_name = %item.step_name))]
    pub fn dispatch(&self, item: WorkItem, permit: PermitGuard) {
        let Some(handler) = self.handlers.get(&item.step_namespace, &item.step_name) else {
            warn!("no handler registered for incoming work item; dropping");
            drop(permit);
            return;
        };

        let work_item = Arc::new(item);
        let submitter = Arc::clone(&self.submitter);
        let step_timeout = self.step_timeout;
        let domain = handler.domain;

        let run = run_handler(handler, work_item, step_timeout, submitter, permit);

        match domain {
            SchedulingDomain::Io => {
                tokio::spawn(run);
            }
            SchedulingDomain::Cpu => {
                self.cpu_runtime.spawn(run);
            }
        }
    }
}

async fn run_handler(
    handler: Arc<Handler>,
    work_item: Arc<WorkItem>,
    step_timeout: Option<Duration>,
    submitter: Arc<ResponseSubmitter>,
    permit: PermitGuard,
) {
    let started_at = now_epoch_ms();
    let outcome = invoke_with_timeout(&handler, Arc::clone(&work_item), step_timeout).await;
    let completed_at = now_epoch_ms();

    let result = match outcome {
        Ok(outcome) => map_outcome(outcome, started_at, completed_at),
        Err(message) => {
            warn!(
                step_execution_id = work_item.step_execution_id,
                error = %message,
                "handler invocation failed"
            );
            StepResult::failed(&message, started_at, completed_at)
        }
    };

    let response = WorkResponse::from_step_result(&work_item, result);
    let tracker = SubmissionTracker::new(response, permit);
    submitter.enqueue(tracker).await;
}

/// Invoke the handler under the Context Carrier scope, enforcing `timeout`
/// if one is configured. A timeout surfaces as an ordinary handler failure,
/// never a panic or propagated error.
async fn invoke_with_timeout(
    handler: &Handler,
    work_item: Arc<WorkItem>,
    timeout: Option<Duration>,
) -> Result<HandlerOutcome, String> {
    let invocation = context::scope(Arc::clone(&work_item), (handler.invoke)(work_item));

    match timeout {
        Some(duration) => match tokio::time::timeout(duration, invocation).await {
            Ok(outcome) => outcome,
            Err(_) => Err(format!("step timed out after {}ms", duration.as_millis())),
        },
        None => invocation.await,
    }
}

/// Map whatever the handler returned into the normalized `StepResult` per
/// the dispatcher's output-mapping rule.
fn map_outcome(outcome: HandlerOutcome, started_at: i64, completed_at: i64) -> StepResult {
    match outcome {
        HandlerOutcome::Shaped {
            status,
            output,
            reschedule_after_seconds,
        } => StepResult {
            status,
            output,
            reschedule_after_seconds,
            started_at,
            completed_at,
        },
        HandlerOutcome::Output(output) => StepResult::completed(output, started_at, completed_at),
        HandlerOutcome::Scalar(value) => StepResult::wrap_scalar(value, started_at, completed_at),
    }
}

fn now_epoch_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

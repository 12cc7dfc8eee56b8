//! Per-execution ambient context: makes the in-flight `WorkItem` visible to
//! handler code (and anything it calls) without threading it through every
//! call signature.
//!
//! Handlers run cooperatively on a shared Tokio runtime and can suspend and
//! resume on a different OS thread between `.await` points, so this cannot be
//! an OS thread-local. `tokio::task_local!` scopes the value to the async
//! task instead, and correctly follows it across executor threads.

use std::sync::Arc;

use super::work_item::WorkItem;

tokio::task_local! {
    static CURRENT_WORK_ITEM: Arc<WorkItem>;
}

/// Run `future` with `work_item` set as the ambient context for its entire
/// lifetime, including everything it calls.
pub async fn scope<F, T>(work_item: Arc<WorkItem>, future: F) -> T
where
    F: std::future::Future<Output = T>,
{
    CURRENT_WORK_ITEM.scope(work_item, future).await
}

/// The `WorkItem` behind the handler invocation currently executing on this
/// task, or `None` outside of a `scope(...)`-wrapped execution.
#[must_use]
pub fn current_work_item() -> Option<Arc<WorkItem>> {
    CURRENT_WORK_ITEM.try_with(Arc::clone).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_work_item(step_execution_id: i64) -> Arc<WorkItem> {
        Arc::new(
            serde_json::from_value(json!({
                "stepId": 1,
                "processId": 2,
                "stepExecutionId": step_execution_id,
                "runCount": 1,
                "stepName": "echo",
                "stepNamespace": "default",
                "inputParam": {},
                "isOptional": false,
                "polled": true,
                "priority": 0,
            }))
            .unwrap(),
        )
    }

    #[tokio::test]
    async fn context_is_visible_inside_scope() {
        let item = sample_work_item(42);
        scope(Arc::clone(&item), async {
            assert_eq!(current_work_item().unwrap().step_execution_id, 42);
        })
        .await;
    }

    #[tokio::test]
    async fn context_is_absent_outside_scope() {
        assert!(current_work_item().is_none());
    }

    #[tokio::test]
    async fn concurrent_executions_do_not_see_each_others_context() {
        let a = tokio::spawn(scope(sample_work_item(1), async {
            tokio::task::yield_now().await;
            current_work_item().unwrap().step_execution_id
        }));
        let b = tokio::spawn(scope(sample_work_item(2), async {
            tokio::task::yield_now().await;
            current_work_item().unwrap().step_execution_id
        }));

        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert_eq!(a, 1);
        assert_eq!(b, 2);
    }
}

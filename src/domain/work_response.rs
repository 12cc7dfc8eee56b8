//! Wire shape submitted back to the engine's bulk-results endpoint.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::step_result::{StepResult, StepStatus};
use super::work_item::WorkItem;

/// One item of a bulk submission to the engine.
///
/// Identity is `step_execution_id`; the engine is expected to key results by
/// it, making at-least-once submission safe to retry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkResponse {
    #[serde(rename = "stepId")]
    pub step_id: i64,

    #[serde(rename = "processId")]
    pub process_id: i64,

    #[serde(rename = "stepExecutionId")]
    pub step_execution_id: i64,

    #[serde(rename = "runCount")]
    pub run_count: i32,

    pub output: Map<String, Value>,

    pub status: StepStatus,

    #[serde(
        rename = "rescheduleAfterSeconds",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub reschedule_after_seconds: Option<i64>,

    #[serde(rename = "startedAt")]
    pub started_at: i64,
}

/// Key used to attach the handler-completion timestamp to every response's
/// output map, per the dispatcher's contract.
pub const WORK_COMPLETED_AT_KEY: &str = "__workCompletedAt";

impl WorkResponse {
    /// Build a `WorkResponse` from a dispatcher-produced `StepResult`,
    /// copying identity fields from the originating `WorkItem` unchanged and
    /// stamping the completion timestamp into the output map.
    #[must_use]
    pub fn from_step_result(work_item: &WorkItem, mut result: StepResult) -> Self {
        result.output.insert(
            WORK_COMPLETED_AT_KEY.to_string(),
            Value::from(result.completed_at),
        );

        let reschedule_after_seconds = match result.status {
            StepStatus::Running if result.reschedule_after_seconds.is_some_and(|s| s > 0) => {
                result.reschedule_after_seconds
            }
            _ => None,
        };

        Self {
            step_id: work_item.step_id,
            process_id: work_item.process_id,
            step_execution_id: work_item.step_execution_id,
            run_count: work_item.run_count,
            output: result.output,
            status: result.status,
            reschedule_after_seconds,
            started_at: result.started_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample_work_item() -> WorkItem {
        serde_json::from_value(json!({
            "stepId": 1,
            "processId": 2,
            "stepExecutionId": 7,
            "runCount": 1,
            "stepName": "echo",
            "stepNamespace": "default",
            "inputParam": {},
            "isOptional": false,
            "polled": true,
            "priority": 0,
        }))
        .unwrap()
    }

    #[test]
    fn identity_fields_are_copied_unchanged() {
        let item = sample_work_item();
        let result = StepResult::completed(Map::new(), 10, 20);
        let response = WorkResponse::from_step_result(&item, result);

        assert_eq!(response.step_id, item.step_id);
        assert_eq!(response.process_id, item.process_id);
        assert_eq!(response.step_execution_id, item.step_execution_id);
        assert_eq!(response.run_count, item.run_count);
    }

    #[test]
    fn completed_timestamp_is_stamped_into_output() {
        let item = sample_work_item();
        let result = StepResult::completed(Map::new(), 10, 20);
        let response = WorkResponse::from_step_result(&item, result);

        assert_eq!(
            response.output.get(WORK_COMPLETED_AT_KEY).unwrap(),
            &Value::from(20)
        );
        assert!(response.started_at >= 10 && response.started_at <= response.output
            [WORK_COMPLETED_AT_KEY]
            .as_i64()
            .unwrap());
    }

    #[test]
    fn running_with_positive_reschedule_keeps_it() {
        let item = sample_work_item();
        let mut result = StepResult::completed(Map::new(), 0, 1);
        result.status = StepStatus::Running;
        result.reschedule_after_seconds = Some(5);
        let response = WorkResponse::from_step_result(&item, result);

        assert_eq!(response.status, StepStatus::Running);
        assert_eq!(response.reschedule_after_seconds, Some(5));
    }

    #[test]
    fn completed_status_drops_reschedule_even_if_set() {
        let item = sample_work_item();
        let mut result = StepResult::completed(Map::new(), 0, 1);
        result.reschedule_after_seconds = Some(5);
        let response = WorkResponse::from_step_result(&item, result);

        assert_eq!(response.status, StepStatus::Completed);
        assert_eq!(response.reschedule_after_seconds, None);
    }
}

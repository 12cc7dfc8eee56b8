//! The outcome of one handler invocation, before it is turned into a
//! `WorkResponse` for the wire.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Status of a completed (or still-running) step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StepStatus {
    Completed,
    Running,
    Failed,
}

/// Normalized result of a handler invocation.
///
/// Produced by the dispatcher from whatever the handler actually returned —
/// a pre-shaped result, a bare output map, or an arbitrary JSON-compatible
/// value wrapped as `{"result": value}`.
#[derive(Debug, Clone)]
pub struct StepResult {
    pub status: StepStatus,
    pub output: Map<String, Value>,
    pub reschedule_after_seconds: Option<i64>,
    pub started_at: i64,
    pub completed_at: i64,
}

impl StepResult {
    /// Build a `completed` result from a raw JSON map returned by a handler.
    #[must_use]
    pub fn completed(output: Map<String, Value>, started_at: i64, completed_at: i64) -> Self {
        Self {
            status: StepStatus::Completed,
            output,
            reschedule_after_seconds: None,
            started_at,
            completed_at,
        }
    }

    /// Build a `failed` result carrying a truncated error message.
    #[must_use]
    pub fn failed(error_message: &str, started_at: i64, completed_at: i64) -> Self {
        let mut output = Map::new();
        output.insert(
            "error".to_string(),
            Value::String(truncate_error_message(error_message)),
        );
        Self {
            status: StepStatus::Failed,
            output,
            reschedule_after_seconds: None,
            started_at,
            completed_at,
        }
    }

    /// Wrap an arbitrary JSON-compatible handler return value as
    /// `{"result": value}`, per the dispatcher's output-mapping rule.
    #[must_use]
    pub fn wrap_scalar(value: Value, started_at: i64, completed_at: i64) -> Self {
        let mut output = Map::new();
        output.insert("result".to_string(), value);
        Self::completed(output, started_at, completed_at)
    }
}

/// Maximum error message length before truncation, per the dispatcher's
/// contract (§8.6): messages longer than this are cut to exactly this many
/// characters and suffixed with `"... (truncated)"`.
pub const MAX_ERROR_MESSAGE_CHARS: usize = 1000;
const TRUNCATION_SUFFIX: &str = "... (truncated)";

/// Truncate an error message to `MAX_ERROR_MESSAGE_CHARS` characters,
/// appending the truncation suffix when truncation actually occurred.
#[must_use]
pub fn truncate_error_message(message: &str) -> String {
    let char_count = message.chars().count();
    if char_count <= MAX_ERROR_MESSAGE_CHARS {
        return message.to_string();
    }

    let truncated: String = message.chars().take(MAX_ERROR_MESSAGE_CHARS).collect();
    format!("{truncated}{TRUNCATION_SUFFIX}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_message_is_untouched() {
        let message = "boom";
        assert_eq!(truncate_error_message(message), "boom");
    }

    #[test]
    fn exactly_max_length_is_untouched() {
        let message = "a".repeat(MAX_ERROR_MESSAGE_CHARS);
        assert_eq!(truncate_error_message(&message), message);
    }

    #[test]
    fn over_max_length_is_truncated_with_suffix() {
        let message = "a".repeat(2000);
        let truncated = truncate_error_message(&message);
        assert_eq!(truncated.chars().count(), 1015);
        assert!(truncated.starts_with(&"a".repeat(1000)));
        assert!(truncated.ends_with("... (truncated)"));
    }

    #[test]
    fn failed_result_carries_truncated_error_in_output() {
        let message = "a".repeat(2000);
        let result = StepResult::failed(&message, 0, 1);
        assert_eq!(result.status, StepStatus::Failed);
        let error = result.output.get("error").unwrap().as_str().unwrap();
        assert_eq!(error.chars().count(), 1015);
    }
}

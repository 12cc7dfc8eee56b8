//! Wire shape for a unit of work handed to the SDK by a poll response.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One unit of work the engine asks the SDK to execute.
///
/// Field names mirror the wire shape exactly via `serde(rename)`; Rust code
/// reads the `snake_case` names.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkItem {
    #[serde(rename = "stepId")]
    pub step_id: i64,

    #[serde(rename = "processId")]
    pub process_id: i64,

    #[serde(rename = "stepExecutionId")]
    pub step_execution_id: i64,

    #[serde(rename = "runCount")]
    pub run_count: i32,

    #[serde(rename = "stepName")]
    pub step_name: String,

    #[serde(rename = "stepNamespace")]
    pub step_namespace: String,

    #[serde(rename = "stepRef", default, skip_serializing_if = "Option::is_none")]
    pub step_ref: Option<String>,

    #[serde(rename = "inputParam", default)]
    pub input_param: Map<String, Value>,

    #[serde(rename = "isOptional", default)]
    pub is_optional: bool,

    #[serde(default, deserialize_with = "deserialize_lenient_bool")]
    pub polled: bool,

    #[serde(default)]
    pub started: Option<i64>,

    #[serde(default)]
    pub scheduled: Option<i64>,

    #[serde(default)]
    pub updated: Option<i64>,

    #[serde(default)]
    pub priority: i32,
}

impl WorkItem {
    /// `(namespace, name)` key used to look up the registered `Handler`.
    #[must_use]
    pub fn handler_key(&self) -> (&str, &str) {
        (&self.step_namespace, &self.step_name)
    }
}

/// Accepts a JSON bool, a numeric 0/1, or the strings `"true"`/`"false"` (and
/// numeric strings), coercing all of them to a Rust `bool`. 0 → false,
/// any other number → true.
pub fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    lenient_bool_from_value(&value).map_err(serde::de::Error::custom)
}

fn lenient_bool_from_value(value: &Value) -> Result<bool, String> {
    match value {
        Value::Bool(b) => Ok(*b),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(i != 0)
            } else if let Some(f) = n.as_f64() {
                Ok(f != 0.0)
            } else {
                Err(format!("cannot coerce number {n} to bool"))
            }
        }
        Value::String(s) => match s.trim() {
            "true" => Ok(true),
            "false" => Ok(false),
            other => other
                .parse::<f64>()
                .map(|f| f != 0.0)
                .map_err(|_| format!("cannot coerce string {other:?} to bool")),
        },
        Value::Null => Ok(false),
        other => Err(format!("cannot coerce {other} to bool")),
    }
}

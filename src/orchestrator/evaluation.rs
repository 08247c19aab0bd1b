//! Progress evaluation verdicts

use crate::action::Action;
use crate::error::ExtractionError;
use serde_json::Value;

const DEFAULT_COMPLETED_REASON: &str = "The goal has been achieved.";
const DEFAULT_REPLAN_REASON: &str = "The plan needs to be rebuilt.";

/// The model's judgement of an evaluation snapshot
#[derive(Debug, Clone, PartialEq)]
pub enum EvaluationVerdict {
    /// Goal achieved
    Completed {
        /// Why the goal is done
        reason: String,
        /// What on the page shows it
        evidence: String,
    },
    /// Current plan no longer applies
    Replan {
        /// Why the plan failed
        reason: String,
    },
    /// Not done yet; take this action next
    Continue(Action),
}

impl EvaluationVerdict {
    /// Interpret a parsed evaluation reply.
    ///
    /// `status` must be `completed`, `replan` or `continue`. A `continue`
    /// verdict carries its action either flat alongside `status` or nested
    /// under an `action` object.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        let status = value
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or(ExtractionError::MissingField("status"))?;

        match status.as_str() {
            "completed" => Ok(EvaluationVerdict::Completed {
                reason: string_field(&value, "reason")
                    .unwrap_or_else(|| DEFAULT_COMPLETED_REASON.to_string()),
                evidence: string_field(&value, "evidence").unwrap_or_default(),
            }),
            "replan" => Ok(EvaluationVerdict::Replan {
                reason: string_field(&value, "reason")
                    .unwrap_or_else(|| DEFAULT_REPLAN_REASON.to_string()),
            }),
            "continue" => {
                let nested = value.get("action").filter(|a| a.is_object()).cloned();
                Action::from_value(nested.unwrap_or(value)).map(EvaluationVerdict::Continue)
            }
            other => Err(ExtractionError::UnknownStatus(other.to_string())),
        }
    }
}

fn string_field(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .map(str::to_string)
}

//! Action, plan and action-kind types

use crate::error::ExtractionError;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// The closed set of browser operations the orchestrator can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActionKind {
    /// Navigate to `url`
    #[serde(rename = "goto")]
    Goto,
    /// Click `selector`
    #[serde(rename = "click")]
    Click,
    /// Type `value` (or `text`) into `selector`
    #[serde(rename = "fill")]
    Fill,
    /// Hover over `selector`
    #[serde(rename = "hover")]
    Hover,
    /// Wait for `selector`/`condition` up to `timeout` ms
    #[serde(rename = "waitUntil")]
    WaitUntil,
    /// Search the web for `query`
    #[serde(rename = "google_search")]
    GoogleSearch,
    /// The goal needs no further action
    #[serde(rename = "end")]
    End,
}

impl ActionKind {
    /// Wire name of this kind
    pub fn as_str(&self) -> &'static str {
        match self {
            ActionKind::Goto => "goto",
            ActionKind::Click => "click",
            ActionKind::Fill => "fill",
            ActionKind::Hover => "hover",
            ActionKind::WaitUntil => "waitUntil",
            ActionKind::GoogleSearch => "google_search",
            ActionKind::End => "end",
        }
    }
}

impl fmt::Display for ActionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ActionKind {
    type Err = ExtractionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "goto" => Ok(ActionKind::Goto),
            "click" => Ok(ActionKind::Click),
            "fill" => Ok(ActionKind::Fill),
            "hover" => Ok(ActionKind::Hover),
            "waitUntil" => Ok(ActionKind::WaitUntil),
            "google_search" => Ok(ActionKind::GoogleSearch),
            "end" => Ok(ActionKind::End),
            other => Err(ExtractionError::UnknownActionKind(other.to_string())),
        }
    }
}

/// A single browser operation.
///
/// Fields that do not apply to the action's kind are `None` and are left out
/// of the serialized form entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    /// Operation kind, serialized as `action`
    #[serde(rename = "action")]
    pub kind: ActionKind,
    /// Target element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Visible text of the target, or text to type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Value to fill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Navigation destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Search query for `google_search`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Wait condition for `waitUntil`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
    /// Timeout in milliseconds
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_u64"
    )]
    pub timeout: Option<u64>,
    /// Model-reported confidence in `[0, 1]`
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "lenient_f64"
    )]
    pub confidence: Option<f64>,
    /// Model-reported rationale
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Extraction descriptor, only meaningful for extraction actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extract: Option<Value>,
    /// Attribute to read, only meaningful for extraction actions
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Action {
    /// Create an action of `kind` with no fields set
    pub fn new(kind: ActionKind) -> Self {
        Self {
            kind,
            selector: None,
            text: None,
            value: None,
            url: None,
            query: None,
            condition: None,
            timeout: None,
            confidence: None,
            reason: None,
            extract: None,
            attribute: None,
        }
    }

    /// `goto` action
    pub fn goto(url: impl Into<String>) -> Self {
        Self::new(ActionKind::Goto).with_url(url)
    }

    /// `end` action with a reason
    pub fn end(reason: impl Into<String>) -> Self {
        Self::new(ActionKind::End).with_reason(reason)
    }

    /// Set the selector
    pub fn with_selector(mut self, selector: impl Into<String>) -> Self {
        self.selector = Some(selector.into());
        self
    }

    /// Set the value
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the url
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    /// Set the query
    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    /// Set the confidence
    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Whether this action finishes the goal
    pub fn is_end(&self) -> bool {
        self.kind == ActionKind::End
    }

    /// Build an action from a parsed model payload.
    ///
    /// The `action` field must name a known kind; anything else is rejected
    /// rather than passed through.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        let kind = value
            .get("action")
            .and_then(Value::as_str)
            .ok_or(ExtractionError::MissingField("action"))?;
        kind.parse::<ActionKind>()?;

        serde_json::from_value(value.clone()).map_err(|e| ExtractionError::MalformedJson {
            raw: value.to_string(),
            reason: e.to_string(),
        })
    }
}

/// One anticipated step of a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStep {
    /// 1-based step number
    #[serde(default)]
    pub step: u32,
    /// Planned operation
    pub action: ActionKind,
    /// Target element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selector: Option<String>,
    /// Text hint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    /// Value to fill
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Navigation destination
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Search query
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub query: Option<String>,
    /// Why this step is needed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

/// Ordered plan for one goal.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Plan {
    /// Steps in execution order
    pub steps: Vec<PlanStep>,
}

impl Plan {
    /// Parse a plan from model or caller JSON.
    ///
    /// Accepts a bare array of steps, or an object holding the array under
    /// `plan` or `steps`.
    pub fn from_value(value: Value) -> Result<Self, ExtractionError> {
        let steps = match value {
            Value::Array(items) => Value::Array(items),
            Value::Object(mut obj) => match obj.remove("plan").or_else(|| obj.remove("steps")) {
                Some(steps @ Value::Array(_)) => steps,
                _ => return Err(ExtractionError::MissingField("plan")),
            },
            _ => return Err(ExtractionError::MissingField("plan")),
        };

        serde_json::from_value(steps.clone())
            .map(|steps| Plan { steps })
            .map_err(|e| ExtractionError::MalformedJson {
                raw: steps.to_string(),
                reason: e.to_string(),
            })
    }

    /// Number of steps
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the plan has no steps
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Step at zero-based `index`
    pub fn get(&self, index: usize) -> Option<&PlanStep> {
        self.steps.get(index)
    }
}

/// Accept numbers or numeric strings; anything else becomes `None`.
fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_u64().or_else(|| n.as_f64().map(|f| f.max(0.0) as u64)),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient_f64<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64(),
        Some(Value::String(s)) => s.trim().parse().ok(),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_kind_wire_names() {
        assert_eq!(
            serde_json::to_string(&ActionKind::WaitUntil).unwrap(),
            "\"waitUntil\""
        );
        assert_eq!(
            serde_json::to_string(&ActionKind::GoogleSearch).unwrap(),
            "\"google_search\""
        );
        assert_eq!("goto".parse::<ActionKind>().unwrap(), ActionKind::Goto);
    }

    #[test]
    fn test_unknown_kind_rejected() {
        let err = Action::from_value(json!({"action": "scroll"})).unwrap_err();
        assert!(matches!(err, ExtractionError::UnknownActionKind(k) if k == "scroll"));
    }

    #[test]
    fn test_missing_kind_rejected() {
        let err = Action::from_value(json!({"selector": "#a"})).unwrap_err();
        assert!(matches!(err, ExtractionError::MissingField("action")));
    }

    #[test]
    fn test_absent_fields_not_serialized() {
        let action = Action::new(ActionKind::Click).with_selector("#submit");
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"action": "click", "selector": "#submit"})
        );
    }

    #[test]
    fn test_lenient_numbers() {
        let action = Action::from_value(json!({
            "action": "waitUntil",
            "selector": "#list",
            "timeout": "1500",
            "confidence": "0.7"
        }))
        .unwrap();
        assert_eq!(action.timeout, Some(1500));
        assert_eq!(action.confidence, Some(0.7));
    }

    #[test]
    fn test_plan_shapes() {
        let array = json!([{"step": 1, "action": "goto", "url": "https://mail.example.com", "reason": "open mail"}]);
        let plan = Plan::from_value(array).unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.get(0).unwrap().action, ActionKind::Goto);

        let wrapped = json!({"steps": [{"step": 1, "action": "click", "selector": "a"}]});
        assert_eq!(Plan::from_value(wrapped).unwrap().len(), 1);

        assert!(Plan::from_value(json!({"step": 1})).is_err());
        assert!(Plan::from_value(json!([{"step": 1, "action": "teleport"}])).is_err());
    }
}

//! Wire message types
//!
//! Every message is a JSON object with a `type` discriminator. Inbound
//! messages come from the browser side, outbound messages are the
//! orchestrator's answers.

use crate::action::{Action, Plan};
use crate::error::ProtocolError;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::Local;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

/// Inbound `type` values this server understands
pub const INBOUND_TYPES: &[&str] = &[
    "init",
    "dom_with_image",
    "dom_with_image_evaluation",
    "client_log",
    "user_continue",
];

/// Messages received from the caller
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundMessage {
    /// Start a new goal
    Init {
        /// The goal text
        #[serde(default)]
        message: Option<String>,
    },
    /// Page snapshot for planning or execution
    DomWithImage(SnapshotPayload),
    /// Page snapshot to evaluate progress against
    DomWithImageEvaluation(SnapshotPayload),
    /// Browser-side log line to journal
    ClientLog {
        /// Event label
        #[serde(default = "unknown_event")]
        event_type: String,
        /// Log message
        #[serde(default)]
        message: String,
        /// Structured extras
        #[serde(default)]
        extra_data: Value,
    },
    /// The user finished logging in and wants automation to resume
    UserContinue,
}

fn unknown_event() -> String {
    "UNKNOWN".to_string()
}

impl InboundMessage {
    /// Parse one raw message.
    ///
    /// Non-JSON input and field validation failures are `InvalidMessage`; a
    /// well-formed object with an unrecognised `type` is `UnknownType`.
    pub fn parse(text: &str) -> Result<Self, ProtocolError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|e| ProtocolError::InvalidMessage(format!("not valid JSON: {}", e)))?;

        let kind = value
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| ProtocolError::InvalidMessage("missing \"type\" field".to_string()))?;
        if !INBOUND_TYPES.contains(&kind) {
            return Err(ProtocolError::UnknownType(kind.to_string()));
        }

        serde_json::from_value(value).map_err(|e| ProtocolError::InvalidMessage(e.to_string()))
    }

    /// The `type` discriminator
    pub fn kind(&self) -> &'static str {
        match self {
            InboundMessage::Init { .. } => "init",
            InboundMessage::DomWithImage(_) => "dom_with_image",
            InboundMessage::DomWithImageEvaluation(_) => "dom_with_image_evaluation",
            InboundMessage::ClientLog { .. } => "client_log",
            InboundMessage::UserContinue => "user_continue",
        }
    }
}

/// Caller-held progress sent alongside each snapshot
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SnapshotContext {
    /// Goal text, for callers that do not rely on session state
    #[serde(default)]
    pub goal: Option<String>,
    /// Current step counter
    #[serde(default)]
    pub step: Option<u32>,
    /// Plan previously sent to the caller
    #[serde(default)]
    pub plan: Option<Value>,
    /// Last action the caller performed
    #[serde(default, rename = "lastAction")]
    pub last_action: Option<Value>,
}

/// Body of a `dom_with_image` message
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct SnapshotPayload {
    /// Caller progress
    #[serde(default)]
    pub context: SnapshotContext,
    /// Raw element list in document order
    #[serde(default)]
    pub dom: Vec<Value>,
    /// Base64 screenshot, optionally as a data URL
    #[serde(default)]
    pub image: Option<String>,
    /// Fallback goal text
    #[serde(default)]
    pub message: Option<String>,
    /// Evaluate instead of execute
    #[serde(default, rename = "evaluationMode")]
    pub evaluation_mode: bool,
}

impl SnapshotPayload {
    /// Goal named by the snapshot, if any
    pub fn goal(&self) -> Option<&str> {
        self.context
            .goal
            .as_deref()
            .or(self.message.as_deref())
            .map(str::trim)
            .filter(|g| !g.is_empty())
    }

    /// Step counter, 0 when absent
    pub fn step(&self) -> u32 {
        self.context.step.unwrap_or(0)
    }

    /// Decoded screenshot bytes.
    ///
    /// Accepts bare base64 or a `data:image/...;base64,` URL. An image that
    /// does not decode is dropped with a warning.
    pub fn decode_image(&self) -> Option<Vec<u8>> {
        let raw = self.image.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        let encoded = match raw.split_once(',') {
            Some((prefix, data)) if prefix.starts_with("data:") => data,
            _ => raw,
        };
        match STANDARD.decode(encoded) {
            Ok(bytes) if !bytes.is_empty() => Some(bytes),
            Ok(_) => None,
            Err(e) => {
                warn!("Dropping undecodable screenshot: {}", e);
                None
            }
        }
    }
}

/// What the page looks like, as reported in `page_analysis`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageUnderstanding {
    /// Summarized element count
    pub dom_elements: usize,
    /// Who interprets the page
    pub analysis_method: String,
    /// Login-wall classification
    pub is_login_page: bool,
}

/// Progress figures reported in `page_analysis`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressEvaluation {
    /// `current_step / total_steps * 100`
    pub progress_percentage: f64,
    /// Caller's step counter
    pub current_step: u32,
    /// Plan length, or 1 without a plan
    pub total_steps: usize,
}

/// Body of a `page_analysis` message
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PageAnalysis {
    /// Goal restated as page-level guidance
    pub web_guide: String,
    /// Page facts
    pub page_understanding: PageUnderstanding,
    /// Progress figures
    pub progress_evaluation: ProgressEvaluation,
    /// RFC 3339 local time
    pub timestamp: String,
}

/// Messages sent to the caller
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Ask for a fresh page snapshot
    RequestDom {
        /// Why the snapshot is needed
        message: String,
    },
    /// The plan for the current goal
    Plan {
        /// Ordered steps
        plan: Plan,
    },
    /// The next browser action
    Action {
        /// Step the action belongs to
        step: u32,
        /// The action itself
        action: Action,
    },
    /// Summary of the snapshot just received
    PageAnalysis(PageAnalysis),
    /// Automation is paused on a login wall
    LoginDetected {
        /// Instructions for the user
        message: String,
        /// Always true; the caller should offer a continue control
        show_continue_button: bool,
        /// RFC 3339 local time
        timestamp: String,
    },
    /// Automation resumed after a login pause
    AutomationResumed {
        /// Confirmation text
        message: String,
        /// RFC 3339 local time
        timestamp: String,
    },
    /// The goal was judged achieved
    Completed {
        /// Why the goal is done
        reason: String,
        /// What on the page shows it
        evidence: String,
    },
    /// The current plan was abandoned
    Replan {
        /// Why the plan failed
        reason: String,
        /// Always true
        new_plan_needed: bool,
    },
    /// No further action for this goal
    End {
        /// Explanation, when there is one
        #[serde(skip_serializing_if = "Option::is_none")]
        reason: Option<String>,
    },
    /// A failure, reported once
    Error {
        /// Human-readable detail
        detail: String,
    },
}

impl OutboundMessage {
    /// `request_dom` with a reason
    pub fn request_dom(message: impl Into<String>) -> Self {
        OutboundMessage::RequestDom {
            message: message.into(),
        }
    }

    /// `error` with a detail string
    pub fn error(detail: impl Into<String>) -> Self {
        OutboundMessage::Error {
            detail: detail.into(),
        }
    }

    /// `login_detected` stamped now
    pub fn login_detected() -> Self {
        OutboundMessage::LoginDetected {
            message: "Login required. Sign in, then press Continue.".to_string(),
            show_continue_button: true,
            timestamp: now_rfc3339(),
        }
    }

    /// `automation_resumed` stamped now
    pub fn automation_resumed() -> Self {
        OutboundMessage::AutomationResumed {
            message: "Automation resumed.".to_string(),
            timestamp: now_rfc3339(),
        }
    }

    /// The `type` discriminator
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundMessage::RequestDom { .. } => "request_dom",
            OutboundMessage::Plan { .. } => "plan",
            OutboundMessage::Action { .. } => "action",
            OutboundMessage::PageAnalysis(_) => "page_analysis",
            OutboundMessage::LoginDetected { .. } => "login_detected",
            OutboundMessage::AutomationResumed { .. } => "automation_resumed",
            OutboundMessage::Completed { .. } => "completed",
            OutboundMessage::Replan { .. } => "replan",
            OutboundMessage::End { .. } => "end",
            OutboundMessage::Error { .. } => "error",
        }
    }

    /// Serialize to one JSON line
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                r#"{{"type":"error","detail":"Failed to serialize {} message: {}"}}"#,
                self.kind(),
                e
            )
        })
    }
}

/// Current local time in RFC 3339
pub fn now_rfc3339() -> String {
    Local::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_init() {
        let msg = InboundMessage::parse(r#"{"type":"init","message":"read my mail"}"#).unwrap();
        assert_eq!(
            msg,
            InboundMessage::Init {
                message: Some("read my mail".to_string())
            }
        );
    }

    #[test]
    fn test_parse_snapshot() {
        let msg = InboundMessage::parse(
            r##"{"type":"dom_with_image","context":{"goal":"g","step":2,"lastAction":{"action":"click"}},"dom":[{"tag":"a","selector":"#x"}],"evaluationMode":true}"##,
        )
        .unwrap();
        match msg {
            InboundMessage::DomWithImage(payload) => {
                assert_eq!(payload.goal(), Some("g"));
                assert_eq!(payload.step(), 2);
                assert_eq!(payload.dom.len(), 1);
                assert!(payload.evaluation_mode);
                assert!(payload.context.last_action.is_some());
            }
            other => panic!("unexpected message: {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!(
            InboundMessage::parse("not json"),
            Err(ProtocolError::InvalidMessage(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"message":"x"}"#),
            Err(ProtocolError::InvalidMessage(_))
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"teleport"}"#),
            Err(ProtocolError::UnknownType(t)) if t == "teleport"
        ));
        assert!(matches!(
            InboundMessage::parse(r#"{"type":"dom_with_image","dom":"oops"}"#),
            Err(ProtocolError::InvalidMessage(_))
        ));
    }

    #[test]
    fn test_decode_image() {
        let payload = SnapshotPayload {
            image: Some("data:image/png;base64,aGVsbG8=".to_string()),
            ..Default::default()
        };
        assert_eq!(payload.decode_image(), Some(b"hello".to_vec()));

        let bare = SnapshotPayload {
            image: Some("aGVsbG8=".to_string()),
            ..Default::default()
        };
        assert_eq!(bare.decode_image(), Some(b"hello".to_vec()));

        let broken = SnapshotPayload {
            image: Some("%%%".to_string()),
            ..Default::default()
        };
        assert_eq!(broken.decode_image(), None);
    }

    #[test]
    fn test_outbound_shapes() {
        let action = OutboundMessage::Action {
            step: 1,
            action: Action::goto("https://naver.com"),
        };
        assert_eq!(
            serde_json::to_value(&action).unwrap(),
            json!({"type":"action","step":1,"action":{"action":"goto","url":"https://naver.com"}})
        );

        assert_eq!(
            serde_json::to_value(OutboundMessage::End { reason: None }).unwrap(),
            json!({"type":"end"})
        );

        let login = serde_json::to_value(OutboundMessage::login_detected()).unwrap();
        assert_eq!(login["type"], "login_detected");
        assert_eq!(login["show_continue_button"], true);
        assert!(login["timestamp"].as_str().is_some());

        let replan = OutboundMessage::Replan {
            reason: "stale".to_string(),
            new_plan_needed: true,
        };
        assert_eq!(
            serde_json::to_value(replan).unwrap(),
            json!({"type":"replan","reason":"stale","new_plan_needed":true})
        );
    }
}

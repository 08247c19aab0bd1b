//! Wire-format tests
//!
//! Checks the JSON that leaves the server and runs whole conversations over
//! the line transport.

use goalpilot::protocol::{InboundMessage, OutboundMessage, SessionServer};
use goalpilot::{Action, ActionKind, Orchestrator, OrchestratorConfig, ScriptedModelClient};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::sync::atomic::Ordering;
use std::sync::Arc;

fn server(replies: &[&str]) -> SessionServer {
    let model = Arc::new(ScriptedModelClient::with_replies(replies.iter().copied()));
    SessionServer::new(Orchestrator::new(OrchestratorConfig::default(), model))
}

async fn converse(server: &SessionServer, lines: &[Value]) -> Vec<Value> {
    let mut input = String::new();
    for line in lines {
        input.push_str(&line.to_string());
        input.push('\n');
    }

    let mut output = Vec::new();
    server
        .serve_lines(input.as_bytes(), &mut output)
        .await
        .unwrap();

    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect()
}

// ============================================================================
// Outbound shapes
// ============================================================================

#[test]
fn test_action_message_shape() {
    let message = OutboundMessage::Action {
        step: 2,
        action: Action::new(ActionKind::Fill)
            .with_selector("#q")
            .with_value("rust"),
    };
    let value: Value = serde_json::from_str(&message.to_json()).unwrap();
    assert_eq!(
        value,
        json!({
            "type": "action",
            "step": 2,
            "action": {"action": "fill", "selector": "#q", "value": "rust"}
        })
    );
}

#[test]
fn test_end_without_reason_omits_field() {
    let value: Value =
        serde_json::from_str(&OutboundMessage::End { reason: None }.to_json()).unwrap();
    assert_eq!(value, json!({"type": "end"}));
}

#[test]
fn test_replan_and_error_shapes() {
    let replan = OutboundMessage::Replan {
        reason: "wrong page".to_string(),
        new_plan_needed: true,
    };
    assert_eq!(
        serde_json::to_value(&replan).unwrap(),
        json!({"type": "replan", "reason": "wrong page", "new_plan_needed": true})
    );

    assert_eq!(
        serde_json::to_value(OutboundMessage::error("boom")).unwrap(),
        json!({"type": "error", "detail": "boom"})
    );
}

#[test]
fn test_login_detected_offers_continue() {
    let value = serde_json::to_value(OutboundMessage::login_detected()).unwrap();
    assert_eq!(value["type"], "login_detected");
    assert_eq!(value["show_continue_button"], true);
    assert!(value["message"].as_str().is_some_and(|m| !m.is_empty()));
    assert!(chrono::DateTime::parse_from_rfc3339(value["timestamp"].as_str().unwrap()).is_ok());
}

#[test]
fn test_inbound_kinds() {
    for (text, kind) in [
        (r#"{"type":"init","message":"x"}"#, "init"),
        (r#"{"type":"dom_with_image","dom":[]}"#, "dom_with_image"),
        (
            r#"{"type":"dom_with_image_evaluation","dom":[]}"#,
            "dom_with_image_evaluation",
        ),
        (r#"{"type":"client_log"}"#, "client_log"),
        (r#"{"type":"user_continue"}"#, "user_continue"),
    ] {
        assert_eq!(InboundMessage::parse(text).unwrap().kind(), kind);
    }
}

// ============================================================================
// Conversations over the line transport
// ============================================================================

#[tokio::test]
async fn test_conversation_to_completion() {
    let server = server(&[
        r##"{"action": "click", "selector": "#r1", "reason": "first result"}"##,
        r#"{"status": "completed", "reason": "article open", "evidence": "h1"}"#,
    ]);
    let dom = json!([
        {"tag": "a", "selector": "#r1", "href": "/r1", "text": "First result"},
        {"tag": "h1", "selector": "h1", "text": "Results"}
    ]);

    let replies = converse(
        &server,
        &[
            json!({"type": "init", "message": "click the first result"}),
            json!({"type": "dom_with_image", "context": {"step": 1}, "dom": dom}),
            json!({"type": "dom_with_image_evaluation", "context": {"step": 1}, "dom": dom}),
        ],
    )
    .await;

    let types: Vec<&str> = replies
        .iter()
        .map(|r| r["type"].as_str().unwrap())
        .collect();
    assert_eq!(
        types,
        vec!["request_dom", "page_analysis", "action", "page_analysis", "completed"]
    );
    assert_eq!(replies[2]["action"]["selector"], "#r1");
    assert_eq!(replies[1]["page_understanding"]["dom_elements"], 2);
    assert_eq!(replies[1]["progress_evaluation"]["total_steps"], 1);
    assert_eq!(replies[4]["evidence"], "h1");

    let metrics = server.orchestrator().metrics();
    assert_eq!(metrics.snapshots_processed.load(Ordering::Relaxed), 2);
    assert_eq!(metrics.active_sessions.load(Ordering::Relaxed), 0);
}

#[tokio::test]
async fn test_each_connection_gets_its_own_session() {
    let server = server(&[]);

    let first = converse(&server, &[json!({"type": "init", "message": "네이버로 이동"})]).await;
    assert_eq!(first[0]["type"], "action");
    assert_eq!(first[0]["action"]["url"], "https://naver.com");

    // A fresh connection has no goal yet
    let second = converse(
        &server,
        &[json!({"type": "dom_with_image", "context": {"step": 1}, "dom": []})],
    )
    .await;
    assert_eq!(second[0]["type"], "error");
    assert_eq!(
        server.orchestrator().metrics().goals_started.load(Ordering::Relaxed),
        1
    );
}

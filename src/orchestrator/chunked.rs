//! Sequential analysis of oversized snapshots
//!
//! Chunks are analysed one at a time, in document order. Each prompt carries
//! the digest of the chunks before it, so chunk `i + 1` is only built once
//! chunk `i` has answered.

use crate::action::{select, Action, ActionCandidate, Plan};
use crate::dom::{chunk, AccumulatedContext, DomElement};
use crate::error::{ExtractionError, ModelError};
use crate::extraction::parse_model_value;
use crate::llm::prompts::chunk_prompt;
use crate::llm::ModelRequest;
use crate::orchestrator::TimedModel;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Reason attached to the `end` emitted when no chunk proposes anything
pub const NO_ACTION_REASON: &str = "No suitable action found in any DOM chunk";

/// Inputs of one chunked analysis
pub struct ChunkJob<'a> {
    /// Goal text
    pub goal: &'a str,
    /// Summarized snapshot
    pub dom: &'a [DomElement],
    /// Screenshot, sent with every chunk
    pub image: Option<&'a [u8]>,
    /// Caller's step counter
    pub step: u32,
    /// Current plan (may be empty)
    pub plan: &'a Plan,
    /// Elements per chunk
    pub chunk_size: usize,
}

/// Run the chunk pipeline and pick one action.
///
/// Per-chunk model or parse failures are logged and skipped, and leave the
/// digest untouched; only chunks whose reply parsed are folded in. If no chunk
/// yields a candidate the result is an `end` action with
/// [`NO_ACTION_REASON`]; if every model call failed, the last model error is
/// returned instead.
#[instrument(skip_all, fields(elements = job.dom.len(), chunk_size = job.chunk_size))]
pub async fn analyze_chunks(model: &TimedModel, job: ChunkJob<'_>) -> Result<Action, ModelError> {
    let chunks = chunk(job.dom, job.chunk_size);
    let total = chunks.len();
    info!("Analysing {} elements in {} chunks", job.dom.len(), total);

    let mut context = AccumulatedContext::new();
    let mut candidates = Vec::new();
    let mut answered = 0usize;
    let mut last_error = None;

    for (index, elements) in chunks.iter().enumerate() {
        let chunk_num = index + 1;
        let summary = context.summary(chunk_num, total);
        let prompt = chunk_prompt(
            job.goal,
            elements,
            chunk_num,
            total,
            job.step,
            job.plan,
            &summary,
        );
        let request = ModelRequest::with_image(prompt, job.image.map(<[u8]>::to_vec));

        let proposal = match model.complete(request).await {
            Ok(text) => {
                answered += 1;
                match parse_proposal(&text, chunk_num) {
                    Ok(proposal) => proposal,
                    Err(e) => {
                        warn!("Chunk {}/{}: unreadable reply: {}", chunk_num, total, e);
                        continue;
                    }
                }
            }
            Err(e) => {
                warn!("Chunk {}/{}: model call failed: {}", chunk_num, total, e);
                last_error = Some(e);
                continue;
            }
        };

        context = context.update(elements, proposal.as_ref());

        if let Some(action) = proposal {
            let candidate = ActionCandidate::new(index, action, elements.len());
            info!(
                "Chunk {}/{}: candidate {} (confidence {:.2})",
                chunk_num, total, candidate.action.kind, candidate.confidence
            );
            candidates.push(candidate);
        }
    }

    if answered == 0 {
        if let Some(e) = last_error {
            return Err(e);
        }
    }

    Ok(select(candidates).unwrap_or_else(|| {
        info!("No chunk produced an actionable candidate");
        Action::end(NO_ACTION_REASON)
    }))
}

/// A chunk's reply as an action, or `None` for "no action here".
///
/// Fails only when the reply holds no JSON value at all; a value that is not
/// a usable action counts as an answer without a proposal.
fn parse_proposal(text: &str, chunk_num: usize) -> Result<Option<Action>, ExtractionError> {
    let value = parse_model_value(text)?;

    match value.get("action").and_then(Value::as_str) {
        None | Some("none") | Some("no_action") => {
            debug!("Chunk {}: no action", chunk_num);
            return Ok(None);
        }
        Some(_) => {}
    }

    match Action::from_value(value) {
        Ok(action) => Ok(Some(action)),
        Err(ExtractionError::UnknownActionKind(kind)) => {
            warn!("Chunk {}: ignoring unknown action kind {}", chunk_num, kind);
            Ok(None)
        }
        Err(e) => {
            warn!("Chunk {}: {}", chunk_num, e);
            Ok(None)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;
    use crate::llm::ScriptedModelClient;
    use crate::metrics::Metrics;
    use std::sync::Arc;
    use std::time::Duration;

    fn elements(n: usize) -> Vec<DomElement> {
        (0..n)
            .map(|i| DomElement::new("div", format!("#e{}", i)))
            .collect()
    }

    fn timed(client: Arc<ScriptedModelClient>) -> TimedModel {
        TimedModel::new(client, Duration::from_secs(5), Arc::new(Metrics::new()))
    }

    #[tokio::test]
    async fn test_later_chunk_wins_when_first_has_nothing() {
        let client = Arc::new(ScriptedModelClient::with_replies([
            r#"{"action":"none","reason":"nothing here"}"#,
            r##"Sure: {"action":"fill","selector":"#q","value":"rust","confidence":0.8}"##,
        ]));
        let dom = elements(1500);
        let plan = Plan::default();
        let action = analyze_chunks(
            &timed(client.clone()),
            ChunkJob {
                goal: "search for rust",
                dom: &dom,
                image: None,
                step: 0,
                plan: &plan,
                chunk_size: 1000,
            },
        )
        .await
        .unwrap();

        assert_eq!(action.kind, ActionKind::Fill);
        assert_eq!(action.selector.as_deref(), Some("#q"));
        assert_eq!(client.call_count(), 2);

        let prompts = client.requests();
        assert!(prompts[0].prompt.contains("chunk 1/2 (1000 elements)"));
        assert!(prompts[1].prompt.contains("chunk 2/2 (500 elements)"));
    }

    #[tokio::test]
    async fn test_nothing_actionable_ends() {
        let client = Arc::new(ScriptedModelClient::with_replies([
            r#"{"action":"none"}"#,
            "I could not find anything",
        ]));
        let dom = elements(20);
        let plan = Plan::default();
        let action = analyze_chunks(
            &timed(client),
            ChunkJob {
                goal: "g",
                dom: &dom,
                image: None,
                step: 0,
                plan: &plan,
                chunk_size: 10,
            },
        )
        .await
        .unwrap();
        assert_eq!(action, Action::end(NO_ACTION_REASON));
    }

    #[tokio::test]
    async fn test_all_calls_failing_is_an_error() {
        let client = Arc::new(ScriptedModelClient::new());
        let dom = elements(3);
        let plan = Plan::default();
        let result = analyze_chunks(
            &timed(client),
            ChunkJob {
                goal: "g",
                dom: &dom,
                image: None,
                step: 0,
                plan: &plan,
                chunk_size: 2,
            },
        )
        .await;
        assert!(matches!(result, Err(ModelError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_failed_chunks_leave_digest_untouched() {
        let client = Arc::new(ScriptedModelClient::new());
        client.push_error(ModelError::Unavailable("reset".to_string()));
        client.push_reply("I am not sure what to do here");
        client.push_reply(r#"{"action":"none"}"#);
        let dom = vec![
            DomElement::new("nav", "#nav"),
            DomElement::new("button", "#b"),
            DomElement::new("header", "#h"),
            DomElement::new("a", "#a"),
            DomElement::new("div", "#d"),
        ];
        let plan = Plan::default();
        let action = analyze_chunks(
            &timed(client.clone()),
            ChunkJob {
                goal: "g",
                dom: &dom,
                image: None,
                step: 0,
                plan: &plan,
                chunk_size: 2,
            },
        )
        .await
        .unwrap();

        assert_eq!(action, Action::end(NO_ACTION_REASON));
        let prompts = client.requests();
        assert_eq!(prompts.len(), 3);
        assert!(prompts[2]
            .prompt
            .contains("2 earlier chunk(s) analysed - nothing notable found"));
        assert!(!prompts[2].prompt.contains("Page structure found"));
    }

    #[tokio::test]
    async fn test_chunk_without_proposal_is_folded() {
        let client = Arc::new(ScriptedModelClient::with_replies([
            r#"{"action":"none"}"#,
            r#"{"action":"none"}"#,
        ]));
        let dom = vec![DomElement::new("nav", "#nav"), DomElement::new("div", "#d")];
        let plan = Plan::default();
        analyze_chunks(
            &timed(client.clone()),
            ChunkJob {
                goal: "g",
                dom: &dom,
                image: None,
                step: 0,
                plan: &plan,
                chunk_size: 1,
            },
        )
        .await
        .unwrap();

        let prompts = client.requests();
        assert!(prompts[1].prompt.contains("Page structure found: nav"));
        assert!(prompts[1].prompt.contains("Navigation structure confirmed"));
    }

    #[test]
    fn test_parse_proposal() {
        assert!(parse_proposal(r#"{"action":"no_action"}"#, 1).unwrap().is_none());
        assert!(parse_proposal(r#"{"action":"teleport"}"#, 1).unwrap().is_none());
        assert!(parse_proposal(r#"{"reason":"x"}"#, 1).unwrap().is_none());
        assert!(parse_proposal("no json here", 1).is_err());
        assert_eq!(
            parse_proposal(r##"{"action":"click","selector":"#a"}"##, 1)
                .unwrap()
                .map(|a| a.kind),
            Some(ActionKind::Click)
        );
    }
}

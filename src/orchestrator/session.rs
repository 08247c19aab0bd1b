//! Per-connection goal session
//!
//! A session processes one inbound message at a time and answers with the
//! outbound messages it produced. Every failure becomes exactly one `error`
//! message; the session itself never stops.

use crate::action::{normalize, Action, Plan};
use crate::dom::{is_login_wall, summarize, DomElement};
use crate::error::{Error, ProtocolError, Result, SessionError};
use crate::extraction::parse_model_value;
use crate::journal::{Journal, JournalEntry, JournalSource, NullJournal};
use crate::llm::prompts::{
    evaluation_prompt, execution_prompt, navigation_prompt, planning_prompt, single_step_prompt,
};
use crate::llm::ModelRequest;
use crate::orchestrator::chunked::{analyze_chunks, ChunkJob};
use crate::orchestrator::evaluation::EvaluationVerdict;
use crate::orchestrator::intent::{self, GoalIntent};
use crate::orchestrator::{OrchestrationState, Orchestrator};
use crate::protocol::{
    now_rfc3339, InboundMessage, OutboundMessage, PageAnalysis, PageUnderstanding,
    ProgressEvaluation, SnapshotPayload,
};
use serde_json::{json, Value};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// State machine for one caller
pub struct GoalSession {
    id: Uuid,
    orchestrator: Orchestrator,
    goal: Option<String>,
    state: OrchestrationState,
    plan: Option<Plan>,
    login_skip_once: bool,
    replan_pending: bool,
    replans: u32,
    journal: Box<dyn Journal>,
}

impl GoalSession {
    pub(crate) fn new(orchestrator: Orchestrator) -> Self {
        Self {
            id: Uuid::new_v4(),
            orchestrator,
            goal: None,
            state: OrchestrationState::AwaitingGoal,
            plan: None,
            login_skip_once: false,
            replan_pending: false,
            replans: 0,
            journal: Box::new(NullJournal),
        }
    }

    /// Session identifier, for logs
    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Current state
    pub fn state(&self) -> OrchestrationState {
        self.state
    }

    /// Current goal
    pub fn goal(&self) -> Option<&str> {
        self.goal.as_deref()
    }

    /// Stored plan
    pub fn plan(&self) -> Option<&Plan> {
        self.plan.as_ref()
    }

    /// Handle one raw text message
    pub async fn handle_text(&mut self, text: &str) -> Vec<OutboundMessage> {
        match InboundMessage::parse(text) {
            Ok(message) => self.handle(message).await,
            Err(e) => {
                warn!(session = %self.id, "Rejected inbound message: {}", e);
                let mut out = Vec::new();
                self.report(Error::from(e), &mut out);
                out
            }
        }
    }

    /// Handle one parsed message
    #[instrument(skip(self, message), fields(session = %self.id, kind = message.kind()))]
    pub async fn handle(&mut self, message: InboundMessage) -> Vec<OutboundMessage> {
        let mut out = Vec::new();
        if let Err(e) = self.dispatch(message, &mut out).await {
            self.report(e, &mut out);
        }
        debug!(
            state = %self.state,
            replies = out.len(),
            "Message handled"
        );
        out
    }

    async fn dispatch(&mut self, message: InboundMessage, out: &mut Vec<OutboundMessage>) -> Result<()> {
        match message {
            InboundMessage::Init { message } => self.on_init(message, out).await,
            InboundMessage::DomWithImage(payload) => {
                let evaluation = payload.evaluation_mode;
                self.on_snapshot(payload, evaluation, out).await
            }
            InboundMessage::DomWithImageEvaluation(payload) => {
                self.on_snapshot(payload, true, out).await
            }
            InboundMessage::ClientLog {
                event_type,
                message,
                extra_data,
            } => {
                self.journal.record(JournalEntry::now(
                    JournalSource::Client,
                    event_type,
                    message,
                    extra_data,
                ));
                Ok(())
            }
            InboundMessage::UserContinue => {
                self.on_continue(out);
                Ok(())
            }
        }
    }

    /// Turn an error into the single `error` reply
    fn report(&mut self, err: Error, out: &mut Vec<OutboundMessage>) {
        let detail = err.to_string();
        self.orchestrator.metrics.record_error(err.kind());
        self.journal.record(JournalEntry::now(
            JournalSource::Server,
            "ERROR",
            detail.clone(),
            json!({ "kind": err.kind(), "state": self.state }),
        ));

        let fatal = match &err {
            Error::Protocol(_) | Error::Session(SessionError::Inactive(_)) => false,
            _ => self.goal.is_some(),
        };
        if fatal {
            error!(session = %self.id, "Goal failed: {}", detail);
            self.state = OrchestrationState::Failed;
            self.journal.close();
        } else {
            warn!(session = %self.id, "{}", detail);
        }

        out.push(OutboundMessage::error(detail));
    }

    fn server_event(&mut self, event_type: &str, message: impl Into<String>, extra: Value) {
        self.journal.record(JournalEntry::now(
            JournalSource::Server,
            event_type,
            message,
            extra,
        ));
    }

    /// Reset per-goal state and open the goal's journal
    fn start_goal(&mut self, goal: &str) {
        self.journal.close();
        self.journal = self.orchestrator.journals.open(goal);
        self.goal = Some(goal.to_string());
        self.plan = None;
        self.replans = 0;
        self.replan_pending = false;
        self.login_skip_once = false;
        self.orchestrator.metrics.record_goal();
        info!(session = %self.id, "New goal: {}", goal);
        self.server_event("GOAL_START", goal, Value::Null);
    }

    async fn on_init(&mut self, goal: Option<String>, out: &mut Vec<OutboundMessage>) -> Result<()> {
        let goal = goal
            .map(|g| g.trim().to_string())
            .filter(|g| !g.is_empty())
            .ok_or(ProtocolError::MissingGoal)?;
        self.start_goal(&goal);

        let intent = intent::classify(&goal);
        self.server_event(
            "DOM_DECISION",
            format!("needs page context: {}", intent.needs_page_context()),
            json!({ "intent": format!("{:?}", intent) }),
        );

        if intent == GoalIntent::Navigate {
            if let Some(url) = self.resolve_destination(&goal).await {
                let action = Action::goto(url);
                self.server_event("ACTION_GENERATED", "direct navigation", json!(action));
                self.orchestrator.metrics.record_action();
                out.push(OutboundMessage::Action { step: 1, action });
                self.finish();
                return Ok(());
            }
            self.server_event("RECLASSIFY_DOM", "no direct destination; page context needed", Value::Null);
        }

        self.state = OrchestrationState::AwaitingPage;
        out.push(OutboundMessage::request_dom(
            "Page information is needed for this goal.",
        ));
        Ok(())
    }

    /// Destination for a navigation-only goal: the site table first, then
    /// the model. `None` means the page must be inspected instead.
    async fn resolve_destination(&mut self, goal: &str) -> Option<String> {
        if let Some(url) = self.orchestrator.sites.lookup(goal) {
            return Some(url);
        }
        if intent::mentions_site(goal) {
            debug!(session = %self.id, "Goal names an unknown site or page");
            return None;
        }

        let command = match self
            .orchestrator
            .model
            .complete(ModelRequest::text(navigation_prompt(goal)))
            .await
        {
            Ok(text) => text.replace('\n', " "),
            Err(e) => {
                warn!(session = %self.id, "Navigation refinement failed: {}", e);
                return None;
            }
        };
        self.server_event("GOAL_REFINED", command.trim(), Value::Null);

        let target = intent::navigation_target(&command);
        if target.is_none() {
            debug!(session = %self.id, "Refined command is not a pure navigation: {}", command.trim());
        }
        target
    }

    fn on_continue(&mut self, out: &mut Vec<OutboundMessage>) {
        out.push(OutboundMessage::automation_resumed());
        if self.goal.is_none() || self.state.is_terminal() {
            debug!(session = %self.id, state = %self.state, "Resume without a live goal");
            return;
        }

        info!(session = %self.id, "User resumed automation");
        self.login_skip_once = true;
        if self.state == OrchestrationState::LoginWait {
            self.state = OrchestrationState::AwaitingPage;
        }
        self.server_event("USER_CONTINUE", "login check skipped for the next snapshot", Value::Null);
        out.push(OutboundMessage::request_dom(
            "Re-analysing the page after login.",
        ));
    }

    async fn on_snapshot(
        &mut self,
        payload: SnapshotPayload,
        evaluation: bool,
        out: &mut Vec<OutboundMessage>,
    ) -> Result<()> {
        if self.state.is_terminal() {
            return Err(SessionError::Inactive(self.state.to_string()).into());
        }

        let goal = if let Some(goal) = self.goal.clone() {
            goal
        } else if let Some(goal) = payload.goal().map(str::to_string) {
            self.start_goal(&goal);
            goal
        } else {
            return Err(ProtocolError::MissingGoal.into());
        };

        let step = payload.step();
        self.adopt_caller_plan(&payload);

        let dom = summarize(&payload.dom);
        let image = payload.decode_image();
        self.orchestrator.metrics.record_snapshot();
        self.server_event(
            "SNAPSHOT",
            format!("{} elements", dom.len()),
            json!({ "step": step, "raw_elements": payload.dom.len(), "image": image.is_some(), "evaluation": evaluation }),
        );

        let is_login_page = is_login_wall(&dom);
        out.push(self.page_analysis(&goal, &dom, step, is_login_page));

        if self.login_skip_once {
            info!(session = %self.id, "Login check skipped once after resume");
            self.login_skip_once = false;
        } else if is_login_page || self.state == OrchestrationState::LoginWait {
            self.state = OrchestrationState::LoginWait;
            self.orchestrator.metrics.record_login_pause();
            self.server_event("LOGIN_DETECTED", "automation paused", Value::Null);
            out.push(OutboundMessage::login_detected());
            return Ok(());
        }

        let needs_plan = self.state == OrchestrationState::Planning
            || self.replan_pending
            || (self.plan.is_none() && step == 0);
        if needs_plan && self.plan_goal(&goal, &dom, step, &payload, image.as_deref(), out).await? {
            return Ok(());
        }

        if evaluation {
            self.state = OrchestrationState::Evaluating;
            self.evaluate(&goal, &dom, step, &payload, image, out).await
        } else {
            self.state = OrchestrationState::Executing;
            self.execute(&goal, &dom, step, image, out).await
        }
    }

    /// Take the caller's plan when the session has none
    fn adopt_caller_plan(&mut self, payload: &SnapshotPayload) {
        if self.plan.is_some() || self.replan_pending || self.state == OrchestrationState::Planning {
            return;
        }
        let Some(raw) = payload.context.plan.clone() else {
            return;
        };
        if raw.is_null() {
            return;
        }
        match Plan::from_value(raw) {
            Ok(plan) if !plan.is_empty() => {
                debug!(session = %self.id, "Using caller plan with {} steps", plan.len());
                self.plan = Some(plan);
            }
            Ok(_) => {}
            Err(e) => warn!(session = %self.id, "Ignoring caller plan: {}", e),
        }
    }

    fn page_analysis(
        &self,
        goal: &str,
        dom: &[DomElement],
        step: u32,
        is_login_page: bool,
    ) -> OutboundMessage {
        let total_steps = self.plan.as_ref().map(Plan::len).filter(|n| *n > 0).unwrap_or(1);
        OutboundMessage::PageAnalysis(PageAnalysis {
            web_guide: intent::web_guide(goal),
            page_understanding: PageUnderstanding {
                dom_elements: dom.len(),
                analysis_method: "llm_delegation".to_string(),
                is_login_page,
            },
            progress_evaluation: ProgressEvaluation {
                progress_percentage: f64::from(step) / total_steps as f64 * 100.0,
                current_step: step,
                total_steps,
            },
            timestamp: now_rfc3339(),
        })
    }

    /// Ask for a plan. Returns `true` when a plan was emitted.
    async fn plan_goal(
        &mut self,
        goal: &str,
        dom: &[DomElement],
        step: u32,
        payload: &SnapshotPayload,
        image: Option<&[u8]>,
        out: &mut Vec<OutboundMessage>,
    ) -> Result<bool> {
        self.state = OrchestrationState::Planning;
        self.replan_pending = false;
        self.server_event("PLANNING_START", format!("planning over {} elements", dom.len()), Value::Null);

        let prompt = planning_prompt(
            goal,
            dom,
            step,
            payload.context.last_action.as_ref(),
            image.is_some(),
        );
        let text = self
            .orchestrator
            .model
            .complete(ModelRequest::with_image(prompt, image.map(<[u8]>::to_vec)))
            .await?;

        match parse_model_value(&text).and_then(Plan::from_value) {
            Ok(plan) if !plan.is_empty() => {
                info!(session = %self.id, "Plan with {} steps", plan.len());
                self.server_event("PLAN_GENERATED", format!("{} steps", plan.len()), json!(plan));
                self.orchestrator.metrics.record_plan();
                self.plan = Some(plan.clone());
                self.state = OrchestrationState::Executing;
                out.push(OutboundMessage::Plan { plan });
                Ok(true)
            }
            Ok(_) => {
                warn!(session = %self.id, "Model returned an empty plan; executing without one");
                self.server_event("PLAN_FAILED", "empty plan", Value::Null);
                self.state = OrchestrationState::Executing;
                Ok(false)
            }
            Err(e) => {
                warn!(session = %self.id, "Planning failed, executing without a plan: {}", e);
                self.server_event("PLAN_FAILED", e.to_string(), Value::Null);
                self.state = OrchestrationState::Executing;
                Ok(false)
            }
        }
    }

    async fn execute(
        &mut self,
        goal: &str,
        dom: &[DomElement],
        step: u32,
        image: Option<Vec<u8>>,
        out: &mut Vec<OutboundMessage>,
    ) -> Result<()> {
        let chunk_size = self.orchestrator.config.chunk_size;
        let empty = Plan::default();
        let plan = self.plan.as_ref().unwrap_or(&empty);

        let action = if dom.len() > self.orchestrator.config.chunk_threshold {
            info!(session = %self.id, "Large DOM ({} elements): chunked analysis", dom.len());
            self.orchestrator.metrics.record_chunked_run();
            analyze_chunks(
                &self.orchestrator.model,
                ChunkJob {
                    goal,
                    dom,
                    image: image.as_deref(),
                    step,
                    plan,
                    chunk_size,
                },
            )
            .await?
        } else {
            let prompt = if plan.is_empty() {
                single_step_prompt(goal, dom, step, image.is_some())
            } else {
                execution_prompt(goal, plan, step, dom, image.is_some())
            };
            let text = self
                .orchestrator
                .model
                .complete(ModelRequest::with_image(prompt, image))
                .await?;
            Action::from_value(parse_model_value(&text)?)?
        };

        self.emit_action(step, normalize(action), out);
        Ok(())
    }

    async fn evaluate(
        &mut self,
        goal: &str,
        dom: &[DomElement],
        step: u32,
        payload: &SnapshotPayload,
        image: Option<Vec<u8>>,
        out: &mut Vec<OutboundMessage>,
    ) -> Result<()> {
        let prompt = evaluation_prompt(
            goal,
            dom,
            step,
            payload.context.last_action.as_ref(),
            image.is_some(),
        );
        let text = self
            .orchestrator
            .model
            .complete(ModelRequest::with_image(prompt, image))
            .await?;

        match EvaluationVerdict::from_value(parse_model_value(&text)?)? {
            EvaluationVerdict::Completed { reason, evidence } => {
                info!(session = %self.id, "Goal completed: {}", reason);
                self.server_event("GOAL_COMPLETED", reason.clone(), json!({ "evidence": evidence }));
                out.push(OutboundMessage::Completed { reason, evidence });
                self.finish();
            }
            EvaluationVerdict::Replan { reason } => {
                let max = self.orchestrator.config.max_replans;
                if self.replans >= max {
                    return Err(SessionError::ReplanLimit(max).into());
                }
                self.replans += 1;
                info!(session = %self.id, replans = self.replans, "Replanning: {}", reason);
                self.server_event("REPLAN", reason.clone(), json!({ "replans": self.replans }));
                self.plan = None;
                self.replan_pending = true;
                self.state = OrchestrationState::Planning;
                out.push(OutboundMessage::Replan {
                    reason,
                    new_plan_needed: true,
                });
            }
            EvaluationVerdict::Continue(action) => self.emit_action(step, normalize(action), out),
        }
        Ok(())
    }

    fn emit_action(&mut self, step: u32, action: Action, out: &mut Vec<OutboundMessage>) {
        if action.is_end() {
            info!(session = %self.id, "Goal ended: {}", action.reason.as_deref().unwrap_or("-"));
            self.server_event("END", action.reason.clone().unwrap_or_default(), Value::Null);
            out.push(OutboundMessage::End {
                reason: action.reason,
            });
            self.finish();
            return;
        }

        info!(session = %self.id, step, action = %action.kind, "Action decided");
        self.server_event("ACTION_GENERATED", action.kind.as_str(), json!(action));
        self.orchestrator.metrics.record_action();
        out.push(OutboundMessage::Action { step, action });
    }

    fn finish(&mut self) {
        self.state = OrchestrationState::Completed;
        self.journal.close();
    }
}

impl Drop for GoalSession {
    fn drop(&mut self) {
        self.journal.close();
    }
}

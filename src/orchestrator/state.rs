//! Session lifecycle states

use serde::Serialize;
use std::fmt;

/// Where a goal session is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OrchestrationState {
    /// No goal yet
    #[default]
    AwaitingGoal,
    /// Goal accepted, waiting for a page snapshot
    AwaitingPage,
    /// The next snapshot will be used to build a plan
    Planning,
    /// Producing one action per snapshot
    Executing,
    /// Judging progress per snapshot
    Evaluating,
    /// Paused on a login wall until the user resumes
    LoginWait,
    /// Goal finished
    Completed,
    /// Goal abandoned after an unrecoverable error
    Failed,
}

impl OrchestrationState {
    /// Wire name of the state
    pub fn as_str(&self) -> &'static str {
        match self {
            OrchestrationState::AwaitingGoal => "awaiting_goal",
            OrchestrationState::AwaitingPage => "awaiting_page",
            OrchestrationState::Planning => "planning",
            OrchestrationState::Executing => "executing",
            OrchestrationState::Evaluating => "evaluating",
            OrchestrationState::LoginWait => "login_wait",
            OrchestrationState::Completed => "completed",
            OrchestrationState::Failed => "failed",
        }
    }

    /// Completed or Failed: only a new `init` moves on from here
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrchestrationState::Completed | OrchestrationState::Failed
        )
    }
}

impl fmt::Display for OrchestrationState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

//! Browser actions and plans
//!
//! Actions are what the orchestrator hands back to the caller, one per page
//! snapshot. Plans are the anticipated step sequence produced once per goal.

mod normalize;
mod select;
mod types;

pub use normalize::{google_search_url, normalize};
pub use select::{select, ActionCandidate, DEFAULT_CONFIDENCE};
pub use types::{Action, ActionKind, Plan, PlanStep};

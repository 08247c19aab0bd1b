//! Action normalization

use crate::action::{Action, ActionKind};
use tracing::debug;

const GOOGLE_SEARCH_BASE: &str = "https://www.google.com/search?q=";

/// Google search URL for `query`, percent-encoded
pub fn google_search_url(query: &str) -> String {
    format!("{}{}", GOOGLE_SEARCH_BASE, urlencoding::encode(query))
}

/// Strip fields that do not belong to the action's kind.
///
/// - `click` and `hover` never carry a `value`.
/// - `extract`/`attribute` are dropped, no emitted kind reads them.
/// - A `google_search` with a `query` but no resolved `url` becomes a `goto`
///   to the search results page.
pub fn normalize(mut action: Action) -> Action {
    if matches!(action.kind, ActionKind::Click | ActionKind::Hover) {
        action.value = None;
    }

    action.extract = None;
    action.attribute = None;

    if action.kind == ActionKind::GoogleSearch && action.url.is_none() {
        if let Some(query) = action.query.take() {
            debug!("Converting google_search '{}' to goto", query);
            action.url = Some(google_search_url(&query));
            action.kind = ActionKind::Goto;
        }
    }

    action
}

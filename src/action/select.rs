//! Choosing one action among per-chunk proposals

use crate::action::Action;
use serde::Serialize;
use std::cmp::Ordering;
use tracing::info;

/// Confidence assumed when the model does not report one
pub const DEFAULT_CONFIDENCE: f64 = 0.5;

/// An action proposed by the analysis of one chunk.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ActionCandidate {
    /// Zero-based index of the chunk that proposed the action
    pub chunk_index: usize,
    /// The proposed action
    pub action: Action,
    /// Number of elements in that chunk
    pub elements_count: usize,
    /// Confidence in `[0, 1]`
    pub confidence: f64,
    /// Whether earlier chunks' context was in the prompt
    pub context_aware: bool,
}

impl ActionCandidate {
    /// Wrap a chunk's action, taking its confidence or the default
    pub fn new(chunk_index: usize, action: Action, elements_count: usize) -> Self {
        let confidence = action
            .confidence
            .filter(|c| c.is_finite())
            .unwrap_or(DEFAULT_CONFIDENCE)
            .clamp(0.0, 1.0);

        Self {
            chunk_index,
            action,
            elements_count,
            confidence,
            context_aware: true,
        }
    }
}

/// Pick the best candidate's action.
///
/// A single candidate is returned as is. Otherwise candidates are ordered by
/// confidence, highest first, with a stable sort so the earliest chunk wins
/// ties. Returns `None` only for an empty list.
pub fn select(mut candidates: Vec<ActionCandidate>) -> Option<Action> {
    if candidates.len() <= 1 {
        return candidates.pop().map(|c| c.action);
    }

    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });

    for (rank, candidate) in candidates.iter().enumerate() {
        info!(
            rank = rank + 1,
            chunk = candidate.chunk_index + 1,
            action = %candidate.action.kind,
            confidence = candidate.confidence,
            reason = candidate.action.reason.as_deref().unwrap_or("-"),
            "Action candidate"
        );
    }

    candidates.into_iter().next().map(|c| c.action)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::ActionKind;

    fn candidate(chunk: usize, confidence: Option<f64>) -> ActionCandidate {
        let mut action = Action::new(ActionKind::Click).with_selector(format!("#c{chunk}"));
        action.confidence = confidence;
        ActionCandidate::new(chunk, action, 10)
    }

    #[test]
    fn test_single_candidate_unchanged() {
        let only = candidate(3, Some(0.1));
        let expected = only.action.clone();
        assert_eq!(select(vec![only]), Some(expected));
    }

    #[test]
    fn test_earliest_maximum_wins_ties() {
        let picked = select(vec![
            candidate(0, Some(0.5)),
            candidate(1, Some(0.9)),
            candidate(2, Some(0.9)),
        ])
        .unwrap();
        assert_eq!(picked.selector.as_deref(), Some("#c1"));
    }

    #[test]
    fn test_missing_confidence_defaults() {
        let c = candidate(0, None);
        assert_eq!(c.confidence, DEFAULT_CONFIDENCE);

        let picked = select(vec![candidate(0, None), candidate(1, Some(0.4))]).unwrap();
        assert_eq!(picked.selector.as_deref(), Some("#c0"));
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(candidate(0, Some(7.0)).confidence, 1.0);
        assert_eq!(candidate(0, Some(-1.0)).confidence, 0.0);
        assert_eq!(candidate(0, Some(f64::NAN)).confidence, DEFAULT_CONFIDENCE);
    }

    #[test]
    fn test_empty_list() {
        assert_eq!(select(Vec::new()), None);
    }
}

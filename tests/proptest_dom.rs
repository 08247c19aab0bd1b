//! Property-based tests for snapshot handling and model-output recovery.

use goalpilot::action::{select, ActionCandidate};
use goalpilot::dom::{chunk, is_login_wall, summarize, DomElement};
use goalpilot::extraction::{extract_top_level_json, parse_model_value};
use goalpilot::{Action, ActionKind};
use proptest::prelude::*;
use serde_json::{json, Map, Value};

// ============================================================================
// STRATEGIES
// ============================================================================

/// Strategy for raw captured elements, some without a usable selector
pub fn arb_raw_element() -> impl Strategy<Value = Value> {
    prop_oneof![
        4 => ("[a-z]{1,6}", "#[a-z0-9]{1,8}", "[a-zA-Z ]{0,20}").prop_map(|(tag, selector, text)| {
            json!({"tag": tag, "selector": selector, "text": text})
        }),
        1 => "[a-z]{1,6}".prop_map(|tag| json!({"tag": tag, "text": "no selector"})),
        1 => Just(json!({"tag": "div", "selector": ""})),
        1 => Just(Value::Null),
    ]
}

/// Strategy for flat JSON objects whose strings never contain brackets
pub fn arb_flat_object() -> impl Strategy<Value = Value> {
    prop::collection::btree_map(
        "[a-z]{1,8}",
        prop_oneof![
            "[a-zA-Z0-9 ]{0,16}".prop_map(Value::String),
            any::<i32>().prop_map(|n| json!(n)),
            any::<bool>().prop_map(Value::Bool),
        ],
        0..6,
    )
    .prop_map(|map| Value::Object(map.into_iter().collect::<Map<String, Value>>()))
}

/// Strategy for prose that never opens a JSON span
pub fn arb_prose() -> impl Strategy<Value = String> {
    "[a-zA-Z ,.:]{0,40}"
}

// ============================================================================
// CHUNKING
// ============================================================================

proptest! {
    #[test]
    fn chunks_partition_input(items in prop::collection::vec(any::<u16>(), 0..500), size in 1usize..64) {
        let chunks = chunk(&items, size);

        let rejoined: Vec<u16> = chunks.iter().flat_map(|c| c.iter().copied()).collect();
        prop_assert_eq!(&rejoined, &items);
        prop_assert_eq!(chunks.len(), items.len().div_ceil(size));
        prop_assert!(chunks.iter().all(|c| !c.is_empty() && c.len() <= size));
    }
}

// ============================================================================
// SUMMARIZATION
// ============================================================================

proptest! {
    #[test]
    fn summary_keeps_selected_elements_in_order(raw in prop::collection::vec(arb_raw_element(), 0..60)) {
        let summary = summarize(&raw);

        let expected: Vec<String> = raw
            .iter()
            .filter_map(|v| v.get("selector").and_then(Value::as_str))
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        let selectors: Vec<String> = summary.iter().map(|e| e.selector.clone()).collect();
        prop_assert_eq!(selectors, expected);
    }

    #[test]
    fn signed_in_pages_are_never_login_walls(extra in prop::collection::vec(arb_raw_element(), 0..20)) {
        let mut elements = summarize(&extra);
        elements.push(DomElement::new("input", "#pw").with_type("password"));
        elements.push(DomElement::new("form", "#login").with_class("login-form").with_text("Sign in"));
        elements.push(DomElement::new("a", "#out").with_text("로그아웃"));

        prop_assert!(!is_login_wall(&elements));
    }
}

// ============================================================================
// JSON RECOVERY
// ============================================================================

proptest! {
    #[test]
    fn object_survives_surrounding_prose(
        object in arb_flat_object(),
        before in arb_prose(),
        after in arb_prose(),
    ) {
        let text = format!("{}{}{}", before, object, after);

        let span = extract_top_level_json(&text);
        prop_assert!(span.is_some());
        prop_assert_eq!(parse_model_value(&text).unwrap(), object);
    }

    #[test]
    fn prose_alone_has_no_json(text in arb_prose()) {
        prop_assert!(extract_top_level_json(&text).is_none());
        prop_assert!(parse_model_value(&text).is_err());
    }
}

// ============================================================================
// CANDIDATE SELECTION
// ============================================================================

proptest! {
    #[test]
    fn selection_picks_highest_confidence(confidences in prop::collection::vec(0.0f64..=1.0, 1..12)) {
        let candidates: Vec<ActionCandidate> = confidences
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let action = Action::new(ActionKind::Click)
                    .with_selector(format!("#c{}", i))
                    .with_confidence(*c);
                ActionCandidate::new(i, action, 10)
            })
            .collect();

        let picked = select(candidates).unwrap();
        let max = confidences.iter().copied().fold(f64::MIN, f64::max);
        let first_max = confidences.iter().position(|c| *c == max).unwrap();

        prop_assert_eq!(picked.confidence, Some(max));
        prop_assert_eq!(picked.selector, Some(format!("#c{}", first_max)));
    }
}

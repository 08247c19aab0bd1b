//! Balanced-bracket JSON recovery
//!
//! The scan here is deliberately lexical: it counts one bracket pair and
//! never tokenizes strings, so it tolerates any commentary around the
//! payload. The recovered span is then parsed strictly, and a failure there
//! is reported separately from "nothing found".

use crate::error::ExtractionError;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;

/// Return the first top-level balanced JSON span in `text`.
///
/// If the trimmed text starts with `[` the span is the array opened there.
/// Otherwise it is the first `{ ... }` object found anywhere in the text.
/// Returns `None` when no opening bracket exists or the depth never returns
/// to zero (truncated output).
pub fn extract_top_level_json(text: &str) -> Option<&str> {
    let trimmed = text.trim();

    if trimmed.starts_with('[') {
        return balanced_span(trimmed, 0, b'[', b']');
    }

    let start = trimmed.find('{')?;
    balanced_span(trimmed, start, b'{', b'}')
}

/// Scan from `start` (which holds `open`) until depth returns to zero.
fn balanced_span(s: &str, start: usize, open: u8, close: u8) -> Option<&str> {
    let mut depth: usize = 0;
    for (offset, byte) in s.as_bytes()[start..].iter().enumerate() {
        if *byte == open {
            depth += 1;
        } else if *byte == close {
            depth -= 1;
            if depth == 0 {
                let end = start + offset + 1;
                return Some(&s[start..end]);
            }
        }
    }
    None
}

/// Extract the JSON span from model text and parse it as a `serde_json::Value`.
pub fn parse_model_value(text: &str) -> Result<Value, ExtractionError> {
    parse_model_json(text)
}

/// Extract the JSON span from model text and parse it strictly into `T`.
pub fn parse_model_json<T: DeserializeOwned>(text: &str) -> Result<T, ExtractionError> {
    let span = extract_top_level_json(text).ok_or_else(|| ExtractionError::NoJsonFound {
        raw: text.to_string(),
    })?;
    debug!("Extracted JSON span ({} chars)", span.len());

    serde_json::from_str(span).map_err(|e| ExtractionError::MalformedJson {
        raw: span.to_string(),
        reason: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_object_surrounded_by_noise() {
        let text = r#"noise {"a":[1,2]} more noise"#;
        assert_eq!(extract_top_level_json(text), Some(r#"{"a":[1,2]}"#));
    }

    #[test]
    fn test_array_with_nested_arrays() {
        let text = r#"  [[1, [2, 3]], {"b": [4]}] trailing"#;
        assert_eq!(
            extract_top_level_json(text),
            Some(r#"[[1, [2, 3]], {"b": [4]}]"#)
        );
    }

    #[test]
    fn test_unmatched_brace_is_not_found() {
        assert_eq!(extract_top_level_json(r#"here {"a": {"b": 1}"#), None);
    }

    #[test]
    fn test_no_bracket_is_not_found() {
        assert_eq!(extract_top_level_json("no json at all"), None);
        assert_eq!(extract_top_level_json(""), None);
    }

    #[test]
    fn test_prose_then_array_prefers_object() {
        // The array preference only applies when the text itself opens with `[`.
        let text = r#"Plan: [{"step":1}]"#;
        assert_eq!(extract_top_level_json(text), Some(r#"{"step":1}"#));
    }

    #[test]
    fn test_markdown_fence() {
        let text = "```json\n{\"action\":\"click\",\"selector\":\"#go\"}\n```";
        assert_eq!(
            extract_top_level_json(text),
            Some(r##"{"action":"click","selector":"#go"}"##)
        );
    }

    #[test]
    fn test_first_object_wins() {
        let text = r#"{"first":1} and {"second":2}"#;
        assert_eq!(extract_top_level_json(text), Some(r#"{"first":1}"#));
    }

    #[test]
    fn test_multibyte_text_around_payload() {
        let text = "다음 액션: {\"action\":\"end\"} 완료";
        assert_eq!(extract_top_level_json(text), Some(r#"{"action":"end"}"#));
    }

    #[test]
    fn test_parse_model_value() {
        let value = parse_model_value(r#"Sure! {"status":"completed"}"#).unwrap();
        assert_eq!(value, json!({"status": "completed"}));
    }

    #[test]
    fn test_parse_reports_no_json() {
        let err = parse_model_value("I could not decide").unwrap_err();
        assert!(matches!(err, ExtractionError::NoJsonFound { .. }));
    }

    #[test]
    fn test_parse_reports_malformed_json() {
        let err = parse_model_value("{action: click}").unwrap_err();
        match err {
            ExtractionError::MalformedJson { raw, .. } => assert_eq!(raw, "{action: click}"),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}

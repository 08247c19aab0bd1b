//! Compact element representation and the snapshot summarizer

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// A single page element reduced to the attributes useful for targeting it.
///
/// Optional attributes are only present when the captured value was
/// non-empty, and absent fields are omitted from the serialized form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomElement {
    /// Lowercase tag name as captured
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub tag: String,
    /// CSS selector that addresses this element
    pub selector: String,
    /// `id` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// `name` attribute
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Input `type` attribute
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub input_type: Option<String>,
    /// `class` attribute
    #[serde(rename = "class", default, skip_serializing_if = "Option::is_none")]
    pub class_name: Option<String>,
    /// Link target
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    /// Current form value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    /// Visible text
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

impl DomElement {
    /// Create an element with only a tag and selector
    pub fn new(tag: impl Into<String>, selector: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            selector: selector.into(),
            ..Default::default()
        }
    }

    /// Set the visible text
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set the class attribute
    pub fn with_class(mut self, class_name: impl Into<String>) -> Self {
        self.class_name = Some(class_name.into());
        self
    }

    /// Set the id attribute
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Set the input type attribute
    pub fn with_type(mut self, input_type: impl Into<String>) -> Self {
        self.input_type = Some(input_type.into());
        self
    }

    /// Lowercased tag
    pub fn tag_lower(&self) -> String {
        self.tag.to_lowercase()
    }

    /// Lowercased class attribute, empty when absent
    pub fn class_lower(&self) -> String {
        self.class_name.as_deref().unwrap_or_default().to_lowercase()
    }

    /// Lowercased id attribute, empty when absent
    pub fn id_lower(&self) -> String {
        self.id.as_deref().unwrap_or_default().to_lowercase()
    }

    /// Lowercased visible text, empty when absent
    pub fn text_lower(&self) -> String {
        self.text.as_deref().unwrap_or_default().to_lowercase()
    }
}

/// Reduce a raw captured element list to [`DomElement`]s.
///
/// Order is preserved, nothing is deduplicated, and entries without a usable
/// selector (including entries that are not objects at all) are dropped.
pub fn summarize(raw: &[Value]) -> Vec<DomElement> {
    let summary: Vec<DomElement> = raw.iter().filter_map(summarize_one).collect();

    debug!(
        "DOM summarized: {} raw elements -> {} retained",
        raw.len(),
        summary.len()
    );

    summary
}

fn summarize_one(raw: &Value) -> Option<DomElement> {
    let obj = raw.as_object()?;
    let selector = attribute(obj, "selector")?;

    Some(DomElement {
        tag: attribute(obj, "tag").unwrap_or_default(),
        selector,
        id: attribute(obj, "id"),
        name: attribute(obj, "name"),
        input_type: attribute(obj, "type"),
        class_name: attribute(obj, "class"),
        href: attribute(obj, "href"),
        value: attribute(obj, "value"),
        text: attribute(obj, "text"),
    })
}

/// Read a whitelisted attribute, keeping only non-empty scalar values.
fn attribute(obj: &serde_json::Map<String, Value>, key: &str) -> Option<String> {
    match obj.get(key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_drops_elements_without_selector() {
        let raw = vec![
            json!({"tag": "div", "text": "no selector"}),
            json!({"tag": "a", "selector": "#home", "href": "/"}),
            json!({"tag": "span", "selector": ""}),
        ];
        let summary = summarize(&raw);
        assert_eq!(summary.len(), 1);
        assert_eq!(summary[0].selector, "#home");
        assert_eq!(summary[0].href.as_deref(), Some("/"));
    }

    #[test]
    fn test_keeps_only_whitelisted_non_empty_attributes() {
        let raw = vec![json!({
            "tag": "input",
            "selector": "input[name='q']",
            "name": "q",
            "type": "search",
            "class": "",
            "placeholder": "Search",
            "style": "display:block",
            "value": null
        })];
        let summary = summarize(&raw);
        let serialized = serde_json::to_value(&summary[0]).unwrap();
        assert_eq!(
            serialized,
            json!({"tag": "input", "selector": "input[name='q']", "name": "q", "type": "search"})
        );
    }

    #[test]
    fn test_preserves_order_and_duplicates() {
        let raw = vec![
            json!({"tag": "a", "selector": "a.one"}),
            json!({"tag": "a", "selector": "a.one"}),
            json!({"tag": "b", "selector": "b"}),
        ];
        let selectors: Vec<_> = summarize(&raw).into_iter().map(|e| e.selector).collect();
        assert_eq!(selectors, vec!["a.one", "a.one", "b"]);
    }

    #[test]
    fn test_tolerates_garbage_entries() {
        let raw = vec![json!(42), json!("text"), json!(null), json!([1, 2])];
        assert!(summarize(&raw).is_empty());
    }

    #[test]
    fn test_empty_input() {
        assert!(summarize(&[]).is_empty());
    }
}

//! Cross-chunk context accumulation
//!
//! When an oversized snapshot is analysed chunk by chunk, each chunk's prompt
//! carries a digest of what earlier chunks contained. The digest is a plain
//! value threaded through the loop: `update` consumes it and returns the
//! grown version.

use crate::action::Action;
use crate::dom::DomElement;
use serde::Serialize;
use std::collections::BTreeSet;

const STRUCTURAL_TAGS: &[&str] = &["nav", "header", "main", "section", "aside", "footer"];
const INTERACTIVE_TAGS: &[&str] = &["button", "input", "a", "select", "textarea"];
const MAIL_KEYWORDS: &[&str] = &["mail", "inbox", "메일", "받은편지함"];
const CONTENT_CLASS_KEYWORDS: &[&str] = &["content", "main", "list"];

/// Zone label for mail-like text
pub const MAIL_AREA: &str = "mail area";
/// Zone label for content/list containers
pub const CONTENT_AREA: &str = "content area";
/// Zone label for forms
pub const FORM_AREA: &str = "form area";

/// Running digest of one chunked analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct AccumulatedContext {
    /// Structural tags and landmark tokens seen so far
    pub page_structure: BTreeSet<String>,
    /// Semantic zone labels seen so far
    pub key_areas: BTreeSet<String>,
    /// Interactive tag kinds seen so far
    pub interactive_elements: BTreeSet<String>,
    /// Whether any element looked like navigation
    pub navigation_found: bool,
    /// First detected main content marker, never overwritten
    pub main_content_area: Option<String>,
    /// Number of chunks that produced an actionable candidate
    pub candidate_count: usize,
}

impl AccumulatedContext {
    /// Fresh digest for a new snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one chunk (and the candidate it produced, if any) into the digest.
    pub fn update(mut self, chunk: &[DomElement], candidate: Option<&Action>) -> Self {
        for element in chunk {
            let tag = element.tag_lower();
            let class_name = element.class_lower();

            if STRUCTURAL_TAGS.contains(&tag.as_str()) {
                self.page_structure.insert(tag.clone());
            } else if class_name.contains("nav") {
                self.page_structure.insert("navigation".to_string());
            } else if class_name.contains("menu") {
                self.page_structure.insert("menu".to_string());
            }

            let text = element.text_lower();
            if MAIL_KEYWORDS.iter().any(|k| text.contains(k)) {
                self.key_areas.insert(MAIL_AREA.to_string());
            } else if CONTENT_CLASS_KEYWORDS.iter().any(|k| class_name.contains(k)) {
                self.key_areas.insert(CONTENT_AREA.to_string());
            } else if tag == "form" {
                self.key_areas.insert(FORM_AREA.to_string());
            }

            if INTERACTIVE_TAGS.contains(&tag.as_str()) {
                self.interactive_elements.insert(tag.clone());
            }

            if tag.contains("nav") || class_name.contains("nav") {
                self.navigation_found = true;
            }

            if self.main_content_area.is_none() {
                if tag == "main" {
                    self.main_content_area = Some("main".to_string());
                } else if class_name.contains("content") {
                    self.main_content_area = Some("content".to_string());
                }
            }
        }

        if candidate.is_some() {
            self.candidate_count += 1;
        }

        self
    }

    /// Prompt-ready summary of earlier chunks, for chunk `chunk_num` (1-based).
    pub fn summary(&self, chunk_num: usize, total_chunks: usize) -> String {
        if chunk_num <= 1 {
            return format!(
                "Context: first chunk of {} - start mapping the page structure.",
                total_chunks
            );
        }

        let mut parts = Vec::new();
        if !self.page_structure.is_empty() {
            parts.push(format!("Page structure found: {}", join(&self.page_structure)));
        }
        if !self.key_areas.is_empty() {
            parts.push(format!("Key areas: {}", join(&self.key_areas)));
        }
        if !self.interactive_elements.is_empty() {
            parts.push(format!(
                "Interactive elements seen: {}",
                join(&self.interactive_elements)
            ));
        }
        if self.navigation_found {
            parts.push("Navigation structure confirmed".to_string());
        }
        if let Some(area) = &self.main_content_area {
            parts.push(format!("Main content area: {}", area));
        }
        if self.candidate_count > 0 {
            parts.push(format!(
                "Earlier action candidates: {}",
                self.candidate_count
            ));
        }

        if parts.is_empty() {
            return format!(
                "Context: {} earlier chunk(s) analysed - nothing notable found.",
                chunk_num - 1
            );
        }

        let mut summary = String::from("Findings from earlier chunks:\n");
        for part in parts {
            summary.push_str("   - ");
            summary.push_str(&part);
            summary.push('\n');
        }
        summary
    }
}

fn join(set: &BTreeSet<String>) -> String {
    set.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
}

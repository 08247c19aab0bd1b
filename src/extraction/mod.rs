//! Recovery of structured payloads from model output
//!
//! Model responses are free text that usually, but not always, wraps a JSON
//! payload in prose or markdown. This module isolates the payload with a
//! lexical scan and only then hands it to the strict `serde_json` parser.

mod json;

pub use json::{extract_top_level_json, parse_model_json, parse_model_value};

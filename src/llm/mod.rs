//! Hosted language-model collaborator
//!
//! The orchestrator only needs one capability from a model: turn a prompt,
//! optionally with a screenshot, into free text. [`ModelClient`] is that seam.

mod openai;
pub mod prompts;
mod scripted;

pub use openai::ChatCompletionsClient;
pub use scripted::ScriptedModelClient;

use crate::error::ModelError;
use async_trait::async_trait;
use std::sync::Arc;

/// One model round-trip request
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ModelRequest {
    /// Prompt text
    pub prompt: String,
    /// PNG screenshot bytes, when available
    pub image: Option<Vec<u8>>,
}

impl ModelRequest {
    /// Text-only request
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            image: None,
        }
    }

    /// Request with an optional screenshot attached
    pub fn with_image(prompt: impl Into<String>, image: Option<Vec<u8>>) -> Self {
        Self {
            prompt: prompt.into(),
            image,
        }
    }
}

/// A model that maps a prompt (and optional image) to free-form text
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Complete one request. Output format is not guaranteed.
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError>;
}

#[async_trait]
impl ModelClient for Arc<dyn ModelClient> {
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        (**self).complete(request).await
    }
}

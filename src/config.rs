//! Runtime configuration
//!
//! [`OrchestratorConfig`] tunes the orchestration loop, [`ModelConfig`]
//! describes the hosted chat-completions endpoint and is normally read from
//! the environment.

use crate::dom::DEFAULT_CHUNK_SIZE;
use crate::error::ModelError;
use std::path::PathBuf;
use std::time::Duration;

/// Snapshots with more summarized elements than this use chunked analysis
pub const DEFAULT_CHUNK_THRESHOLD: usize = 1000;

/// Default per-call model timeout
pub const DEFAULT_MODEL_TIMEOUT_MS: u64 = 60_000;

/// Default number of replans allowed per goal
pub const DEFAULT_MAX_REPLANS: u32 = 3;

/// Configuration for the goal orchestrator
#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    /// Elements per chunk (default: 1000)
    pub chunk_size: usize,
    /// Element count above which chunking is used (default: 1000)
    pub chunk_threshold: usize,
    /// Timeout for each model round-trip in milliseconds (default: 60000)
    pub model_timeout_ms: u64,
    /// Replans allowed per goal before giving up (default: 3)
    pub max_replans: u32,
    /// Directory for goal journals (None = journaling disabled)
    pub journal_dir: Option<PathBuf>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            chunk_threshold: DEFAULT_CHUNK_THRESHOLD,
            model_timeout_ms: DEFAULT_MODEL_TIMEOUT_MS,
            max_replans: DEFAULT_MAX_REPLANS,
            journal_dir: None,
        }
    }
}

impl OrchestratorConfig {
    /// Create a new config builder
    pub fn builder() -> OrchestratorConfigBuilder {
        OrchestratorConfigBuilder::default()
    }

    /// Model timeout as a `Duration`
    pub fn model_timeout(&self) -> Duration {
        Duration::from_millis(self.model_timeout_ms)
    }
}

/// Builder for OrchestratorConfig
#[derive(Default)]
pub struct OrchestratorConfigBuilder {
    config: OrchestratorConfig,
}

impl OrchestratorConfigBuilder {
    /// Set the chunk size (values below 1 become 1)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size.max(1);
        self
    }

    /// Set the chunking threshold
    pub fn chunk_threshold(mut self, threshold: usize) -> Self {
        self.config.chunk_threshold = threshold;
        self
    }

    /// Set the model timeout
    pub fn model_timeout_ms(mut self, ms: u64) -> Self {
        self.config.model_timeout_ms = ms;
        self
    }

    /// Set the replan limit
    pub fn max_replans(mut self, max: u32) -> Self {
        self.config.max_replans = max;
        self
    }

    /// Enable goal journals under `dir`
    pub fn journal_dir<P: Into<PathBuf>>(mut self, dir: P) -> Self {
        self.config.journal_dir = Some(dir.into());
        self
    }

    /// Build the config
    pub fn build(self) -> OrchestratorConfig {
        self.config
    }
}

/// How requests are authenticated and addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelProvider {
    /// Azure OpenAI deployments (`api-key` header, deployment in path)
    Azure {
        /// Resource endpoint, e.g. `https://name.openai.azure.com`
        endpoint: String,
        /// API version query parameter
        api_version: String,
    },
    /// OpenAI-compatible endpoint (bearer token, model in body)
    OpenAi {
        /// Full chat completions URL
        url: String,
    },
}

/// Configuration for the hosted language model
#[derive(Debug, Clone)]
pub struct ModelConfig {
    /// Endpoint flavour
    pub provider: ModelProvider,
    /// API key
    pub api_key: String,
    /// Deployment or model for text-only prompts
    pub deployment: String,
    /// Deployment or model for prompts with a screenshot
    pub vision_deployment: String,
    /// Completion token cap (default: 500)
    pub max_tokens: u32,
    /// Sampling temperature (default: 0.1)
    pub temperature: f32,
}

const DEFAULT_DEPLOYMENT: &str = "gpt-4.1-mini";
const DEFAULT_API_VERSION: &str = "2024-02-15-preview";
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

impl ModelConfig {
    /// Read the model configuration from the environment.
    ///
    /// Azure settings (`AZURE_OPENAI_ENDPOINT`, `AZURE_OPENAI_API_KEY`) take
    /// precedence; otherwise `OPENAI_API_KEY` selects an OpenAI-compatible
    /// endpoint (`OPENAI_BASE_URL` overrides the URL).
    pub fn from_env() -> Result<Self, ModelError> {
        let var = |name: &str| std::env::var(name).ok().filter(|v| !v.trim().is_empty());

        let deployment =
            var("AZURE_OPENAI_DEPLOYMENT_NAME").unwrap_or_else(|| DEFAULT_DEPLOYMENT.to_string());
        let vision_deployment =
            var("AZURE_OPENAI_VISION_DEPLOYMENT_NAME").unwrap_or_else(|| deployment.clone());

        let (provider, api_key) = match (var("AZURE_OPENAI_ENDPOINT"), var("AZURE_OPENAI_API_KEY"))
        {
            (Some(endpoint), Some(key)) => (
                ModelProvider::Azure {
                    endpoint: endpoint.trim_end_matches('/').to_string(),
                    api_version: var("AZURE_OPENAI_API_VERSION")
                        .unwrap_or_else(|| DEFAULT_API_VERSION.to_string()),
                },
                key,
            ),
            _ => {
                let key = var("OPENAI_API_KEY").ok_or_else(|| {
                    ModelError::Config(
                        "set AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY, or OPENAI_API_KEY"
                            .to_string(),
                    )
                })?;
                (
                    ModelProvider::OpenAi {
                        url: var("OPENAI_BASE_URL")
                            .unwrap_or_else(|| OPENAI_CHAT_URL.to_string()),
                    },
                    key,
                )
            }
        };

        Ok(Self {
            provider,
            api_key,
            deployment,
            vision_deployment,
            max_tokens: 500,
            temperature: 0.1,
        })
    }

    /// Chat completions URL for `deployment`
    pub fn completions_url(&self, deployment: &str) -> String {
        match &self.provider {
            ModelProvider::Azure {
                endpoint,
                api_version,
            } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint, deployment, api_version
            ),
            ModelProvider::OpenAi { url } => url.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = OrchestratorConfig::default();
        assert_eq!(config.chunk_size, 1000);
        assert_eq!(config.chunk_threshold, 1000);
        assert_eq!(config.max_replans, 3);
        assert!(config.journal_dir.is_none());
    }

    #[test]
    fn test_builder() {
        let config = OrchestratorConfig::builder()
            .chunk_size(0)
            .chunk_threshold(50)
            .model_timeout_ms(1500)
            .max_replans(1)
            .journal_dir("/tmp/goals")
            .build();
        assert_eq!(config.chunk_size, 1);
        assert_eq!(config.chunk_threshold, 50);
        assert_eq!(config.model_timeout(), Duration::from_millis(1500));
        assert_eq!(config.max_replans, 1);
        assert_eq!(config.journal_dir, Some(PathBuf::from("/tmp/goals")));
    }

    #[test]
    fn test_azure_url() {
        let config = ModelConfig {
            provider: ModelProvider::Azure {
                endpoint: "https://res.openai.azure.com".to_string(),
                api_version: "2024-02-15-preview".to_string(),
            },
            api_key: "k".to_string(),
            deployment: "gpt-4.1-mini".to_string(),
            vision_deployment: "gpt-4.1-mini".to_string(),
            max_tokens: 500,
            temperature: 0.1,
        };
        assert_eq!(
            config.completions_url("gpt-4.1-mini"),
            "https://res.openai.azure.com/openai/deployments/gpt-4.1-mini/chat/completions?api-version=2024-02-15-preview"
        );
    }
}

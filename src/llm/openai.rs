//! Chat-completions client (Azure OpenAI or OpenAI-compatible)

use crate::config::{ModelConfig, ModelProvider};
use crate::error::ModelError;
use crate::llm::{ModelClient, ModelRequest};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, error, instrument};

/// `ModelClient` over the chat completions HTTP API
pub struct ChatCompletionsClient {
    client: reqwest::Client,
    config: ModelConfig,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatCompletionsClient {
    /// Create a client for `config`
    pub fn new(config: ModelConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            config,
        }
    }

    /// Build the request body; screenshots go to the vision deployment
    fn build_body(&self, request: &ModelRequest, deployment: &str) -> Value {
        let content = match &request.image {
            Some(bytes) => json!([
                { "type": "text", "text": request.prompt },
                {
                    "type": "image_url",
                    "image_url": { "url": format!("data:image/png;base64,{}", STANDARD.encode(bytes)) }
                }
            ]),
            None => json!(request.prompt),
        };

        let mut body = json!({
            "messages": [{ "role": "user", "content": content }],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature,
        });
        if matches!(self.config.provider, ModelProvider::OpenAi { .. }) {
            body["model"] = json!(deployment);
        }
        body
    }
}

#[async_trait]
impl ModelClient for ChatCompletionsClient {
    #[instrument(skip(self, request), fields(prompt_chars = request.prompt.len(), image = request.image.is_some()))]
    async fn complete(&self, request: ModelRequest) -> Result<String, ModelError> {
        let deployment = if request.image.is_some() {
            &self.config.vision_deployment
        } else {
            &self.config.deployment
        };
        let url = self.config.completions_url(deployment);
        let body = self.build_body(&request, deployment);

        let builder = self.client.post(&url).json(&body);
        let builder = match self.config.provider {
            ModelProvider::Azure { .. } => builder.header("api-key", &self.config.api_key),
            ModelProvider::OpenAi { .. } => builder.bearer_auth(&self.config.api_key),
        };

        let response = builder.send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            error!("Model API error ({}): {}", status, message);
            return Err(ModelError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: ChatResponse = response.json().await?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ModelError::EmptyResponse)?;

        debug!("Model replied with {} chars", content.len());
        Ok(content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(provider: ModelProvider) -> ModelConfig {
        ModelConfig {
            provider,
            api_key: "key".to_string(),
            deployment: "text-model".to_string(),
            vision_deployment: "vision-model".to_string(),
            max_tokens: 500,
            temperature: 0.1,
        }
    }

    #[test]
    fn test_text_body() {
        let client = ChatCompletionsClient::new(config(ModelProvider::Azure {
            endpoint: "https://res.openai.azure.com".to_string(),
            api_version: "2024-02-15-preview".to_string(),
        }));
        let body = client.build_body(&ModelRequest::text("hello"), "text-model");
        assert_eq!(body["messages"][0]["content"], "hello");
        assert_eq!(body["max_tokens"], 500);
        assert!(body.get("model").is_none());
    }

    #[test]
    fn test_image_body() {
        let client = ChatCompletionsClient::new(config(ModelProvider::OpenAi {
            url: "https://api.openai.com/v1/chat/completions".to_string(),
        }));
        let request = ModelRequest::with_image("look", Some(vec![1, 2, 3]));
        let body = client.build_body(&request, "vision-model");
        assert_eq!(body["model"], "vision-model");
        let parts = body["messages"][0]["content"].as_array().unwrap();
        assert_eq!(parts[0]["text"], "look");
        assert_eq!(
            parts[1]["image_url"]["url"],
            "data:image/png;base64,AQID"
        );
    }
}

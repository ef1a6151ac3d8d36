use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::{json, Value};
use thiserror::Error;

use shelfwise_core::config::{ModelConfig, ModelProvider};
use shelfwise_core::domain::conversation::ChatMessage;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("model gateway is not configured: {0}")]
    Unavailable(String),
    #[error("model generation failed: {0}")]
    Generation(String),
}

/// Boundary around the external generative model. Implementations must not
/// retry: a failed call surfaces to the caller, who decides whether to
/// re-invoke generation.
#[async_trait]
pub trait ModelGateway: Send + Sync {
    /// Single-shot form used by the artifact generators.
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError>;

    /// Conversational form used by the shopping assistant.
    async fn converse(
        &self,
        messages: &[ChatMessage],
        system_context: &str,
    ) -> Result<String, GatewayError>;
}

const OPENAI_DEFAULT_BASE_URL: &str = "https://api.openai.com";
const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_COMPLETION_TOKENS: u32 = 1024;

/// HTTP-backed gateway. The request timeout comes from config; a timeout is
/// a generation failure and never leaves a partial artifact behind.
pub struct HttpModelGateway {
    client: reqwest::Client,
    provider: ModelProvider,
    base_url: String,
    api_key: Option<SecretString>,
    model: String,
}

impl HttpModelGateway {
    pub fn from_config(config: &ModelConfig) -> Result<Self, GatewayError> {
        let api_key = config.api_key.clone();

        match config.provider {
            ModelProvider::OpenAi | ModelProvider::Anthropic => {
                let missing = api_key
                    .as_ref()
                    .map(|key| key.expose_secret().trim().is_empty())
                    .unwrap_or(true);
                if missing {
                    return Err(GatewayError::Unavailable(
                        "api key is required for hosted model providers".to_string(),
                    ));
                }
            }
            ModelProvider::Ollama => {
                if config.base_url.as_deref().map(str::trim).unwrap_or("").is_empty() {
                    return Err(GatewayError::Unavailable(
                        "base_url is required for the ollama provider".to_string(),
                    ));
                }
            }
        }

        let base_url = config
            .base_url
            .clone()
            .unwrap_or_else(|| match config.provider {
                ModelProvider::OpenAi => OPENAI_DEFAULT_BASE_URL.to_string(),
                ModelProvider::Anthropic => ANTHROPIC_DEFAULT_BASE_URL.to_string(),
                ModelProvider::Ollama => unreachable!("checked above"),
            })
            .trim_end_matches('/')
            .to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|error| GatewayError::Unavailable(error.to_string()))?;

        Ok(Self { client, provider: config.provider, base_url, api_key, model: config.model.clone() })
    }

    async fn chat(
        &self,
        system_context: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        match self.provider {
            ModelProvider::OpenAi | ModelProvider::Ollama => {
                self.chat_completions(system_context, messages).await
            }
            ModelProvider::Anthropic => self.anthropic_messages(system_context, messages).await,
        }
    }

    async fn chat_completions(
        &self,
        system_context: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let mut wire_messages = Vec::with_capacity(messages.len() + 1);
        if let Some(system) = system_context {
            wire_messages.push(json!({ "role": "system", "content": system }));
        }
        for message in messages {
            wire_messages
                .push(json!({ "role": message.role.as_str(), "content": message.content }));
        }

        let mut request = self
            .client
            .post(format!("{}/v1/chat/completions", self.base_url))
            .json(&json!({ "model": self.model, "messages": wire_messages }));
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response =
            request.send().await.map_err(|error| GatewayError::Generation(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Generation(format!("model host returned {status}")));
        }

        let body: Value =
            response.json().await.map_err(|error| GatewayError::Generation(error.to_string()))?;
        let content = body
            .pointer("/choices/0/message/content")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if content.trim().is_empty() {
            return Err(GatewayError::Generation("model returned empty content".to_string()));
        }
        Ok(content)
    }

    async fn anthropic_messages(
        &self,
        system_context: Option<&str>,
        messages: &[ChatMessage],
    ) -> Result<String, GatewayError> {
        let wire_messages: Vec<Value> = messages
            .iter()
            .map(|message| json!({ "role": message.role.as_str(), "content": message.content }))
            .collect();

        let mut body = json!({
            "model": self.model,
            "max_tokens": MAX_COMPLETION_TOKENS,
            "messages": wire_messages,
        });
        if let Some(system) = system_context {
            body["system"] = json!(system);
        }

        let key = self
            .api_key
            .as_ref()
            .ok_or_else(|| GatewayError::Unavailable("api key is missing".to_string()))?;

        let response = self
            .client
            .post(format!("{}/v1/messages", self.base_url))
            .header("x-api-key", key.expose_secret())
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
            .await
            .map_err(|error| GatewayError::Generation(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(GatewayError::Generation(format!("model host returned {status}")));
        }

        let body: Value =
            response.json().await.map_err(|error| GatewayError::Generation(error.to_string()))?;
        let content = body
            .pointer("/content/0/text")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();

        if content.trim().is_empty() {
            return Err(GatewayError::Generation("model returned empty content".to_string()));
        }
        Ok(content)
    }
}

#[async_trait]
impl ModelGateway for HttpModelGateway {
    async fn generate(&self, prompt: &str) -> Result<String, GatewayError> {
        let messages = [ChatMessage::user(prompt)];
        self.chat(None, &messages).await
    }

    async fn converse(
        &self,
        messages: &[ChatMessage],
        system_context: &str,
    ) -> Result<String, GatewayError> {
        self.chat(Some(system_context), messages).await
    }
}

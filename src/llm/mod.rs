//! OpenAI-compatible model backend.
//!
//! [`OpenAIActor`] plugs a chat-completions endpoint into a pipeline as an
//! assistant actor, including tool calls.

pub mod error;
pub mod openai;

use std::env;
use std::fmt;

pub use error::LLMError;
pub use openai::{
    ChatRequest, ChatResponse, OpenAIActor, ToolCall, WireMessage, history_to_wire,
};

const DEFAULT_BASE_URL: &str = "https://api.openai.com";

/// Chat models known to the adapter.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum ChatModel {
    #[default]
    Gpt4o,
    Gpt4oMini,
    Gpt41,
    Gpt41Mini,
    Gpt41Nano,
    /// Any other model name the endpoint accepts.
    Custom(String),
}

impl ChatModel {
    pub fn as_str(&self) -> &str {
        match self {
            ChatModel::Gpt4o => "gpt-4o",
            ChatModel::Gpt4oMini => "gpt-4o-mini",
            ChatModel::Gpt41 => "gpt-4.1",
            ChatModel::Gpt41Mini => "gpt-4.1-mini",
            ChatModel::Gpt41Nano => "gpt-4.1-nano",
            ChatModel::Custom(name) => name,
        }
    }
}

impl fmt::Display for ChatModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Clone, Debug)]
pub struct OpenAIConfig {
    /// API key for authentication
    pub api_key: String,
    /// Base URL (default: https://api.openai.com)
    pub base_url: String,
    /// Model used when an actor does not pick one
    pub model: ChatModel,
    /// Sampling temperature; the endpoint default when `None`
    pub temperature: Option<f32>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            model: ChatModel::default(),
            temperature: None,
        }
    }
}

impl OpenAIConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Reads `OPENAI_API_KEY` (required) and `OPENAI_BASE_URL` (optional).
    pub fn from_env() -> Result<Self, LLMError> {
        let api_key = env::var("OPENAI_API_KEY")
            .ok()
            .filter(|key| !key.is_empty())
            .ok_or_else(|| LLMError::MissingConfig("OPENAI_API_KEY is not set".to_string()))?;

        let mut config = Self::new(api_key);
        if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
            if !base_url.is_empty() {
                config.base_url = base_url;
            }
        }
        Ok(config)
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: ChatModel) -> Self {
        self.model = model;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }
}

/// HTTP client bound to one endpoint configuration.
#[derive(Clone)]
pub struct Client {
    pub(crate) client: reqwest::Client,
    pub(crate) config: OpenAIConfig,
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.config.base_url)
            .field("model", &self.config.model)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Fails if the configuration carries no API key.
    pub fn new(config: OpenAIConfig) -> Result<Self, LLMError> {
        if config.api_key.is_empty() {
            return Err(LLMError::MissingConfig("API key is empty".to_string()));
        }
        Ok(Client {
            client: reqwest::Client::new(),
            config,
        })
    }

    pub fn from_env() -> Result<Self, LLMError> {
        Self::new(OpenAIConfig::from_env()?)
    }

    pub fn config(&self) -> &OpenAIConfig {
        &self.config
    }

    /// Call the chat completions endpoint.
    pub async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, LLMError> {
        let response = self
            .client
            .post(format!(
                "{}/v1/chat/completions",
                self.config.base_url.trim_end_matches('/')
            ))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(LLMError::OpenAIError(format!(
                "HTTP {}: {}",
                status, error_text
            )));
        }

        let chat_response: ChatResponse = response.json().await?;
        log::debug!(
            "completion {} from {} created {}",
            chat_response.id,
            chat_response.model,
            chat_response.created
        );
        Ok(chat_response)
    }
}

// ============================================================================
// Deref to reqwest::Client for direct HTTP usage
// ============================================================================

impl std::ops::Deref for Client {
    type Target = reqwest::Client;
    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_names() {
        assert_eq!(ChatModel::Gpt4o.as_str(), "gpt-4o");
        assert_eq!(ChatModel::Gpt4oMini.as_str(), "gpt-4o-mini");
        assert_eq!(ChatModel::Gpt41.as_str(), "gpt-4.1");
        assert_eq!(ChatModel::Gpt41Mini.as_str(), "gpt-4.1-mini");
        assert_eq!(ChatModel::Gpt41Nano.to_string(), "gpt-4.1-nano");
        assert_eq!(ChatModel::Custom("local".into()).as_str(), "local");
    }

    #[test]
    fn test_config_defaults() {
        let config = OpenAIConfig::new("test-key");
        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "https://api.openai.com");
        assert_eq!(config.model, ChatModel::Gpt4o);
        assert!(config.temperature.is_none());

        let custom = OpenAIConfig::new("test-key")
            .with_base_url("http://localhost:8080")
            .with_model(ChatModel::Gpt41Mini)
            .with_temperature(0.2);
        assert_eq!(custom.base_url, "http://localhost:8080");
        assert_eq!(custom.model, ChatModel::Gpt41Mini);
        assert_eq!(custom.temperature, Some(0.2));
    }

    #[test]
    fn test_client_rejects_empty_key() {
        let err = Client::new(OpenAIConfig::default()).unwrap_err();
        assert!(matches!(err, LLMError::MissingConfig(_)));
        assert!(Client::new(OpenAIConfig::new("test-key")).is_ok());
    }
}

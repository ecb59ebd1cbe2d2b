// src/services/tutor.rs

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::instrument;

use crate::config::LlmConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A ready-to-send conversation.
#[derive(Debug, Clone)]
pub struct Prompt {
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
}

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("explanation provider is not configured")]
    Disabled,
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("Rate limit exceeded")]
    RateLimit,
    #[error("Authentication failed")]
    Authentication,
    #[error("provider returned no text")]
    EmptyCompletion,
    #[error("provider did not answer within {0:?}")]
    Timeout(Duration),
}

/// Text-generation backend used for explanations and tutoring.
#[async_trait]
pub trait ExplanationProvider: Send + Sync {
    async fn complete(&self, prompt: Prompt) -> Result<String, TutorError>;
}

pub type SharedProvider = Arc<dyn ExplanationProvider>;

/// Used when no API key is configured; every call takes the fallback path.
#[derive(Debug, Clone, Default)]
pub struct DisabledProvider;

#[async_trait]
impl ExplanationProvider for DisabledProvider {
    async fn complete(&self, _prompt: Prompt) -> Result<String, TutorError> {
        Err(TutorError::Disabled)
    }
}

/// Client for OpenRouter's OpenAI-compatible chat-completions endpoint.
#[derive(Clone, Debug)]
pub struct OpenRouterClient {
    config: LlmConfig,
    api_key: String,
    http: reqwest::Client,
}

impl OpenRouterClient {
    pub fn new(config: LlmConfig, api_key: String) -> Result<Self, TutorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TutorError::Http(e.to_string()))?;
        Ok(Self {
            config,
            api_key,
            http,
        })
    }

    fn request_body(&self, prompt: &Prompt) -> serde_json::Value {
        serde_json::json!({
            "model": self.config.model,
            "messages": prompt.messages,
            "max_tokens": prompt.max_tokens,
            "temperature": 0.7,
        })
    }
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

#[async_trait]
impl ExplanationProvider for OpenRouterClient {
    #[instrument(skip(self, prompt), fields(model = %self.config.model))]
    async fn complete(&self, prompt: Prompt) -> Result<String, TutorError> {
        let mut request = self
            .http
            .post(self.config.completions_url())
            .bearer_auth(&self.api_key)
            .header("X-Title", &self.config.app_title)
            .json(&self.request_body(&prompt));
        if let Some(referer) = &self.config.app_url {
            request = request.header("HTTP-Referer", referer);
        }

        let resp = request.send().await.map_err(|e| {
            if e.is_timeout() {
                TutorError::Timeout(self.config.timeout)
            } else {
                TutorError::Http(e.to_string())
            }
        })?;

        let status = resp.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Err(TutorError::Authentication);
        }
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(TutorError::RateLimit);
        }
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(TutorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: Completion = resp
            .json()
            .await
            .map_err(|e| TutorError::Http(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|text| !text.trim().is_empty())
            .ok_or(TutorError::EmptyCompletion)
    }
}

/// Picks the OpenRouter client when an API key is configured.
pub fn provider_from_config(config: &LlmConfig) -> SharedProvider {
    let Some(api_key) = config.api_key.clone() else {
        tracing::warn!("OPENROUTER_API_KEY not set, explanations will use fallback text");
        return Arc::new(DisabledProvider);
    };

    match OpenRouterClient::new(config.clone(), api_key) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::error!("Failed to build OpenRouter client: {}", e);
            Arc::new(DisabledProvider)
        }
    }
}

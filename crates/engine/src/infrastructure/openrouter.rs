//! OpenRouter chat client (OpenAI-compatible API).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::config::GenerationConfig;
use crate::infrastructure::ports::{
    ChatChoice, ChatError, ChatMessage, ChatPort, ChatRequest, ChatResponse, ChatRole,
};

/// Client for OpenRouter's OpenAI-compatible chat completions endpoint.
#[derive(Clone)]
pub struct OpenRouterClient {
    client: Client,
    base_url: String,
    api_key: String,
    referer: Option<String>,
    app_title: Option<String>,
}

impl OpenRouterClient {
    /// Build a client when a credential is configured; `None` otherwise, so
    /// callers degrade to the local bank instead of sending doomed requests.
    pub fn from_config(config: &GenerationConfig) -> Option<Self> {
        let api_key = config.api_key.as_deref()?.trim();
        if api_key.is_empty() {
            return None;
        }
        // Generation requests can be slow; match that with a generous timeout.
        let client = Client::builder()
            .timeout(Duration::from_secs(120))
            .build()
            .unwrap_or_else(|_| Client::new());

        Some(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            referer: config.referer.clone(),
            app_title: config.app_title.clone(),
        })
    }
}

#[async_trait]
impl ChatPort for OpenRouterClient {
    async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ChatError> {
        let api_request = ApiChatRequest {
            model: request.model.clone(),
            messages: request.messages.iter().map(ApiMessage::from).collect(),
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let mut builder = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&api_request);
        if let Some(referer) = &self.referer {
            builder = builder.header("HTTP-Referer", referer);
        }
        if let Some(title) = &self.app_title {
            builder = builder.header("X-Title", title);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let api_response: ApiChatResponse = response
            .json()
            .await
            .map_err(|e| ChatError::InvalidResponse(e.to_string()))?;

        Ok(convert_response(api_response))
    }
}

fn convert_response(response: ApiChatResponse) -> ChatResponse {
    ChatResponse {
        id: response.id.unwrap_or_default(),
        choices: response
            .choices
            .into_iter()
            .enumerate()
            .map(|(i, choice)| ChatChoice {
                index: choice.index.unwrap_or(i as u32),
                content: choice.message.content.unwrap_or_default(),
            })
            .collect(),
        model: response.model,
    }
}

// =============================================================================
// OpenAI API types
// =============================================================================

#[derive(Debug, Serialize)]
struct ApiChatRequest {
    model: String,
    messages: Vec<ApiMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: &'static str,
    content: String,
}

impl From<&ChatMessage> for ApiMessage {
    fn from(message: &ChatMessage) -> Self {
        Self {
            role: match message.role {
                ChatRole::System => "system",
                ChatRole::User => "user",
                ChatRole::Assistant => "assistant",
            },
            content: message.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiChatResponse {
    id: Option<String>,
    #[serde(default)]
    choices: Vec<ApiChoice>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    index: Option<u32>,
    #[serde(default)]
    message: ApiResponseMessage,
}

#[derive(Debug, Default, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
}

//! Generic bearer-token chat-completions adapter.
//!
//! Covers providers that expose an OpenAI-compatible `/chat/completions`
//! endpoint under their own base URL: Llama-hosted APIs, DeepSeek, and
//! similar. The provider name is configurable so logs and `llm_used`
//! envelopes report the actual vendor.

use crate::error::{LlmError, Result};
use crate::providers::{classify_status, http_client, GenerateRequest, TextProvider, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

/// Bearer-token chat client for OpenAI-compatible endpoints.
#[derive(Clone)]
pub struct OpenAiCompatProvider {
    provider_name: String,
    api_key: String,
    base_url: String,
    client: Client,
}

impl OpenAiCompatProvider {
    /// Create a new adapter. `base_url` is required: compatible vendors
    /// have no common default host.
    pub fn new(
        provider_name: impl Into<String>,
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            provider_name: provider_name.into(),
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: http_client(DEFAULT_TIMEOUT),
        }
    }
}

#[async_trait]
impl TextProvider for OpenAiCompatProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatRequest {
            model: request.model_id.clone(),
            max_tokens: request.max_tokens,
            temperature: request.temperature,
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: request.prompt.clone(),
            }],
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(LlmError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status(&self.provider_name, status, text));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("empty choices in response".to_string()))
    }

    fn name(&self) -> &str {
        &self.provider_name
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    max_tokens: usize,
    temperature: f32,
    messages: Vec<WireMessage>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    content: Option<String>,
}

//! HuggingFace Inference API adapter.

use crate::error::{LlmError, Result};
use crate::providers::{classify_status, http_client, GenerateRequest, TextProvider, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;

const DEFAULT_BASE_URL: &str = "https://api-inference.huggingface.co/models";

/// HuggingFace Inference API client.
#[derive(Clone)]
pub struct HuggingFaceProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl HuggingFaceProvider {
    /// Create a new adapter with the given credentials.
    pub fn new(api_key: impl Into<String>, base_url: Option<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            client: http_client(DEFAULT_TIMEOUT),
        }
    }

    /// The inference API returns either a list of generations or a
    /// single object depending on the model.
    fn extract_text(body: &Value) -> Result<String> {
        let text = match body {
            Value::Array(items) => items
                .first()
                .and_then(|v| v.get("generated_text"))
                .and_then(Value::as_str),
            other => other.get("generated_text").and_then(Value::as_str),
        };
        text.map(str::to_string).ok_or_else(|| {
            LlmError::InvalidResponse("no generated_text in response".to_string())
        })
    }
}

#[async_trait]
impl TextProvider for HuggingFaceProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let url = format!("{}/{}", self.base_url, request.model_id);

        let body = InferenceRequest {
            inputs: request.prompt.clone(),
            parameters: InferenceParameters {
                max_new_tokens: request.max_tokens,
                temperature: request.temperature,
            },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(LlmError::HttpError)?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(classify_status("HuggingFace", status, text));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Self::extract_text(&parsed)
    }

    fn name(&self) -> &str {
        "huggingface"
    }
}

#[derive(Debug, Serialize)]
struct InferenceRequest {
    inputs: String,
    parameters: InferenceParameters,
}

#[derive(Debug, Serialize)]
struct InferenceParameters {
    max_new_tokens: usize,
    temperature: f32,
}

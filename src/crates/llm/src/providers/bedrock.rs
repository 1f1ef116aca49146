//! AWS Bedrock invoke-style adapter.
//!
//! Talks to an invoke-shaped endpoint (`POST {base_url}/model/{id}/invoke`)
//! with a bearer API key. The request body format depends on the model
//! family: Anthropic-on-Bedrock takes a messages body, Titan takes
//! `inputText` plus a generation config. Unsupported families are a
//! configuration error.

use crate::error::{LlmError, Result};
use crate::providers::{classify_status, http_client, GenerateRequest, TextProvider, DEFAULT_TIMEOUT};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};

const BEDROCK_ANTHROPIC_VERSION: &str = "bedrock-2023-05-31";

/// Bedrock runtime client.
#[derive(Clone)]
pub struct BedrockProvider {
    api_key: String,
    base_url: String,
    client: Client,
}

impl BedrockProvider {
    /// Create a new adapter against an invoke-style endpoint.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            client: http_client(DEFAULT_TIMEOUT),
        }
    }

    fn request_body(request: &GenerateRequest) -> Result<Value> {
        if request.model_id.contains("anthropic") {
            Ok(json!({
                "anthropic_version": BEDROCK_ANTHROPIC_VERSION,
                "max_tokens": request.max_tokens,
                "temperature": request.temperature,
                "messages": [{"role": "user", "content": request.prompt}]
            }))
        } else if request.model_id.contains("titan") {
            Ok(json!({
                "inputText": request.prompt,
                "textGenerationConfig": {
                    "maxTokenCount": request.max_tokens,
                    "temperature": request.temperature
                }
            }))
        } else {
            Err(LlmError::ConfigError(format!(
                "Unsupported Bedrock model: {}",
                request.model_id
            )))
        }
    }

    fn extract_text(model_id: &str, body: &Value) -> Result<String> {
        let text = if model_id.contains("anthropic") {
            body.get("content")
                .and_then(|c| c.get(0))
                .and_then(|c| c.get("text"))
                .and_then(Value::as_str)
        } else {
            body.get("results")
                .and_then(|r| r.get(0))
                .and_then(|r| r.get("outputText"))
                .and_then(Value::as_str)
        };
        text.map(str::to_string)
            .ok_or_else(|| LlmError::InvalidResponse("no text in Bedrock response".to_string()))
    }
}

#[async_trait]
impl TextProvider for BedrockProvider {
    async fn generate(&self, request: &GenerateRequest) -> Result<String> {
        let body = Self::request_body(request)?;
        let url = format!("{}/model/{}/invoke", self.base_url, request.model_id);

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
            return Err(classify_status("Bedrock", status, text));
        }

        let parsed: Value = response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))?;
        Self::extract_text(&request.model_id, &parsed)
    }

    fn name(&self) -> &str {
        "aws_bedrock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(model_id: &str) -> GenerateRequest {
        GenerateRequest {
            prompt: "hello".to_string(),
            model_id: model_id.to_string(),
            max_tokens: 256,
            temperature: 0.7,
        }
    }

    #[test]
    fn test_anthropic_body_shape() {
        let body = BedrockProvider::request_body(&request("anthropic.claude-3")).unwrap();
        assert_eq!(body["anthropic_version"], BEDROCK_ANTHROPIC_VERSION);
        assert_eq!(body["messages"][0]["content"], "hello");
    }

    #[test]
    fn test_titan_body_shape() {
        let body = BedrockProvider::request_body(&request("amazon.titan-text")).unwrap();
        assert_eq!(body["inputText"], "hello");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 256);
    }

    #[test]
    fn test_unsupported_family_rejected() {
        let err = BedrockProvider::request_body(&request("cohere.command")).unwrap_err();
        assert!(matches!(err, LlmError::ConfigError(_)));
    }

    #[test]
    fn test_text_extraction_per_family() {
        let anthropic = serde_json::json!({"content": [{"type": "text", "text": "a"}]});
        assert_eq!(
            BedrockProvider::extract_text("anthropic.claude-3", &anthropic).unwrap(),
            "a"
        );

        let titan = serde_json::json!({"results": [{"outputText": "t"}]});
        assert_eq!(
            BedrockProvider::extract_text("amazon.titan-text", &titan).unwrap(),
            "t"
        );
    }
}

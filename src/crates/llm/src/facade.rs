//! The LLM facade: one entry point over every configured provider.
//!
//! `generate` never returns an error. The call path is:
//!
//! 1. snapshot provider/model/credential-reference under the config lock,
//!    then release it (a concurrent reload cannot affect this call);
//! 2. build the vendor adapter; missing credentials short-circuit;
//! 3. call the adapter with bounded retries (transport/5xx only, linear
//!    backoff scaled by attempt number);
//! 4. on any terminal failure, log and answer from the mock provider.

use crate::config::{LlmConfigManager, ModelSummary};
use crate::error::{LlmError, Result};
use crate::providers::{
    AnthropicProvider, BedrockProvider, GeminiProvider, GenerateRequest, HuggingFaceProvider,
    MockProvider, OpenAiCompatProvider, OpenAiProvider, TextProvider,
};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const DEFAULT_MAX_TOKENS: usize = 4096;
const DEFAULT_TEMPERATURE: f32 = 1.0;
const DEFAULT_RETRY_ATTEMPTS: u32 = 3;
const DEFAULT_RETRY_BASE: Duration = Duration::from_secs(2);

/// Optional knobs for a generation call.
#[derive(Debug, Clone, Default)]
pub struct GenerateOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<usize>,
}

/// Information about the model a facade is bound to.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ModelInfo {
    pub provider: String,
    pub model: String,
    pub model_id: Option<String>,
    pub description: Option<String>,
    pub best_for: Vec<String>,
    pub supports_vision: bool,
    pub supports_function_calling: bool,
    pub context_window: Option<u64>,
}

/// Everything a single call needs, captured under the config lock.
struct CallSnapshot {
    provider: String,
    model_id: String,
    api_key_env: Option<String>,
    base_url: Option<String>,
    region: Option<String>,
}

/// Unified facade over the configured LLM providers.
pub struct LlmFacade {
    manager: Arc<LlmConfigManager>,
    provider: String,
    model: String,
    retry_attempts: u32,
    retry_base: Duration,
}

impl LlmFacade {
    /// Create a facade bound to `provider`/`model`, falling back to the
    /// configured defaults when either is absent or the requested model
    /// is not enabled.
    pub fn new(
        manager: Arc<LlmConfigManager>,
        provider: Option<&str>,
        model: Option<&str>,
    ) -> Self {
        let (default_provider, default_model) = manager.default_provider_model();
        let mut provider = provider.unwrap_or(&default_provider).to_string();
        let mut model = model.unwrap_or(&default_model).to_string();

        let enabled = manager
            .get_provider_config(&provider)
            .filter(|p| p.enabled)
            .and_then(|p| p.models.get(&model).cloned())
            .map(|m| m.enabled)
            .unwrap_or(false);
        if !enabled && provider != "mock" {
            info!(
                "Model {}/{} not enabled; using default {}/{}",
                provider, model, default_provider, default_model
            );
            provider = default_provider;
            model = default_model;
        }

        debug!("Initialized LlmFacade: {}/{}", provider, model);
        Self {
            manager,
            provider,
            model,
            retry_attempts: DEFAULT_RETRY_ATTEMPTS,
            retry_base: DEFAULT_RETRY_BASE,
        }
    }

    /// Override retry policy (tests use zero backoff).
    pub fn with_retry(mut self, attempts: u32, base: Duration) -> Self {
        self.retry_attempts = attempts.max(1);
        self.retry_base = base;
        self
    }

    /// Provider this facade is bound to.
    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Model this facade is bound to.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Generate text. Never fails: provider errors fall back to the
    /// deterministic mock provider after bounded retries.
    pub async fn generate(&self, prompt: &str, options: &GenerateOptions) -> String {
        match self.try_generate(prompt, options).await {
            Ok(text) => text,
            Err(e) => {
                warn!(
                    "Generation via {}/{} failed ({}); falling back to mock",
                    self.provider, self.model, e
                );
                MockProvider::respond(prompt)
            }
        }
    }

    /// Generate structured output. Appends schema instructions to the
    /// prompt and best-effort extracts the first JSON object from the
    /// response; parse failure returns `{"response": <raw text>}`.
    pub async fn generate_structured(&self, prompt: &str, schema: &Value) -> Value {
        let structured_prompt = format!(
            "{}\n\nPlease provide your response as valid JSON matching this schema:\n{}\n\n\
             Return ONLY the JSON, no other text.",
            prompt,
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| "{}".to_string())
        );

        let response = self.generate(&structured_prompt, &GenerateOptions::default()).await;
        match extract_json_object(&response) {
            Some(value) => value,
            None => {
                warn!("Could not parse structured response, returning raw text");
                json!({ "response": response })
            }
        }
    }

    /// Enabled models across all enabled providers.
    pub fn list_available_models(&self) -> Vec<ModelSummary> {
        self.manager.enabled_models()
    }

    /// Pick the enabled model whose advisory tags best match `task_tag`:
    /// exact tag match scores highest, substring overlap scores lower,
    /// ties keep the first-enumerated model, and no hit at all yields the
    /// configured default.
    pub fn get_recommended_model(&self, task_tag: &str) -> (String, String) {
        let task = task_tag.to_lowercase();
        let mut best: Option<(&ModelSummary, u32)> = None;
        let models = self.manager.enabled_models();

        for summary in &models {
            let mut score = 0u32;
            for tag in &summary.best_for {
                let tag = tag.to_lowercase();
                if tag == task {
                    score += 10;
                } else if tag.contains(&task) || task.contains(&tag) {
                    score += 5;
                }
            }
            if score > best.as_ref().map(|(_, s)| *s).unwrap_or(0) {
                best = Some((summary, score));
            }
        }

        match best {
            Some((summary, _)) => (summary.provider.clone(), summary.model.clone()),
            None => self.manager.default_provider_model(),
        }
    }

    /// Information about the bound model.
    pub fn model_info(&self) -> ModelInfo {
        let model_config = self.manager.get_model_config(&self.provider, &self.model);
        ModelInfo {
            provider: self.provider.clone(),
            model: self.model.clone(),
            model_id: model_config.as_ref().map(|m| m.model_id.clone()),
            description: model_config.as_ref().map(|m| m.description.clone()),
            best_for: model_config
                .as_ref()
                .map(|m| m.best_for.clone())
                .unwrap_or_default(),
            supports_vision: model_config.as_ref().map(|m| m.supports_vision).unwrap_or(false),
            supports_function_calling: model_config
                .as_ref()
                .map(|m| m.supports_function_calling)
                .unwrap_or(false),
            context_window: model_config.and_then(|m| m.context_window),
        }
    }

    async fn try_generate(&self, prompt: &str, options: &GenerateOptions) -> Result<String> {
        let snapshot = self.snapshot()?;
        let adapter = self.build_adapter(&snapshot)?;

        let request = GenerateRequest {
            prompt: prompt.to_string(),
            model_id: snapshot.model_id,
            max_tokens: options.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            temperature: options.temperature.unwrap_or(DEFAULT_TEMPERATURE),
        };

        let mut attempt = 1;
        loop {
            match adapter.generate(&request).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    warn!(
                        "Attempt {}/{} via {} failed: {}",
                        attempt,
                        self.retry_attempts,
                        adapter.name(),
                        e
                    );
                    tokio::time::sleep(self.retry_base * attempt).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Capture provider/model/credential-reference under the config
    /// lock. I/O happens strictly after this returns.
    fn snapshot(&self) -> Result<CallSnapshot> {
        let provider_config = self
            .manager
            .get_provider_config(&self.provider)
            .ok_or_else(|| {
                LlmError::ConfigError(format!("Unknown provider: {}", self.provider))
            })?;
        let model_id = provider_config
            .models
            .get(&self.model)
            .map(|m| m.model_id.clone())
            .unwrap_or_else(|| self.model.clone());

        Ok(CallSnapshot {
            provider: self.provider.clone(),
            model_id,
            api_key_env: provider_config.api_key_env,
            base_url: provider_config.base_url,
            region: provider_config.region,
        })
    }

    fn resolve_api_key(snapshot: &CallSnapshot) -> Result<String> {
        let env_var = snapshot
            .api_key_env
            .as_deref()
            .ok_or_else(|| {
                LlmError::ConfigError(format!("No api_key_env for provider {}", snapshot.provider))
            })?;
        match std::env::var(env_var) {
            Ok(key) if !key.is_empty() => Ok(key),
            _ => Err(LlmError::ApiKeyNotFound(format!(
                "Environment variable: {}",
                env_var
            ))),
        }
    }

    fn build_adapter(&self, snapshot: &CallSnapshot) -> Result<Box<dyn TextProvider>> {
        match snapshot.provider.as_str() {
            "mock" => Ok(Box::new(MockProvider)),
            "anthropic" => {
                let key = Self::resolve_api_key(snapshot)?;
                Ok(Box::new(AnthropicProvider::new(key, snapshot.base_url.clone())))
            }
            "openai" => {
                let key = Self::resolve_api_key(snapshot)?;
                Ok(Box::new(OpenAiProvider::new(key, snapshot.base_url.clone())))
            }
            "google" => {
                let key = Self::resolve_api_key(snapshot)?;
                Ok(Box::new(GeminiProvider::new(key, snapshot.base_url.clone())))
            }
            "aws_bedrock" => {
                let key = Self::resolve_api_key(snapshot)?;
                let base_url = snapshot.base_url.clone().or_else(|| {
                    snapshot
                        .region
                        .as_ref()
                        .map(|r| format!("https://bedrock-runtime.{}.amazonaws.com", r))
                });
                let base_url = base_url.ok_or_else(|| {
                    LlmError::ConfigError("Bedrock requires base_url or region".to_string())
                })?;
                Ok(Box::new(BedrockProvider::new(key, base_url)))
            }
            "meta" | "deepseek" => {
                let key = Self::resolve_api_key(snapshot)?;
                let base_url = snapshot.base_url.clone().ok_or_else(|| {
                    LlmError::ConfigError(format!(
                        "Provider {} requires base_url",
                        snapshot.provider
                    ))
                })?;
                Ok(Box::new(OpenAiCompatProvider::new(
                    snapshot.provider.clone(),
                    key,
                    base_url,
                )))
            }
            "huggingface" => {
                let key = Self::resolve_api_key(snapshot)?;
                Ok(Box::new(HuggingFaceProvider::new(key, snapshot.base_url.clone())))
            }
            other => Err(LlmError::ConfigError(format!("Unknown provider: {}", other))),
        }
    }
}

/// Extract the first well-formed `{` ... `}` span from `text`.
fn extract_json_object(text: &str) -> Option<Value> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    serde_json::from_str(&text[start..=end]).ok()
}

//! Provider adapters.
//!
//! Every vendor integration implements [`TextProvider`]: one prompt in,
//! one string out, typed errors at the boundary. The facade owns retry
//! and fallback policy; adapters only translate requests and classify
//! HTTP failures.

pub mod anthropic;
pub mod bedrock;
pub mod gemini;
pub mod huggingface;
pub mod mock;
pub mod openai;
pub mod openai_compat;

pub use anthropic::AnthropicProvider;
pub use bedrock::BedrockProvider;
pub use gemini::GeminiProvider;
pub use huggingface::HuggingFaceProvider;
pub use mock::MockProvider;
pub use openai::OpenAiProvider;
pub use openai_compat::OpenAiCompatProvider;

use crate::error::{LlmError, Result};
use async_trait::async_trait;
use std::time::Duration;

/// Default timeout for a single generation call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// A single text-generation request.
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    /// The user prompt.
    pub prompt: String,
    /// Vendor model id to invoke.
    pub model_id: String,
    /// Maximum tokens to generate.
    pub max_tokens: usize,
    /// Sampling temperature.
    pub temperature: f32,
}

/// Provider-agnostic text generation.
#[async_trait]
pub trait TextProvider: Send + Sync {
    /// Generate a completion for `request`.
    async fn generate(&self, request: &GenerateRequest) -> Result<String>;

    /// Short provider name for logging.
    fn name(&self) -> &str;
}

/// Map a non-success HTTP response to the corresponding error class.
pub(crate) fn classify_status(provider: &str, status: reqwest::StatusCode, body: String) -> LlmError {
    let detail = format!("{} API error {}: {}", provider, status, body);
    if status.as_u16() == 401 || status.as_u16() == 403 {
        LlmError::AuthenticationError(detail)
    } else if status.as_u16() == 429 {
        LlmError::RateLimitExceeded(detail)
    } else if status.is_client_error() {
        LlmError::InvalidRequest(detail)
    } else {
        LlmError::ServiceUnavailable(detail)
    }
}

/// Build the shared HTTP client used by adapters.
pub(crate) fn http_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .expect("Failed to create HTTP client")
}

//! Error types for LLM provider adapters.

use thiserror::Error;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur when calling LLM providers.
#[derive(Debug, Error)]
pub enum LlmError {
    /// HTTP request failed (transport-level).
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// API authentication failed (401).
    #[error("Authentication failed: {0}")]
    AuthenticationError(String),

    /// API key environment variable missing or empty.
    #[error("API key not found: {0}")]
    ApiKeyNotFound(String),

    /// Rate limit exceeded (429).
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Request rejected by the provider (other 4xx).
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Provider-side failure (5xx).
    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),

    /// Response body did not match the expected shape.
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Configuration problem (unknown provider, disabled model, etc.).
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl LlmError {
    /// Transport and 5xx-class errors may succeed on retry; everything
    /// 4xx-shaped is terminal.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            LlmError::HttpError(_) | LlmError::ServiceUnavailable(_)
        )
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(err: serde_json::Error) -> Self {
        LlmError::SerializationError(err.to_string())
    }
}

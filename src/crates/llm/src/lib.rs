//! Provider-agnostic LLM facade for weft.
//!
//! This crate unifies text generation across multiple LLM providers
//! behind a single entry point:
//!
//! - **Anthropic** - Messages API
//! - **OpenAI** - Chat Completions API
//! - **Google** - Gemini generateContent API
//! - **AWS Bedrock** - invoke-style API (Anthropic and Titan body formats)
//! - **Meta / DeepSeek** - generic bearer-token chat-completions endpoints
//! - **HuggingFace** - Inference API
//! - **Mock** - deterministic canned responses for tests and credential-less runs
//!
//! Configuration is hot-reloadable: a background task re-reads the config
//! file on an interval, and generate paths snapshot provider, model, and
//! credentials before performing any I/O, so a reload never perturbs an
//! in-flight call.
//!
//! The facade never raises to callers. A provider failure is retried a
//! bounded number of times (transport and 5xx errors only), then falls
//! back to the mock provider.
//!
//! # Example
//!
//! ```rust,ignore
//! use llm::{LlmConfigManager, LlmFacade, GenerateOptions};
//! use std::sync::Arc;
//!
//! let manager = Arc::new(LlmConfigManager::from_path("config/llm/llm.json"));
//! manager.start_auto_refresh();
//!
//! let facade = LlmFacade::new(manager.clone(), None, None);
//! let text = facade.generate("Summarize this module", &GenerateOptions::default()).await;
//! ```

pub mod config;
pub mod error;
pub mod facade;
pub mod providers;

pub use config::{LlmConfig, LlmConfigManager, ModelConfig, ModelSummary, ProviderConfig};
pub use error::{LlmError, Result};
pub use facade::{GenerateOptions, LlmFacade, ModelInfo};
pub use providers::{GenerateRequest, TextProvider};

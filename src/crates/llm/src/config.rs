//! LLM configuration model and hot-reload manager.
//!
//! The configuration file maps providers to models with per-model
//! capability flags and advisory "best_for" tags. The manager keeps the
//! parsed config behind a `RwLock`; callers take cheap snapshots and the
//! background refresh task swaps the whole value atomically, so a reload
//! never affects a call already in flight.

use crate::error::Result;
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Default refresh interval when the file does not specify one.
const DEFAULT_REFRESH_SECS: u64 = 600;

/// Per-model configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Vendor model identifier sent on the wire.
    pub model_id: String,

    #[serde(default)]
    pub description: String,

    /// Advisory task tags used by `get_recommended_model`.
    #[serde(default)]
    pub best_for: Vec<String>,

    #[serde(default)]
    pub supports_vision: bool,

    #[serde(default)]
    pub supports_function_calling: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context_window: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost_per_1m_input_tokens: Option<f64>,
}

/// Per-provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Name of the environment variable holding the API key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    #[serde(default)]
    pub models: BTreeMap<String, ModelConfig>,
}

/// The whole configuration file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmConfig {
    pub default_provider: String,
    pub default_model: String,

    #[serde(default = "default_refresh")]
    pub refresh_interval_seconds: u64,

    #[serde(default)]
    pub providers: BTreeMap<String, ProviderConfig>,
}

fn default_refresh() -> u64 {
    DEFAULT_REFRESH_SECS
}

impl LlmConfig {
    /// Built-in fallback: a mock-only configuration used when no config
    /// file is available.
    pub fn mock_default() -> Self {
        let mut models = BTreeMap::new();
        models.insert(
            "mock-llm".to_string(),
            ModelConfig {
                enabled: true,
                model_id: "mock-llm-v1".to_string(),
                description: "Deterministic mock model for tests".to_string(),
                best_for: vec![],
                supports_vision: false,
                supports_function_calling: false,
                context_window: None,
                cost_per_1m_input_tokens: None,
            },
        );

        let mut providers = BTreeMap::new();
        providers.insert(
            "mock".to_string(),
            ProviderConfig {
                enabled: true,
                api_key_env: None,
                base_url: None,
                region: None,
                models,
            },
        );

        Self {
            default_provider: "mock".to_string(),
            default_model: "mock-llm".to_string(),
            refresh_interval_seconds: DEFAULT_REFRESH_SECS,
            providers,
        }
    }
}

/// One row of `enabled_models()` output.
#[derive(Debug, Clone, Serialize)]
pub struct ModelSummary {
    pub provider: String,
    pub model: String,
    pub model_id: String,
    pub description: String,
    pub best_for: Vec<String>,
}

/// Configuration manager with background auto-refresh.
pub struct LlmConfigManager {
    config: RwLock<LlmConfig>,
    config_path: Option<PathBuf>,
    stop_tx: Mutex<Option<watch::Sender<bool>>>,
}

impl LlmConfigManager {
    /// Create a manager from an already-parsed configuration.
    pub fn new(config: LlmConfig) -> Self {
        Self {
            config: RwLock::new(config),
            config_path: None,
            stop_tx: Mutex::new(None),
        }
    }

    /// Create a manager backed by a config file. A missing or unparsable
    /// file falls back to the mock-only default.
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let config = match Self::read_file(&path) {
            Ok(config) => {
                info!("Loaded LLM config from {}", path.display());
                config
            }
            Err(e) => {
                warn!(
                    "LLM config {} unavailable ({}); using mock defaults",
                    path.display(),
                    e
                );
                LlmConfig::mock_default()
            }
        };

        Self {
            config: RwLock::new(config),
            config_path: Some(path),
            stop_tx: Mutex::new(None),
        }
    }

    fn read_file(path: &PathBuf) -> Result<LlmConfig> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| crate::error::LlmError::ConfigError(e.to_string()))?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Re-read the config file and swap the in-memory value atomically.
    /// A failed reload keeps the current configuration.
    pub fn reload(&self) -> bool {
        let Some(path) = &self.config_path else {
            return false;
        };
        match Self::read_file(path) {
            Ok(new_config) => {
                *self.config.write() = new_config;
                debug!("Reloaded LLM config from {}", path.display());
                true
            }
            Err(e) => {
                error!("Error reloading LLM config: {}; keeping previous", e);
                false
            }
        }
    }

    /// Spawn the supervised refresh task. Safe to call once; subsequent
    /// calls while a task is running are no-ops.
    pub fn start_auto_refresh(self: &Arc<Self>) {
        let mut guard = self.stop_tx.lock();
        if guard.is_some() {
            return;
        }

        let (tx, mut rx) = watch::channel(false);
        *guard = Some(tx);
        drop(guard);

        let manager = Arc::clone(self);
        tokio::spawn(async move {
            loop {
                let interval = manager.config.read().refresh_interval_seconds.max(1);
                tokio::select! {
                    changed = rx.changed() => {
                        if changed.is_err() || *rx.borrow() {
                            debug!("LLM config auto-refresh stopped");
                            break;
                        }
                    }
                    _ = tokio::time::sleep(Duration::from_secs(interval)) => {
                        manager.reload();
                    }
                }
            }
        });
        info!("Started LLM config auto-refresh");
    }

    /// Stop the refresh task. Idempotent; used for clean shutdown in
    /// tests and on orchestrator stop.
    pub fn stop(&self) {
        if let Some(tx) = self.stop_tx.lock().take() {
            let _ = tx.send(true);
        }
    }

    /// Snapshot of the full configuration.
    pub fn get_config(&self) -> LlmConfig {
        self.config.read().clone()
    }

    /// Configuration for one provider.
    pub fn get_provider_config(&self, provider: &str) -> Option<ProviderConfig> {
        self.config.read().providers.get(provider).cloned()
    }

    /// Configuration for one model of one provider.
    pub fn get_model_config(&self, provider: &str, model: &str) -> Option<ModelConfig> {
        self.config
            .read()
            .providers
            .get(provider)?
            .models
            .get(model)
            .cloned()
    }

    /// All enabled models across enabled providers, in enumeration order.
    pub fn enabled_models(&self) -> Vec<ModelSummary> {
        let config = self.config.read();
        let mut out = Vec::new();
        for (provider_name, provider) in &config.providers {
            if !provider.enabled {
                continue;
            }
            for (model_name, model) in &provider.models {
                if model.enabled {
                    out.push(ModelSummary {
                        provider: provider_name.clone(),
                        model: model_name.clone(),
                        model_id: model.model_id.clone(),
                        description: model.description.clone(),
                        best_for: model.best_for.clone(),
                    });
                }
            }
        }
        out
    }

    /// The configured (default_provider, default_model) pair.
    pub fn default_provider_model(&self) -> (String, String) {
        let config = self.config.read();
        (config.default_provider.clone(), config.default_model.clone())
    }
}

impl Drop for LlmConfigManager {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn two_provider_config() -> LlmConfig {
        serde_json::from_str(
            r#"{
                "default_provider": "anthropic",
                "default_model": "sonnet",
                "refresh_interval_seconds": 60,
                "providers": {
                    "anthropic": {
                        "enabled": true,
                        "api_key_env": "ANTHROPIC_API_KEY",
                        "models": {
                            "sonnet": {"enabled": true, "model_id": "claude-sonnet",
                                       "best_for": ["coding", "reasoning"]},
                            "haiku": {"enabled": false, "model_id": "claude-haiku"}
                        }
                    },
                    "openai": {
                        "enabled": false,
                        "api_key_env": "OPENAI_API_KEY",
                        "models": {
                            "gpt": {"enabled": true, "model_id": "gpt-4o"}
                        }
                    }
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_enabled_models_skips_disabled() {
        let manager = LlmConfigManager::new(two_provider_config());
        let models = manager.enabled_models();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].provider, "anthropic");
        assert_eq!(models[0].model, "sonnet");
    }

    #[test]
    fn test_defaults_come_from_config() {
        let manager = LlmConfigManager::new(two_provider_config());
        assert_eq!(
            manager.default_provider_model(),
            ("anthropic".to_string(), "sonnet".to_string())
        );
    }

    #[test]
    fn test_missing_file_falls_back_to_mock() {
        let manager = LlmConfigManager::from_path("/nonexistent/llm.json");
        let (provider, model) = manager.default_provider_model();
        assert_eq!(provider, "mock");
        assert_eq!(model, "mock-llm");
        assert_eq!(manager.enabled_models().len(), 1);
    }

    #[test]
    fn test_reload_swaps_config() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("llm.json");
        std::fs::write(
            &path,
            serde_json::to_string(&two_provider_config()).unwrap(),
        )
        .unwrap();

        let manager = LlmConfigManager::from_path(&path);
        assert_eq!(manager.default_provider_model().0, "anthropic");

        let mut updated = two_provider_config();
        updated.default_provider = "openai".to_string();
        std::fs::write(&path, serde_json::to_string(&updated).unwrap()).unwrap();

        assert!(manager.reload());
        assert_eq!(manager.default_provider_model().0, "openai");
    }

    #[test]
    fn test_failed_reload_keeps_previous() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("llm.json");
        std::fs::write(
            &path,
            serde_json::to_string(&two_provider_config()).unwrap(),
        )
        .unwrap();

        let manager = LlmConfigManager::from_path(&path);
        std::fs::write(&path, "{ broken").unwrap();

        assert!(!manager.reload());
        assert_eq!(manager.default_provider_model().0, "anthropic");
    }

    #[tokio::test]
    async fn test_stop_is_idempotent() {
        let manager = Arc::new(LlmConfigManager::new(LlmConfig::mock_default()));
        manager.start_auto_refresh();
        manager.stop();
        manager.stop();
    }
}

//! Agent registry.
//!
//! Agents are LLM-backed handlers described by JSON files in a config
//! directory. A descriptor binds an agent id to an LLM provider/model
//! pair (absent bindings use the facade defaults) and an approval policy
//! for external callers. Dispatch renders the node input into a prompt
//! and calls the facade; the result envelope always reports which
//! provider and model answered.

use llm::{GenerateOptions, LlmConfigManager, LlmFacade};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

/// LLM binding declared by an agent descriptor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmBinding {
    pub provider: Option<String>,
    pub model: Option<String>,
}

/// One agent descriptor file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentDescriptor {
    pub agent_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub llm: Option<LlmBinding>,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
    /// Roles allowed to invoke this agent from outside a workflow.
    #[serde(default)]
    pub approved_roles: Vec<String>,
}

fn enabled_default() -> bool {
    true
}

/// Which provider/model actually served a call.
#[derive(Debug, Clone, Serialize)]
pub struct LlmUsed {
    pub provider: String,
    pub model: String,
}

/// Result envelope for agent dispatch.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub response: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub llm_used: Option<LlmUsed>,
}

impl AgentResult {
    fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            response: None,
            error: Some(error.into()),
            llm_used: None,
        }
    }
}

/// Registry of agent descriptors bound to the LLM facade.
pub struct AgentRegistry {
    config_dir: PathBuf,
    manager: Arc<LlmConfigManager>,
    agents: RwLock<HashMap<String, AgentDescriptor>>,
}

impl AgentRegistry {
    /// Load descriptors from `config_dir`. Files that fail to parse are
    /// skipped and reported; one bad descriptor never blocks the rest.
    pub fn load(
        config_dir: impl Into<PathBuf>,
        manager: Arc<LlmConfigManager>,
    ) -> std::io::Result<(Self, Vec<String>)> {
        let registry = Self {
            config_dir: config_dir.into(),
            manager,
            agents: RwLock::new(HashMap::new()),
        };
        let errors = registry.reload()?;
        Ok((registry, errors))
    }

    /// Re-scan the directory and atomically swap the descriptor map.
    pub fn reload(&self) -> std::io::Result<Vec<String>> {
        let mut agents = HashMap::new();
        let mut errors = Vec::new();

        if self.config_dir.exists() {
            for entry in fs::read_dir(&self.config_dir)? {
                let path = entry?.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                match fs::read_to_string(&path)
                    .map_err(|e| e.to_string())
                    .and_then(|text| {
                        serde_json::from_str::<AgentDescriptor>(&text).map_err(|e| e.to_string())
                    }) {
                    Ok(descriptor) => {
                        agents.insert(descriptor.agent_id.clone(), descriptor);
                    }
                    Err(e) => {
                        warn!("Skipping agent descriptor {}: {}", path.display(), e);
                        errors.push(format!("{}: {}", path.display(), e));
                    }
                }
            }
        }

        info!("Loaded {} agents ({} skipped)", agents.len(), errors.len());
        *self.agents.write() = agents;
        Ok(errors)
    }

    /// Get a descriptor by agent id.
    pub fn get_agent(&self, agent_id: &str) -> Option<AgentDescriptor> {
        self.agents.read().get(agent_id).cloned()
    }

    /// All descriptors, sorted by id.
    pub fn list_agents(&self) -> Vec<AgentDescriptor> {
        let mut rows: Vec<AgentDescriptor> = self.agents.read().values().cloned().collect();
        rows.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        rows
    }

    /// Whether `role` may invoke this agent from outside a workflow. An
    /// empty policy means unrestricted.
    pub fn is_approved_for_role(&self, agent_id: &str, role: &str) -> bool {
        match self.get_agent(agent_id) {
            Some(descriptor) => {
                descriptor.approved_roles.is_empty()
                    || descriptor.approved_roles.iter().any(|r| r == role)
            }
            None => false,
        }
    }

    /// Dispatch a call to an agent. Never panics and never errors at the
    /// type level; failures come back in the envelope.
    pub async fn execute_agent(&self, agent_id: &str, input: &Value) -> AgentResult {
        let Some(descriptor) = self.get_agent(agent_id) else {
            return AgentResult::failure(format!("Agent not found: {}", agent_id));
        };
        if !descriptor.enabled {
            return AgentResult::failure(format!("Agent disabled: {}", agent_id));
        }

        let (provider, model) = descriptor
            .llm
            .as_ref()
            .map(|binding| (binding.provider.clone(), binding.model.clone()))
            .unwrap_or((None, None));

        let facade = LlmFacade::new(
            Arc::clone(&self.manager),
            provider.as_deref(),
            model.as_deref(),
        );

        let prompt = render_prompt(&descriptor, input);
        let response = facade.generate(&prompt, &GenerateOptions::default()).await;

        AgentResult {
            success: true,
            response: Some(response),
            error: None,
            llm_used: Some(LlmUsed {
                provider: facade.provider().to_string(),
                model: facade.model().to_string(),
            }),
        }
    }
}

/// Derive the prompt an agent sends to its model. A string input is the
/// prompt itself; an object may carry an explicit `prompt` key; anything
/// else is passed through as pretty JSON.
fn render_prompt(descriptor: &AgentDescriptor, input: &Value) -> String {
    let body = match input {
        Value::String(text) => text.clone(),
        Value::Object(map) => match map.get("prompt").and_then(Value::as_str) {
            Some(prompt) => prompt.to_string(),
            None => format!(
                "Process the following input:\n{}",
                serde_json::to_string_pretty(input).unwrap_or_else(|_| input.to_string())
            ),
        },
        other => format!(
            "Process the following input:\n{}",
            serde_json::to_string_pretty(other).unwrap_or_else(|_| other.to_string())
        ),
    };

    if descriptor.description.is_empty() {
        body
    } else {
        format!("{}\n\n{}", descriptor.description, body)
    }
}

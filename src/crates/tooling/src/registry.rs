//! Tool registry: loads descriptors, instantiates tools through a
//! factory table, and dispatches executions.
//!
//! Local descriptors name a factory key; the table is populated at
//! construction time (no runtime code loading). Remote descriptors fan
//! out into one `RemoteTool` per advertised tool. Reload swaps the
//! internal maps atomically; executions already holding an `Arc` to a
//! tool finish against the prior instance.

use crate::builtin::{EchoTool, FilesystemTool};
use crate::descriptor::{LocalToolDescriptor, RemoteServerDescriptor};
use crate::error::{Result, ToolError};
use crate::remote::{RemoteTool, DEFAULT_REMOTE_TIMEOUT};
use crate::tool::{ExecutionEnvelope, Tool, ToolSchema};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Constructor signature for locally-instantiated tools.
pub type ToolFactory = fn(&LocalToolDescriptor) -> Result<Arc<dyn Tool>>;

/// One row of `list()` output.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ToolListing {
    pub name: String,
    pub description: String,
    pub kind: String,
    pub enabled: bool,
}

/// Health snapshot of one remote server.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RemoteServerStatus {
    pub name: String,
    pub url: String,
    pub status: String,
    pub response_time_ms: Option<u64>,
    pub tool_count: usize,
}

#[derive(Clone)]
struct DescriptorInfo {
    description: String,
    kind: &'static str,
    enabled: bool,
}

/// Registry of executable tools keyed by name.
pub struct ToolRegistry {
    local_dir: PathBuf,
    remote_dir: PathBuf,
    factories: HashMap<String, ToolFactory>,
    remote_timeout: Duration,
    tools: RwLock<HashMap<String, Arc<dyn Tool>>>,
    descriptors: RwLock<HashMap<String, DescriptorInfo>>,
}

impl ToolRegistry {
    /// Create a registry with the built-in factory table and load both
    /// descriptor directories.
    pub fn load(
        local_dir: impl Into<PathBuf>,
        remote_dir: impl Into<PathBuf>,
    ) -> Result<(Self, Vec<String>)> {
        Self::load_with_factories(local_dir, remote_dir, Self::builtin_factories())
    }

    /// Create a registry with a caller-supplied factory table (built-ins
    /// plus whatever the embedder registers).
    pub fn load_with_factories(
        local_dir: impl Into<PathBuf>,
        remote_dir: impl Into<PathBuf>,
        factories: HashMap<String, ToolFactory>,
    ) -> Result<(Self, Vec<String>)> {
        let registry = Self {
            local_dir: local_dir.into(),
            remote_dir: remote_dir.into(),
            factories,
            remote_timeout: DEFAULT_REMOTE_TIMEOUT,
            tools: RwLock::new(HashMap::new()),
            descriptors: RwLock::new(HashMap::new()),
        };
        let errors = registry.reload()?;
        Ok((registry, errors))
    }

    /// The factory table every registry starts from.
    pub fn builtin_factories() -> HashMap<String, ToolFactory> {
        let mut table: HashMap<String, ToolFactory> = HashMap::new();
        table.insert("echo".to_string(), EchoTool::factory);
        table.insert("filesystem".to_string(), FilesystemTool::factory);
        table
    }

    /// Re-scan both directories and atomically swap the tool map.
    /// Returns human-readable reasons for every skipped file.
    pub fn reload(&self) -> Result<Vec<String>> {
        let mut tools: HashMap<String, Arc<dyn Tool>> = HashMap::new();
        let mut descriptors: HashMap<String, DescriptorInfo> = HashMap::new();
        let mut errors = Vec::new();

        for path in json_files(&self.local_dir)? {
            match self.load_local(&path, &mut tools, &mut descriptors) {
                Ok(()) => {}
                Err(e) => {
                    warn!("Skipping tool descriptor {}: {}", path.display(), e);
                    errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        for path in json_files(&self.remote_dir)? {
            match self.load_remote(&path, &mut tools, &mut descriptors) {
                Ok(()) => {}
                Err(e) => {
                    warn!("Skipping remote descriptor {}: {}", path.display(), e);
                    errors.push(format!("{}: {}", path.display(), e));
                }
            }
        }

        info!(
            "Loaded {} tools ({} descriptors skipped)",
            tools.len(),
            errors.len()
        );
        *self.tools.write() = tools;
        *self.descriptors.write() = descriptors;
        Ok(errors)
    }

    fn load_local(
        &self,
        path: &Path,
        tools: &mut HashMap<String, Arc<dyn Tool>>,
        descriptors: &mut HashMap<String, DescriptorInfo>,
    ) -> Result<()> {
        let text = fs::read_to_string(path)?;
        let descriptor: LocalToolDescriptor = serde_json::from_str(&text)?;

        descriptors.insert(
            descriptor.name.clone(),
            DescriptorInfo {
                description: descriptor.description.clone(),
                kind: "local",
                enabled: descriptor.enabled,
            },
        );

        if !descriptor.enabled {
            return Ok(());
        }

        let factory = self.factories.get(&descriptor.module).ok_or_else(|| {
            ToolError::InvalidDescriptor(format!("Unknown factory: {}", descriptor.module))
        })?;
        let tool = factory(&descriptor)?;
        tools.insert(descriptor.name.clone(), tool);
        Ok(())
    }

    fn load_remote(
        &self,
        path: &Path,
        tools: &mut HashMap<String, Arc<dyn Tool>>,
        descriptors: &mut HashMap<String, DescriptorInfo>,
    ) -> Result<()> {
        let text = fs::read_to_string(path)?;
        let descriptor: RemoteServerDescriptor = serde_json::from_str(&text)?;

        for spec in &descriptor.tool_description.tools {
            let tool = RemoteTool::new(
                &descriptor.name,
                descriptor.mcp_url.clone(),
                spec,
                self.remote_timeout,
            )?;
            descriptors.insert(
                tool.name().to_string(),
                DescriptorInfo {
                    description: spec.description.clone(),
                    kind: "remote",
                    enabled: true,
                },
            );
            tools.insert(tool.name().to_string(), Arc::new(tool));
        }
        Ok(())
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.read().get(name).cloned()
    }

    /// Execute a tool and wrap the outcome in the uniform envelope.
    /// Unknown names come back as a failed envelope, never an error.
    pub async fn execute(&self, tool_name: &str, args: Value) -> ExecutionEnvelope {
        let tool = self.get_tool(tool_name);
        let Some(tool) = tool else {
            return ExecutionEnvelope::not_found(tool_name);
        };

        match tool.execute(args).await {
            Ok(result) => ExecutionEnvelope::success(tool_name, result),
            Err(e) => ExecutionEnvelope::failure(tool_name, e.to_string()),
        }
    }

    /// List every known tool, including disabled ones.
    pub fn list(&self) -> Vec<ToolListing> {
        let mut rows: Vec<ToolListing> = self
            .descriptors
            .read()
            .iter()
            .map(|(name, info)| ToolListing {
                name: name.clone(),
                description: info.description.clone(),
                kind: info.kind.to_string(),
                enabled: info.enabled,
            })
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// Schemas of every instantiated tool (for planners).
    pub fn schemas(&self) -> Vec<ToolSchema> {
        let mut rows: Vec<ToolSchema> = self
            .tools
            .read()
            .values()
            .map(|t| t.schema())
            .collect();
        rows.sort_by(|a, b| a.name.cmp(&b.name));
        rows
    }

    /// Flip a local tool's enabled flag on disk, then reload.
    pub fn set_enabled(&self, tool_name: &str, enabled: bool) -> Result<()> {
        let path = self.local_dir.join(format!("{}.json", tool_name));
        let text = fs::read_to_string(&path)
            .map_err(|_| ToolError::NotFound(tool_name.to_string()))?;
        let mut descriptor: LocalToolDescriptor = serde_json::from_str(&text)?;
        descriptor.enabled = enabled;

        let tmp = self.local_dir.join(format!(".{}.json.tmp", tool_name));
        fs::write(&tmp, serde_json::to_string_pretty(&descriptor)?)?;
        fs::rename(&tmp, &path)?;

        self.reload()?;
        Ok(())
    }

    /// Probe every remote server's `/health` endpoint.
    pub async fn remote_server_status(&self) -> Vec<RemoteServerStatus> {
        let mut statuses = Vec::new();
        let Ok(paths) = json_files(&self.remote_dir) else {
            return statuses;
        };

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(2))
            .build()
            .expect("Failed to create HTTP client");

        for path in paths {
            let Ok(text) = fs::read_to_string(&path) else {
                continue;
            };
            let Ok(descriptor) = serde_json::from_str::<RemoteServerDescriptor>(&text) else {
                continue;
            };

            let started = Instant::now();
            let healthy = matches!(
                client
                    .get(format!("{}/health", descriptor.mcp_url))
                    .send()
                    .await,
                Ok(resp) if resp.status().is_success()
            );

            statuses.push(RemoteServerStatus {
                name: descriptor.name.clone(),
                url: descriptor.mcp_url.clone(),
                status: if healthy { "online" } else { "offline" }.to_string(),
                response_time_ms: healthy.then(|| started.elapsed().as_millis() as u64),
                tool_count: descriptor.tool_description.tools.len(),
            });
        }
        statuses
    }
}

fn json_files(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut paths: Vec<PathBuf> = fs::read_dir(dir)?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("json"))
        .filter(|p| {
            p.file_name()
                .and_then(|n| n.to_str())
                .map(|n| !n.starts_with('.'))
                .unwrap_or(false)
        })
        .collect();
    paths.sort();
    Ok(paths)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn write_json(dir: &Path, name: &str, value: Value) {
        fs::write(
            dir.join(format!("{}.json", name)),
            serde_json::to_string_pretty(&value).unwrap(),
        )
        .unwrap();
    }

    fn setup() -> (TempDir, TempDir) {
        let local = TempDir::new().unwrap();
        let remote = TempDir::new().unwrap();
        write_json(
            local.path(),
            "echo",
            json!({"name": "echo", "description": "Echo", "module": "echo",
                   "config": {}, "enabled": true}),
        );
        (local, remote)
    }

    #[tokio::test]
    async fn test_execute_known_tool() {
        let (local, remote) = setup();
        let (registry, errors) = ToolRegistry::load(local.path(), remote.path()).unwrap();
        assert!(errors.is_empty());

        let envelope = registry.execute("echo", json!({"msg": "hi"})).await;
        assert!(envelope.success);
        assert_eq!(envelope.result.unwrap()["msg"], "hi");
        assert_eq!(envelope.tool_name, "echo");
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let (local, remote) = setup();
        let (registry, _) = ToolRegistry::load(local.path(), remote.path()).unwrap();

        let envelope = registry.execute("ghost", json!({})).await;
        assert!(!envelope.success);
        assert_eq!(envelope.error.as_deref(), Some("Tool not found: ghost"));
    }

    #[test]
    fn test_unknown_factory_is_skipped_with_error() {
        let (local, remote) = setup();
        write_json(
            local.path(),
            "weird",
            json!({"name": "weird", "module": "not_a_factory"}),
        );

        let (registry, errors) = ToolRegistry::load(local.path(), remote.path()).unwrap();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].contains("Unknown factory"));
        assert!(registry.get_tool("weird").is_none());
        assert!(registry.get_tool("echo").is_some());
    }

    #[test]
    fn test_disabled_tool_not_instantiated_but_listed() {
        let (local, remote) = setup();
        write_json(
            local.path(),
            "muted",
            json!({"name": "muted", "module": "echo", "enabled": false}),
        );

        let (registry, _) = ToolRegistry::load(local.path(), remote.path()).unwrap();
        assert!(registry.get_tool("muted").is_none());

        let listing = registry.list();
        let muted = listing.iter().find(|t| t.name == "muted").unwrap();
        assert!(!muted.enabled);
    }

    #[test]
    fn test_remote_descriptor_fans_out() {
        let (local, remote) = setup();
        write_json(
            remote.path(),
            "finance",
            json!({"name": "finance", "mcp_url": "http://localhost:8000",
                   "tool_description": {"tools": [
                       {"name": "get_stock_price", "description": "quote"},
                       {"name": "get_stock_info", "description": "info"}
                   ]}}),
        );

        let (registry, errors) = ToolRegistry::load(local.path(), remote.path()).unwrap();
        assert!(errors.is_empty());
        assert!(registry.get_tool("finance_get_stock_price").is_some());
        assert!(registry.get_tool("finance_get_stock_info").is_some());
    }

    #[test]
    fn test_identical_reload_keeps_listing() {
        let (local, remote) = setup();
        let (registry, _) = ToolRegistry::load(local.path(), remote.path()).unwrap();

        let before: Vec<String> = registry.list().iter().map(|t| t.name.clone()).collect();
        registry.reload().unwrap();
        let after: Vec<String> = registry.list().iter().map(|t| t.name.clone()).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn test_set_enabled_round_trip() {
        let (local, remote) = setup();
        let (registry, _) = ToolRegistry::load(local.path(), remote.path()).unwrap();

        registry.set_enabled("echo", false).unwrap();
        assert!(registry.get_tool("echo").is_none());

        registry.set_enabled("echo", true).unwrap();
        assert!(registry.get_tool("echo").is_some());
    }

    #[tokio::test]
    async fn test_remote_status_reports_offline() {
        let (local, remote) = setup();
        write_json(
            remote.path(),
            "dead",
            json!({"name": "dead", "mcp_url": "http://127.0.0.1:59998",
                   "tool_description": {"tools": [{"name": "noop"}]}}),
        );

        let (registry, _) = ToolRegistry::load(local.path(), remote.path()).unwrap();
        let statuses = registry.remote_server_status().await;
        assert_eq!(statuses.len(), 1);
        assert_eq!(statuses[0].status, "offline");
        assert_eq!(statuses[0].tool_count, 1);
    }
}

//! Shared harness for orchestrator integration tests: in-memory store,
//! a tool registry with the echo tool, an agent registry with one
//! mock-backed agent, and polling helpers.

// Each test binary uses a different subset of these helpers.
#![allow(dead_code)]

use llm::{LlmConfig, LlmConfigManager};
use orchestrator::db::models::{HitlRequest, WorkflowEvent};
use orchestrator::db::repositories::EventRepository;
use orchestrator::db::DatabaseConnection;
use orchestrator::{AgentRegistry, DatabasePool, WorkflowOrchestrator, WorkflowStatus};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tooling::ToolRegistry;

pub struct Harness {
    pub orchestrator: WorkflowOrchestrator,
    pub pool: DatabasePool,
    _local_tools: TempDir,
    _remote_tools: TempDir,
    _agents: TempDir,
}

/// Build a harness with the default mock LLM config and no extra files.
pub async fn harness() -> Harness {
    build_harness(LlmConfig::mock_default(), |_, _, _| {}).await
}

/// Build a harness with a custom LLM config and a hook that may write
/// extra descriptor files before the registries load.
pub async fn build_harness(
    llm_config: LlmConfig,
    setup: impl FnOnce(&Path, &Path, &Path),
) -> Harness {
    let conn = DatabaseConnection::new("sqlite::memory:").await.unwrap();
    conn.run_migrations().await.unwrap();
    let pool = conn.pool().clone();

    let local_tools = TempDir::new().unwrap();
    let remote_tools = TempDir::new().unwrap();
    let agents = TempDir::new().unwrap();

    std::fs::write(
        local_tools.path().join("echo.json"),
        serde_json::to_string_pretty(&json!({
            "name": "echo",
            "description": "Echo arguments back",
            "module": "echo",
            "config": {},
            "enabled": true
        }))
        .unwrap(),
    )
    .unwrap();

    std::fs::write(
        agents.path().join("echo_agent.json"),
        serde_json::to_string_pretty(&json!({
            "agent_id": "echo_agent",
            "name": "Echo Agent",
            "description": "",
            "enabled": true,
            "approved_roles": []
        }))
        .unwrap(),
    )
    .unwrap();

    setup(local_tools.path(), remote_tools.path(), agents.path());

    let (tools, _) = ToolRegistry::load(local_tools.path(), remote_tools.path()).unwrap();
    let manager = Arc::new(LlmConfigManager::new(llm_config));
    let (agent_registry, _) = AgentRegistry::load(agents.path(), manager).unwrap();

    Harness {
        orchestrator: WorkflowOrchestrator::new(
            pool.clone(),
            Arc::new(agent_registry),
            Arc::new(tools),
        ),
        pool,
        _local_tools: local_tools,
        _remote_tools: remote_tools,
        _agents: agents,
    }
}

/// Build a graph from definition-file JSON.
pub fn graph_from(definition: &str) -> dagcore::Graph {
    dagcore::DagDefinition::from_json(definition)
        .unwrap()
        .build_graph()
        .unwrap()
}

/// Poll until the workflow reaches a terminal state.
pub async fn wait_for_terminal(harness: &Harness, workflow_id: &str) -> WorkflowStatus {
    for _ in 0..500 {
        let status = harness
            .orchestrator
            .get_workflow_status(workflow_id)
            .await
            .unwrap();
        if status.workflow.is_terminal() {
            return status;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("workflow {} did not reach a terminal state", workflow_id);
}

/// Poll until a pending HITL request exists for the workflow.
pub async fn wait_for_pending_hitl(harness: &Harness, workflow_id: &str) -> HitlRequest {
    for _ in 0..500 {
        let pending = harness
            .orchestrator
            .get_pending_hitl_requests(Some(workflow_id))
            .await
            .unwrap();
        if let Some(request) = pending.into_iter().next() {
            return request;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("no pending HITL request appeared for {}", workflow_id);
}

/// The workflow's event log in total order.
pub async fn events(harness: &Harness, workflow_id: &str) -> Vec<WorkflowEvent> {
    EventRepository::list_for_workflow(&harness.pool, workflow_id)
        .await
        .unwrap()
}

/// Index of the first event matching (type, node id).
pub fn event_position(log: &[WorkflowEvent], event_type: &str, node_id: Option<&str>) -> usize {
    log.iter()
        .position(|e| {
            e.event_type == event_type
                && node_id
                    .map(|id| e.data_value()["node_id"] == json!(id))
                    .unwrap_or(true)
        })
        .unwrap_or_else(|| panic!("event {} for {:?} not found", event_type, node_id))
}

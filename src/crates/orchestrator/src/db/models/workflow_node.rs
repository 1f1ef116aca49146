//! Workflow node row model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Per-(workflow, node) state row. Mirrors the in-memory node status and
/// carries serialized result/config snapshots.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowNode {
    /// Autoincrement row id.
    pub id: i64,

    pub workflow_id: String,
    pub node_id: String,

    /// Dispatch kind: agent, tool, human_in_loop, decision.
    pub node_type: Option<String>,

    /// Agent binding for agent nodes.
    pub agent_id: Option<String>,

    /// pending, ready, running, waiting_hitl, completed, failed,
    /// skipped, cancelled.
    pub status: String,

    pub started_at: Option<String>,
    pub completed_at: Option<String>,

    /// Serialized result JSON.
    pub result: Option<String>,

    /// Error text for failed nodes.
    pub error: Option<String>,

    /// Serialized config snapshot taken at workflow start.
    pub config: Option<String>,
}

impl WorkflowNode {
    /// Deserialize the result column.
    pub fn result_value(&self) -> Option<serde_json::Value> {
        self.result
            .as_deref()
            .and_then(|r| serde_json::from_str(r).ok())
    }
}

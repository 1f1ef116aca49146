//! Agent execution row model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One LLM-backed agent invocation, optionally bound to a workflow node.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AgentExecution {
    /// Autoincrement row id.
    pub id: i64,

    /// Unique execution identifier (UUID string).
    pub execution_id: String,

    pub agent_id: String,
    pub workflow_id: Option<String>,
    pub node_id: Option<String>,

    /// Input snapshot (JSON).
    pub input: Option<String>,

    /// Output snapshot (JSON).
    pub output: Option<String>,

    /// pending, running, completed, failed.
    pub status: String,

    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub error: Option<String>,
}

//! Planner row models.
//!
//! These tables are populated by the planner collaborator outside the
//! core; the orchestrator only exposes read queries over them.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A planner-produced workflow plan.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plan {
    pub plan_id: String,
    pub session_id: Option<String>,
    pub user_id: Option<String>,
    pub dag_id: Option<String>,

    /// Serialized DAG definition proposed by the planner.
    pub plan_json: Option<String>,

    /// draft, approved, executed, discarded.
    pub status: String,

    pub created_at: String,
    pub updated_at: String,
}

/// One turn of a planner conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct PlannerConversation {
    pub id: i64,
    pub session_id: String,
    pub user_id: Option<String>,
    pub role: String,
    pub message: Option<String>,
    pub created_at: String,
}

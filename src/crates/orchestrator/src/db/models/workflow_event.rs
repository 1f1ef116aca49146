//! Workflow event row model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Append-only event record. Events for one workflow are totally
/// ordered by the autoincrement `id`; timestamps are informational.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct WorkflowEvent {
    /// Autoincrement row id; the tie-breaker for ordering.
    pub id: i64,

    pub workflow_id: String,

    /// workflow_started, workflow_completed, workflow_failed,
    /// node_started, node_completed, node_failed, hitl_requested,
    /// hitl_approved, hitl_rejected.
    pub event_type: String,

    /// JSON payload.
    pub event_data: Option<String>,

    pub created_at: String,
}

impl WorkflowEvent {
    /// Deserialize the payload column.
    pub fn data_value(&self) -> serde_json::Value {
        self.event_data
            .as_deref()
            .and_then(|d| serde_json::from_str(d).ok())
            .unwrap_or(serde_json::Value::Null)
    }
}

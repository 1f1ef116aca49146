//! Workflow row model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// One execution of a DAG.
///
/// The `graph_json` column carries the serialized graph snapshot taken
/// when the workflow started; later edits to the DAG definition do not
/// perturb a live run.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Workflow {
    /// Unique workflow identifier (UUID string).
    pub workflow_id: String,

    /// DAG definition this run was materialized from.
    pub dag_id: String,

    /// Originating session.
    pub session_id: Option<String>,

    /// Name copied from the graph.
    pub name: Option<String>,

    /// Description copied from the graph.
    pub description: Option<String>,

    /// Current status: pending, running, completed, failed.
    pub status: String,

    pub created_at: String,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,

    /// Opaque identity of the submitting user.
    pub created_by: Option<String>,

    /// Serialized graph snapshot.
    pub graph_json: Option<String>,

    /// Terminal result JSON for completed workflows.
    pub result: Option<String>,

    /// Terminal error text for failed workflows.
    pub error: Option<String>,
}

impl Workflow {
    /// True once the workflow can no longer transition.
    pub fn is_terminal(&self) -> bool {
        self.status == "completed" || self.status == "failed"
    }

    /// True while a driver may still be running.
    pub fn is_running(&self) -> bool {
        self.status == "running"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_statuses() {
        let mut workflow = Workflow {
            workflow_id: "wf-1".to_string(),
            dag_id: "dag".to_string(),
            session_id: None,
            name: None,
            description: None,
            status: "running".to_string(),
            created_at: String::new(),
            started_at: None,
            completed_at: None,
            created_by: None,
            graph_json: None,
            result: None,
            error: None,
        };
        assert!(workflow.is_running());
        assert!(!workflow.is_terminal());

        workflow.status = "failed".to_string();
        assert!(workflow.is_terminal());
    }
}

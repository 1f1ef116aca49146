//! Workflow node repository.
//!
//! Node transitions are guarded by the owning workflow's status: once a
//! workflow is terminal, running/completed/failed writes affect zero
//! rows. The single exception is `mark_cancelled`, which records that an
//! in-flight node's result was discarded after cancellation.

use crate::db::connection::DatabasePool;
use crate::db::models::WorkflowNode;
use chrono::Utc;

const RUNNING_GUARD: &str =
    "AND EXISTS (SELECT 1 FROM workflows w WHERE w.workflow_id = workflow_nodes.workflow_id
                 AND w.status = 'running')";

/// Repository for workflow node rows.
pub struct WorkflowNodeRepository;

impl WorkflowNodeRepository {
    /// Get one node row.
    pub async fn get(
        pool: &DatabasePool,
        workflow_id: &str,
        node_id: &str,
    ) -> Result<Option<WorkflowNode>, sqlx::Error> {
        sqlx::query_as::<_, WorkflowNode>(
            "SELECT * FROM workflow_nodes WHERE workflow_id = ? AND node_id = ?",
        )
        .bind(workflow_id)
        .bind(node_id)
        .fetch_optional(pool)
        .await
    }

    /// All node rows of a workflow, in node id order.
    pub async fn list_for_workflow(
        pool: &DatabasePool,
        workflow_id: &str,
    ) -> Result<Vec<WorkflowNode>, sqlx::Error> {
        sqlx::query_as::<_, WorkflowNode>(
            "SELECT * FROM workflow_nodes WHERE workflow_id = ? ORDER BY node_id",
        )
        .bind(workflow_id)
        .fetch_all(pool)
        .await
    }

    /// Transition to `running` with a start timestamp.
    pub async fn mark_running(
        pool: &DatabasePool,
        workflow_id: &str,
        node_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(&format!(
            "UPDATE workflow_nodes SET status = 'running', started_at = ?
             WHERE workflow_id = ? AND node_id = ? {}",
            RUNNING_GUARD
        ))
        .bind(&now)
        .bind(workflow_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Transition to the synthetic `waiting_hitl` sub-status.
    pub async fn mark_waiting_hitl(
        pool: &DatabasePool,
        workflow_id: &str,
        node_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(&format!(
            "UPDATE workflow_nodes SET status = 'waiting_hitl', started_at = ?
             WHERE workflow_id = ? AND node_id = ? {}",
            RUNNING_GUARD
        ))
        .bind(&now)
        .bind(workflow_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Transition to `completed` with the serialized result.
    pub async fn mark_completed(
        pool: &DatabasePool,
        workflow_id: &str,
        node_id: &str,
        result_json: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(&format!(
            "UPDATE workflow_nodes SET status = 'completed', completed_at = ?, result = ?
             WHERE workflow_id = ? AND node_id = ? {}",
            RUNNING_GUARD
        ))
        .bind(&now)
        .bind(result_json)
        .bind(workflow_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Transition to `failed` with the error text.
    pub async fn mark_failed(
        pool: &DatabasePool,
        workflow_id: &str,
        node_id: &str,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(&format!(
            "UPDATE workflow_nodes SET status = 'failed', completed_at = ?, error = ?
             WHERE workflow_id = ? AND node_id = ? {}",
            RUNNING_GUARD
        ))
        .bind(&now)
        .bind(error)
        .bind(workflow_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Transition to `skipped` (decision branches, recovery policy).
    pub async fn mark_skipped(
        pool: &DatabasePool,
        workflow_id: &str,
        node_id: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(&format!(
            "UPDATE workflow_nodes SET status = 'skipped', completed_at = ?
             WHERE workflow_id = ? AND node_id = ? {}",
            RUNNING_GUARD
        ))
        .bind(&now)
        .bind(workflow_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Record that an in-flight node's result was discarded because the
    /// workflow was cancelled. Unguarded: the workflow is already
    /// terminal when this applies.
    pub async fn mark_cancelled(
        pool: &DatabasePool,
        workflow_id: &str,
        node_id: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE workflow_nodes
             SET status = 'cancelled', completed_at = ?, result = NULL
             WHERE workflow_id = ? AND node_id = ?",
        )
        .bind(&now)
        .bind(workflow_id)
        .bind(node_id)
        .execute(pool)
        .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::workflow_repo::{NodeSeed, WorkflowRepository};
    use crate::db::repositories::test_pool;

    async fn seed(pool: &DatabasePool) {
        WorkflowRepository::create_with_nodes(
            pool,
            "wf-1",
            "dag-1",
            "s",
            "u",
            "Test",
            "",
            "{}",
            &[NodeSeed {
                node_id: "a".to_string(),
                node_type: "tool".to_string(),
                agent_id: None,
                config: "{}".to_string(),
            }],
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_node_lifecycle() {
        let pool = test_pool().await;
        seed(&pool).await;

        assert!(WorkflowNodeRepository::mark_running(&pool, "wf-1", "a")
            .await
            .unwrap());
        assert!(
            WorkflowNodeRepository::mark_completed(&pool, "wf-1", "a", r#"{"msg":"hi"}"#)
                .await
                .unwrap()
        );

        let node = WorkflowNodeRepository::get(&pool, "wf-1", "a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(node.status, "completed");
        assert_eq!(node.result_value().unwrap()["msg"], "hi");
        assert!(node.started_at.is_some());
        assert!(node.completed_at.is_some());
    }

    #[tokio::test]
    async fn test_writes_rejected_after_workflow_terminal() {
        let pool = test_pool().await;
        seed(&pool).await;
        WorkflowRepository::mark_failed(&pool, "wf-1", "boom")
            .await
            .unwrap();

        assert!(!WorkflowNodeRepository::mark_running(&pool, "wf-1", "a")
            .await
            .unwrap());
        assert!(
            !WorkflowNodeRepository::mark_completed(&pool, "wf-1", "a", "{}")
                .await
                .unwrap()
        );

        let node = WorkflowNodeRepository::get(&pool, "wf-1", "a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(node.status, "pending");
    }

    #[tokio::test]
    async fn test_cancelled_write_allowed_after_terminal() {
        let pool = test_pool().await;
        seed(&pool).await;
        WorkflowRepository::mark_failed(&pool, "wf-1", "cancelled")
            .await
            .unwrap();

        WorkflowNodeRepository::mark_cancelled(&pool, "wf-1", "a")
            .await
            .unwrap();
        let node = WorkflowNodeRepository::get(&pool, "wf-1", "a")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(node.status, "cancelled");
        assert!(node.result.is_none());
    }
}

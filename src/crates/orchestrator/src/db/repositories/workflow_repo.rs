//! Workflow repository.

use crate::db::connection::DatabasePool;
use crate::db::models::Workflow;
use chrono::Utc;

/// Seed data for one node row, inserted alongside the workflow row.
#[derive(Debug, Clone)]
pub struct NodeSeed {
    pub node_id: String,
    pub node_type: String,
    pub agent_id: Option<String>,
    pub config: String,
}

/// Repository for workflow rows.
pub struct WorkflowRepository;

impl WorkflowRepository {
    /// Insert a workflow row plus one row per node in a single
    /// transaction. The workflow starts in `running` with the graph
    /// snapshot attached.
    #[allow(clippy::too_many_arguments)]
    pub async fn create_with_nodes(
        pool: &DatabasePool,
        workflow_id: &str,
        dag_id: &str,
        session_id: &str,
        user_id: &str,
        name: &str,
        description: &str,
        graph_json: &str,
        nodes: &[NodeSeed],
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let mut tx = pool.begin().await?;

        sqlx::query(
            "INSERT INTO workflows (workflow_id, dag_id, session_id, name, description,
                                    status, created_at, started_at, created_by, graph_json)
             VALUES (?, ?, ?, ?, ?, 'running', ?, ?, ?, ?)",
        )
        .bind(workflow_id)
        .bind(dag_id)
        .bind(session_id)
        .bind(name)
        .bind(description)
        .bind(&now)
        .bind(&now)
        .bind(user_id)
        .bind(graph_json)
        .execute(&mut *tx)
        .await?;

        for node in nodes {
            sqlx::query(
                "INSERT INTO workflow_nodes (workflow_id, node_id, node_type, agent_id,
                                             status, config)
                 VALUES (?, ?, ?, ?, 'pending', ?)",
            )
            .bind(workflow_id)
            .bind(&node.node_id)
            .bind(&node.node_type)
            .bind(&node.agent_id)
            .bind(&node.config)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }

    /// Get a workflow by id.
    pub async fn get_by_id(
        pool: &DatabasePool,
        workflow_id: &str,
    ) -> Result<Option<Workflow>, sqlx::Error> {
        sqlx::query_as::<_, Workflow>("SELECT * FROM workflows WHERE workflow_id = ?")
            .bind(workflow_id)
            .fetch_optional(pool)
            .await
    }

    /// List workflows, newest first.
    pub async fn list(pool: &DatabasePool, limit: i64) -> Result<Vec<Workflow>, sqlx::Error> {
        sqlx::query_as::<_, Workflow>(
            "SELECT * FROM workflows ORDER BY created_at DESC, workflow_id LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }

    /// List workflows in a given status, newest first.
    pub async fn list_by_status(
        pool: &DatabasePool,
        status: &str,
    ) -> Result<Vec<Workflow>, sqlx::Error> {
        sqlx::query_as::<_, Workflow>(
            "SELECT * FROM workflows WHERE status = ? ORDER BY created_at DESC, workflow_id",
        )
        .bind(status)
        .fetch_all(pool)
        .await
    }

    /// Ids of every workflow currently marked running.
    pub async fn list_running_ids(pool: &DatabasePool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT workflow_id FROM workflows WHERE status = 'running'")
                .fetch_all(pool)
                .await?;
        Ok(rows.into_iter().map(|(id,)| id).collect())
    }

    /// Terminal transition to `completed`. Returns false when the
    /// workflow was not in `running` (the transition is one-shot).
    pub async fn mark_completed(
        pool: &DatabasePool,
        workflow_id: &str,
        result_json: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(
            "UPDATE workflows SET status = 'completed', completed_at = ?, result = ?
             WHERE workflow_id = ? AND status = 'running'",
        )
        .bind(&now)
        .bind(result_json)
        .bind(workflow_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Terminal transition to `failed`. Returns false when the workflow
    /// was not in `running`.
    pub async fn mark_failed(
        pool: &DatabasePool,
        workflow_id: &str,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(
            "UPDATE workflows SET status = 'failed', completed_at = ?, error = ?
             WHERE workflow_id = ? AND status = 'running'",
        )
        .bind(&now)
        .bind(error)
        .bind(workflow_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_pool;

    fn seed_nodes() -> Vec<NodeSeed> {
        vec![
            NodeSeed {
                node_id: "a".to_string(),
                node_type: "tool".to_string(),
                agent_id: None,
                config: "{}".to_string(),
            },
            NodeSeed {
                node_id: "b".to_string(),
                node_type: "agent".to_string(),
                agent_id: Some("echo_agent".to_string()),
                config: "{}".to_string(),
            },
        ]
    }

    async fn create_workflow(pool: &DatabasePool, id: &str) {
        WorkflowRepository::create_with_nodes(
            pool,
            id,
            "dag-1",
            "session-1",
            "user-1",
            "Test",
            "",
            "{}",
            &seed_nodes(),
        )
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_create_inserts_workflow_and_nodes() {
        let pool = test_pool().await;
        create_workflow(&pool, "wf-1").await;

        let workflow = WorkflowRepository::get_by_id(&pool, "wf-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(workflow.status, "running");
        assert!(workflow.started_at.is_some());

        let count: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM workflow_nodes WHERE workflow_id = 'wf-1'")
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(count.0, 2);
    }

    #[tokio::test]
    async fn test_terminal_transition_is_one_shot() {
        let pool = test_pool().await;
        create_workflow(&pool, "wf-1").await;

        assert!(WorkflowRepository::mark_completed(&pool, "wf-1", "{}")
            .await
            .unwrap());
        // Second transition of either flavor affects nothing.
        assert!(!WorkflowRepository::mark_completed(&pool, "wf-1", "{}")
            .await
            .unwrap());
        assert!(!WorkflowRepository::mark_failed(&pool, "wf-1", "late")
            .await
            .unwrap());

        let workflow = WorkflowRepository::get_by_id(&pool, "wf-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(workflow.status, "completed");
        assert!(workflow.error.is_none());
    }

    #[tokio::test]
    async fn test_list_running_ids() {
        let pool = test_pool().await;
        create_workflow(&pool, "wf-1").await;
        create_workflow(&pool, "wf-2").await;
        WorkflowRepository::mark_failed(&pool, "wf-2", "boom")
            .await
            .unwrap();

        let running = WorkflowRepository::list_running_ids(&pool).await.unwrap();
        assert_eq!(running, vec!["wf-1".to_string()]);
    }
}

//! Agent execution repository.

use crate::db::connection::DatabasePool;
use crate::db::models::AgentExecution;
use chrono::Utc;

/// Repository for agent execution rows.
pub struct AgentExecutionRepository;

impl AgentExecutionRepository {
    /// Record the start of an execution.
    pub async fn start(
        pool: &DatabasePool,
        execution_id: &str,
        agent_id: &str,
        workflow_id: Option<&str>,
        node_id: Option<&str>,
        input_json: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO agent_executions (execution_id, agent_id, workflow_id, node_id,
                                           input, status, started_at)
             VALUES (?, ?, ?, ?, ?, 'running', ?)",
        )
        .bind(execution_id)
        .bind(agent_id)
        .bind(workflow_id)
        .bind(node_id)
        .bind(input_json)
        .bind(&now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record successful completion with the output snapshot.
    pub async fn complete(
        pool: &DatabasePool,
        execution_id: &str,
        output_json: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE agent_executions SET status = 'completed', output = ?, completed_at = ?
             WHERE execution_id = ?",
        )
        .bind(output_json)
        .bind(&now)
        .bind(execution_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Record a failure.
    pub async fn fail(
        pool: &DatabasePool,
        execution_id: &str,
        error: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE agent_executions SET status = 'failed', error = ?, completed_at = ?
             WHERE execution_id = ?",
        )
        .bind(error)
        .bind(&now)
        .bind(execution_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Get one execution by id.
    pub async fn get_by_execution_id(
        pool: &DatabasePool,
        execution_id: &str,
    ) -> Result<Option<AgentExecution>, sqlx::Error> {
        sqlx::query_as::<_, AgentExecution>(
            "SELECT * FROM agent_executions WHERE execution_id = ?",
        )
        .bind(execution_id)
        .fetch_optional(pool)
        .await
    }

    /// Executions recorded for a workflow.
    pub async fn list_for_workflow(
        pool: &DatabasePool,
        workflow_id: &str,
    ) -> Result<Vec<AgentExecution>, sqlx::Error> {
        sqlx::query_as::<_, AgentExecution>(
            "SELECT * FROM agent_executions WHERE workflow_id = ? ORDER BY id",
        )
        .bind(workflow_id)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_pool;

    #[tokio::test]
    async fn test_execution_round_trip() {
        let pool = test_pool().await;

        AgentExecutionRepository::start(
            &pool,
            "exec-1",
            "echo_agent",
            Some("wf-1"),
            Some("n1"),
            r#"{"prompt":"hi"}"#,
        )
        .await
        .unwrap();
        AgentExecutionRepository::complete(&pool, "exec-1", r#"{"response":"ok"}"#)
            .await
            .unwrap();

        let row = AgentExecutionRepository::get_by_execution_id(&pool, "exec-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, "completed");
        assert!(row.output.is_some());

        let for_workflow = AgentExecutionRepository::list_for_workflow(&pool, "wf-1")
            .await
            .unwrap();
        assert_eq!(for_workflow.len(), 1);
    }

    #[tokio::test]
    async fn test_failed_execution_records_error() {
        let pool = test_pool().await;
        AgentExecutionRepository::start(&pool, "exec-1", "a", None, None, "{}")
            .await
            .unwrap();
        AgentExecutionRepository::fail(&pool, "exec-1", "model unavailable")
            .await
            .unwrap();

        let row = AgentExecutionRepository::get_by_execution_id(&pool, "exec-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(row.status, "failed");
        assert_eq!(row.error.as_deref(), Some("model unavailable"));
    }
}

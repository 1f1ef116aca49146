//! Workflow event repository.
//!
//! Events are append-only. `insert_if_running` is the default write
//! path: it refuses to append once the workflow is terminal, which is
//! what keeps a cancelled workflow's log quiet. Terminal transitions
//! use the unconditional `insert`, immediately after winning the
//! one-shot status update.

use crate::db::connection::DatabasePool;
use crate::db::models::WorkflowEvent;
use chrono::Utc;
use serde_json::Value;

/// Repository for workflow event rows.
pub struct EventRepository;

impl EventRepository {
    /// Append an event unconditionally.
    pub async fn insert(
        pool: &DatabasePool,
        workflow_id: &str,
        event_type: &str,
        event_data: &Value,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO workflow_events (workflow_id, event_type, event_data, created_at)
             VALUES (?, ?, ?, ?)",
        )
        .bind(workflow_id)
        .bind(event_type)
        .bind(event_data.to_string())
        .bind(&now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Append an event only while the workflow is still running.
    /// Returns false (and writes nothing) for terminal workflows.
    pub async fn insert_if_running(
        pool: &DatabasePool,
        workflow_id: &str,
        event_type: &str,
        event_data: &Value,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(
            "INSERT INTO workflow_events (workflow_id, event_type, event_data, created_at)
             SELECT ?, ?, ?, ?
             WHERE EXISTS (SELECT 1 FROM workflows
                           WHERE workflow_id = ? AND status = 'running')",
        )
        .bind(workflow_id)
        .bind(event_type)
        .bind(event_data.to_string())
        .bind(&now)
        .bind(workflow_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Events for a workflow in total order (autoincrement id).
    pub async fn list_for_workflow(
        pool: &DatabasePool,
        workflow_id: &str,
    ) -> Result<Vec<WorkflowEvent>, sqlx::Error> {
        sqlx::query_as::<_, WorkflowEvent>(
            "SELECT * FROM workflow_events WHERE workflow_id = ? ORDER BY id",
        )
        .bind(workflow_id)
        .fetch_all(pool)
        .await
    }

    /// Most recent events across all workflows.
    pub async fn recent(
        pool: &DatabasePool,
        limit: i64,
    ) -> Result<Vec<WorkflowEvent>, sqlx::Error> {
        sqlx::query_as::<_, WorkflowEvent>(
            "SELECT * FROM workflow_events ORDER BY id DESC LIMIT ?",
        )
        .bind(limit)
        .fetch_all(pool)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::workflow_repo::WorkflowRepository;
    use crate::db::repositories::test_pool;
    use serde_json::json;

    async fn seed(pool: &DatabasePool) {
        WorkflowRepository::create_with_nodes(pool, "wf-1", "dag", "s", "u", "T", "", "{}", &[])
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_events_are_totally_ordered() {
        let pool = test_pool().await;
        seed(&pool).await;

        for kind in ["workflow_started", "node_started", "node_completed"] {
            EventRepository::insert(&pool, "wf-1", kind, &json!({})).await.unwrap();
        }

        let events = EventRepository::list_for_workflow(&pool, "wf-1").await.unwrap();
        let kinds: Vec<&str> = events.iter().map(|e| e.event_type.as_str()).collect();
        assert_eq!(kinds, vec!["workflow_started", "node_started", "node_completed"]);
        assert!(events.windows(2).all(|w| w[0].id < w[1].id));
    }

    #[tokio::test]
    async fn test_insert_if_running_respects_terminal() {
        let pool = test_pool().await;
        seed(&pool).await;

        assert!(
            EventRepository::insert_if_running(&pool, "wf-1", "node_started", &json!({}))
                .await
                .unwrap()
        );

        WorkflowRepository::mark_failed(&pool, "wf-1", "cancelled").await.unwrap();
        assert!(
            !EventRepository::insert_if_running(&pool, "wf-1", "node_completed", &json!({}))
                .await
                .unwrap()
        );

        let events = EventRepository::list_for_workflow(&pool, "wf-1").await.unwrap();
        assert_eq!(events.len(), 1);
    }
}

//! Monitoring queries.
//!
//! Read-only aggregates over the live store; every query here is safe to
//! run concurrently with writing drivers.

use crate::db::connection::DatabasePool;
use serde::Serialize;

/// Workflow counts broken down by status.
#[derive(Debug, Clone, Default, Serialize)]
pub struct WorkflowStatistics {
    pub total: i64,
    pub pending: i64,
    pub running: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Per-DAG aggregate row.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DagAggregate {
    pub dag_id: String,
    pub total: i64,
    pub completed: i64,
    pub failed: i64,
}

/// Read-only monitoring surface.
pub struct MonitoringRepository;

impl MonitoringRepository {
    /// Count workflows, optionally filtered by status.
    pub async fn workflow_count(
        pool: &DatabasePool,
        status: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = match status {
            Some(status) => {
                sqlx::query_as("SELECT COUNT(*) FROM workflows WHERE status = ?")
                    .bind(status)
                    .fetch_one(pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM workflows")
                    .fetch_one(pool)
                    .await?
            }
        };
        Ok(row.0)
    }

    /// Counts for every status at once.
    pub async fn workflow_statistics(
        pool: &DatabasePool,
    ) -> Result<WorkflowStatistics, sqlx::Error> {
        let rows: Vec<(String, i64)> =
            sqlx::query_as("SELECT status, COUNT(*) FROM workflows GROUP BY status")
                .fetch_all(pool)
                .await?;

        let mut stats = WorkflowStatistics::default();
        for (status, count) in rows {
            stats.total += count;
            match status.as_str() {
                "pending" => stats.pending = count,
                "running" => stats.running = count,
                "completed" => stats.completed = count,
                "failed" => stats.failed = count,
                _ => {}
            }
        }
        Ok(stats)
    }

    /// Workflows created inside [start, end).
    pub async fn workflows_created_in_range(
        pool: &DatabasePool,
        start: &str,
        end: &str,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM workflows WHERE created_at >= ? AND created_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Workflows completed inside [start, end).
    pub async fn workflows_completed_in_range(
        pool: &DatabasePool,
        start: &str,
        end: &str,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM workflows
             WHERE status = 'completed' AND completed_at >= ? AND completed_at < ?",
        )
        .bind(start)
        .bind(end)
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Number of distinct users who have submitted workflows.
    pub async fn distinct_user_count(pool: &DatabasePool) -> Result<i64, sqlx::Error> {
        let row: (i64,) = sqlx::query_as(
            "SELECT COUNT(DISTINCT created_by) FROM workflows WHERE created_by IS NOT NULL",
        )
        .fetch_one(pool)
        .await?;
        Ok(row.0)
    }

    /// Per-DAG run totals.
    pub async fn dag_aggregates(pool: &DatabasePool) -> Result<Vec<DagAggregate>, sqlx::Error> {
        sqlx::query_as::<_, DagAggregate>(
            "SELECT dag_id,
                    COUNT(*) AS total,
                    SUM(CASE WHEN status = 'completed' THEN 1 ELSE 0 END) AS completed,
                    SUM(CASE WHEN status = 'failed' THEN 1 ELSE 0 END) AS failed
             FROM workflows GROUP BY dag_id ORDER BY dag_id",
        )
        .fetch_all(pool)
        .await
    }

    /// Pending HITL requests across all workflows.
    pub async fn pending_hitl_count(pool: &DatabasePool) -> Result<i64, sqlx::Error> {
        let row: (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM hitl_requests WHERE status = 'pending'")
                .fetch_one(pool)
                .await?;
        Ok(row.0)
    }

    /// Agent execution counts by status.
    pub async fn agent_execution_count(
        pool: &DatabasePool,
        status: Option<&str>,
    ) -> Result<i64, sqlx::Error> {
        let row: (i64,) = match status {
            Some(status) => {
                sqlx::query_as("SELECT COUNT(*) FROM agent_executions WHERE status = ?")
                    .bind(status)
                    .fetch_one(pool)
                    .await?
            }
            None => {
                sqlx::query_as("SELECT COUNT(*) FROM agent_executions")
                    .fetch_one(pool)
                    .await?
            }
        };
        Ok(row.0)
    }
}

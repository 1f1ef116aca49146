//! HITL request repository.
//!
//! Approve and reject are guarded on `status = 'pending'`, which is what
//! makes the orchestrator's HITL operations idempotent: the second call
//! affects zero rows and the caller reads back the prior outcome.

use crate::db::connection::DatabasePool;
use crate::db::models::HitlRequest;
use chrono::Utc;

/// Repository for HITL request rows.
pub struct HitlRepository;

impl HitlRepository {
    /// Create a pending request.
    pub async fn create(
        pool: &DatabasePool,
        request_id: &str,
        workflow_id: &str,
        node_id: &str,
        message: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "INSERT INTO hitl_requests (request_id, workflow_id, node_id, message,
                                        status, created_at)
             VALUES (?, ?, ?, ?, 'pending', ?)",
        )
        .bind(request_id)
        .bind(workflow_id)
        .bind(node_id)
        .bind(message)
        .bind(&now)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Get a request by its id.
    pub async fn get_by_request_id(
        pool: &DatabasePool,
        request_id: &str,
    ) -> Result<Option<HitlRequest>, sqlx::Error> {
        sqlx::query_as::<_, HitlRequest>("SELECT * FROM hitl_requests WHERE request_id = ?")
            .bind(request_id)
            .fetch_optional(pool)
            .await
    }

    /// Mark approved. Returns false when the request was not pending.
    pub async fn approve(
        pool: &DatabasePool,
        request_id: &str,
        user_id: &str,
        response: &str,
    ) -> Result<bool, sqlx::Error> {
        Self::respond(pool, request_id, user_id, response, "approved").await
    }

    /// Mark rejected. Returns false when the request was not pending.
    pub async fn reject(
        pool: &DatabasePool,
        request_id: &str,
        user_id: &str,
        reason: &str,
    ) -> Result<bool, sqlx::Error> {
        Self::respond(pool, request_id, user_id, reason, "rejected").await
    }

    async fn respond(
        pool: &DatabasePool,
        request_id: &str,
        user_id: &str,
        response: &str,
        status: &str,
    ) -> Result<bool, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        let done = sqlx::query(
            "UPDATE hitl_requests
             SET status = ?, responded_at = ?, responded_by = ?, response = ?
             WHERE request_id = ? AND status = 'pending'",
        )
        .bind(status)
        .bind(&now)
        .bind(user_id)
        .bind(response)
        .bind(request_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected() > 0)
    }

    /// Pending requests, optionally restricted to one workflow.
    pub async fn list_pending(
        pool: &DatabasePool,
        workflow_id: Option<&str>,
    ) -> Result<Vec<HitlRequest>, sqlx::Error> {
        match workflow_id {
            Some(id) => {
                sqlx::query_as::<_, HitlRequest>(
                    "SELECT * FROM hitl_requests
                     WHERE workflow_id = ? AND status = 'pending' ORDER BY id",
                )
                .bind(id)
                .fetch_all(pool)
                .await
            }
            None => {
                sqlx::query_as::<_, HitlRequest>(
                    "SELECT * FROM hitl_requests WHERE status = 'pending' ORDER BY id",
                )
                .fetch_all(pool)
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_pool;

    #[tokio::test]
    async fn test_approve_is_single_shot() {
        let pool = test_pool().await;
        HitlRepository::create(&pool, "req-1", "wf-1", "h", "Approve?")
            .await
            .unwrap();

        assert!(HitlRepository::approve(&pool, "req-1", "alice", "ok")
            .await
            .unwrap());
        // A second approval, or a late rejection, affects nothing.
        assert!(!HitlRepository::approve(&pool, "req-1", "bob", "me too")
            .await
            .unwrap());
        assert!(!HitlRepository::reject(&pool, "req-1", "bob", "nope")
            .await
            .unwrap());

        let request = HitlRepository::get_by_request_id(&pool, "req-1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.status, "approved");
        assert_eq!(request.responded_by.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn test_list_pending_filters_by_workflow() {
        let pool = test_pool().await;
        HitlRepository::create(&pool, "req-1", "wf-1", "h1", "m").await.unwrap();
        HitlRepository::create(&pool, "req-2", "wf-2", "h2", "m").await.unwrap();
        HitlRepository::reject(&pool, "req-2", "alice", "no").await.unwrap();

        let all = HitlRepository::list_pending(&pool, None).await.unwrap();
        assert_eq!(all.len(), 1);

        let for_wf1 = HitlRepository::list_pending(&pool, Some("wf-1")).await.unwrap();
        assert_eq!(for_wf1.len(), 1);
        let for_wf2 = HitlRepository::list_pending(&pool, Some("wf-2")).await.unwrap();
        assert!(for_wf2.is_empty());
    }
}

//! Session repository.

use crate::db::connection::DatabasePool;
use crate::db::models::Session;
use chrono::Utc;

/// Repository for session rows.
pub struct SessionRepository;

impl SessionRepository {
    /// Create an active session.
    pub async fn create(
        pool: &DatabasePool,
        session_id: &str,
        user_id: &str,
    ) -> Result<Session, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query_as::<_, Session>(
            "INSERT INTO sessions (session_id, user_id, status, created_at, updated_at)
             VALUES (?, ?, 'active', ?, ?) RETURNING *",
        )
        .bind(session_id)
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .fetch_one(pool)
        .await
    }

    /// Get a session by id.
    pub async fn get_by_id(
        pool: &DatabasePool,
        session_id: &str,
    ) -> Result<Option<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>("SELECT * FROM sessions WHERE session_id = ?")
            .bind(session_id)
            .fetch_optional(pool)
            .await
    }

    /// Attach the workflow spawned from this session.
    pub async fn set_workflow(
        pool: &DatabasePool,
        session_id: &str,
        workflow_id: &str,
    ) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query(
            "UPDATE sessions SET workflow_id = ?, updated_at = ? WHERE session_id = ?",
        )
        .bind(workflow_id)
        .bind(&now)
        .bind(session_id)
        .execute(pool)
        .await?;
        Ok(())
    }

    /// Sessions belonging to a user, newest first.
    pub async fn list_for_user(
        pool: &DatabasePool,
        user_id: &str,
    ) -> Result<Vec<Session>, sqlx::Error> {
        sqlx::query_as::<_, Session>(
            "SELECT * FROM sessions WHERE user_id = ? ORDER BY created_at DESC, session_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }
}

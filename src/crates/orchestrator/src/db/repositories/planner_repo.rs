//! Planner query surface.
//!
//! The planner collaborator writes these tables; the core only reads
//! them, and makes no assumption about whether they are populated.

use crate::db::connection::DatabasePool;
use crate::db::models::{Plan, PlannerConversation};

/// Read-only repository for planner rows.
pub struct PlannerRepository;

impl PlannerRepository {
    /// Get a plan by id.
    pub async fn get_plan(
        pool: &DatabasePool,
        plan_id: &str,
    ) -> Result<Option<Plan>, sqlx::Error> {
        sqlx::query_as::<_, Plan>("SELECT * FROM plans WHERE plan_id = ?")
            .bind(plan_id)
            .fetch_optional(pool)
            .await
    }

    /// Plans belonging to a user, newest first.
    pub async fn list_plans_for_user(
        pool: &DatabasePool,
        user_id: &str,
    ) -> Result<Vec<Plan>, sqlx::Error> {
        sqlx::query_as::<_, Plan>(
            "SELECT * FROM plans WHERE user_id = ? ORDER BY created_at DESC, plan_id",
        )
        .bind(user_id)
        .fetch_all(pool)
        .await
    }

    /// Conversation turns for a session, in order.
    pub async fn list_conversation(
        pool: &DatabasePool,
        session_id: &str,
    ) -> Result<Vec<PlannerConversation>, sqlx::Error> {
        sqlx::query_as::<_, PlannerConversation>(
            "SELECT * FROM planner_conversations WHERE session_id = ? ORDER BY id",
        )
        .bind(session_id)
        .fetch_all(pool)
        .await
    }
}

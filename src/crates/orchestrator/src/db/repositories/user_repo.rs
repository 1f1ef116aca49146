//! User repository.

use crate::db::connection::DatabasePool;
use crate::db::models::User;
use chrono::Utc;

/// Repository for user rows.
pub struct UserRepository;

impl UserRepository {
    /// Create a user.
    pub async fn create(
        pool: &DatabasePool,
        user_id: &str,
        username: &str,
        role: Option<&str>,
    ) -> Result<User, sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query_as::<_, User>(
            "INSERT INTO users (user_id, username, role, created_at)
             VALUES (?, ?, ?, ?) RETURNING *",
        )
        .bind(user_id)
        .bind(username)
        .bind(role)
        .bind(&now)
        .fetch_one(pool)
        .await
    }

    /// Get a user by id.
    pub async fn get_by_id(
        pool: &DatabasePool,
        user_id: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE user_id = ?")
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Get a user by username.
    pub async fn get_by_username(
        pool: &DatabasePool,
        username: &str,
    ) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(pool)
            .await
    }

    /// Stamp a login time.
    pub async fn touch_login(pool: &DatabasePool, user_id: &str) -> Result<(), sqlx::Error> {
        let now = Utc::now().to_rfc3339();
        sqlx::query("UPDATE users SET last_login = ? WHERE user_id = ?")
            .bind(&now)
            .bind(user_id)
            .execute(pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::test_pool;

    #[tokio::test]
    async fn test_create_and_lookup() {
        let pool = test_pool().await;
        UserRepository::create(&pool, "u-1", "alice", Some("admin"))
            .await
            .unwrap();

        let by_name = UserRepository::get_by_username(&pool, "alice")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(by_name.user_id, "u-1");
        assert_eq!(by_name.role.as_deref(), Some("admin"));

        UserRepository::touch_login(&pool, "u-1").await.unwrap();
        let user = UserRepository::get_by_id(&pool, "u-1").await.unwrap().unwrap();
        assert!(user.last_login.is_some());
    }
}

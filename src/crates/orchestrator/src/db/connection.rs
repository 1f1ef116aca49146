//! Database connection management.
//!
//! Wraps an sqlx SQLite pool. The default backing store is an embedded
//! file database; tests use `sqlite::memory:`.

use sqlx::sqlite::{SqlitePool, SqlitePoolOptions};
use std::sync::Arc;

/// Type alias for the database connection pool.
pub type DatabasePool = SqlitePool;

/// Database connection wrapper.
#[derive(Clone)]
pub struct DatabaseConnection {
    pool: Arc<DatabasePool>,
}

impl DatabaseConnection {
    /// Create a connection from a connection string
    /// (e.g. "sqlite:weft.db?mode=rwc" or "sqlite::memory:").
    pub async fn new(database_url: &str) -> Result<Self, sqlx::Error> {
        Self::with_max_connections(database_url, 5).await
    }

    /// Create a connection with a custom pool size.
    pub async fn with_max_connections(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, sqlx::Error> {
        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// Get a reference to the pool.
    pub fn pool(&self) -> &DatabasePool {
        &self.pool
    }

    /// Run embedded migrations.
    pub async fn run_migrations(&self) -> Result<(), sqlx::migrate::MigrateError> {
        sqlx::migrate!("./migrations").run(self.pool.as_ref()).await
    }

    /// Health check with a trivial query.
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").fetch_one(self.pool.as_ref()).await?;
        Ok(())
    }

    /// Close the pool.
    pub async fn close(self) {
        self.pool.close().await;
    }
}

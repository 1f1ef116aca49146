//! User row model. The core treats user identity as opaque; this table
//! exists for session tracking and monitoring aggregates.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub user_id: String,
    pub username: String,
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
    pub created_at: String,
    pub last_login: Option<String>,
}

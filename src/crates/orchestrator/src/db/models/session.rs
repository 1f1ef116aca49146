//! Session row model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A user session; workflows reference the session they were submitted
/// from.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Session {
    pub session_id: String,
    pub user_id: String,
    pub workflow_id: Option<String>,

    /// active, completed, abandoned.
    pub status: String,

    pub created_at: String,
    pub updated_at: String,
    pub completed_at: Option<String>,

    /// Free-form JSON metadata.
    pub metadata: Option<String>,
}

//! HITL request row model.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A pending, approved, or rejected human-in-the-loop request.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct HitlRequest {
    /// Autoincrement row id.
    pub id: i64,

    /// Unique request identifier (UUID string).
    pub request_id: String,

    pub workflow_id: String,
    pub node_id: String,

    /// Prompt shown to the approver.
    pub message: Option<String>,

    /// pending, approved, rejected.
    pub status: String,

    pub created_at: String,
    pub responded_at: Option<String>,

    /// User who responded.
    pub responded_by: Option<String>,

    /// Free-form response or rejection reason.
    pub response: Option<String>,
}

impl HitlRequest {
    /// True while the request still awaits a response.
    pub fn is_pending(&self) -> bool {
        self.status == "pending"
    }
}

//! Database row models.
//!
//! All timestamp fields are ISO-8601 strings (TEXT in SQLite) due to
//! sqlx and SQLite type limitations with `chrono::DateTime<Utc>`.

pub mod agent_execution;
pub mod hitl_request;
pub mod plan;
pub mod session;
pub mod user;
pub mod workflow;
pub mod workflow_event;
pub mod workflow_node;

pub use agent_execution::AgentExecution;
pub use hitl_request::HitlRequest;
pub use plan::{Plan, PlannerConversation};
pub use session::Session;
pub use user::User;
pub use workflow::Workflow;
pub use workflow_event::WorkflowEvent;
pub use workflow_node::WorkflowNode;

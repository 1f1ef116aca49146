//! Repository pattern implementations for database access.
//!
//! One repository per entity, static methods over the shared pool. The
//! workflow and node repositories enforce the one-shot terminal rule in
//! SQL: once a workflow is completed or failed, further transitions on
//! it (and on its node rows) affect zero rows.

pub mod agent_execution_repo;
pub mod event_repo;
pub mod hitl_repo;
pub mod monitoring_repo;
pub mod planner_repo;
pub mod session_repo;
pub mod user_repo;
pub mod workflow_node_repo;
pub mod workflow_repo;

pub use agent_execution_repo::AgentExecutionRepository;
pub use event_repo::EventRepository;
pub use hitl_repo::HitlRepository;
pub use monitoring_repo::{DagAggregate, MonitoringRepository, WorkflowStatistics};
pub use planner_repo::PlannerRepository;
pub use session_repo::SessionRepository;
pub use user_repo::UserRepository;
pub use workflow_node_repo::WorkflowNodeRepository;
pub use workflow_repo::{NodeSeed, WorkflowRepository};

#[cfg(test)]
pub(crate) async fn test_pool() -> crate::db::DatabasePool {
    let conn = crate::db::DatabaseConnection::new("sqlite::memory:")
        .await
        .unwrap();
    conn.run_migrations().await.unwrap();
    conn.pool().clone()
}

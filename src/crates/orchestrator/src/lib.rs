//! Workflow orchestration engine for weft.
//!
//! The orchestrator executes DAGs of agent, tool, and human-in-the-loop
//! nodes. A single driver task per workflow advances node states,
//! substitutes upstream results into node inputs, dispatches to the tool
//! and agent registries, and persists every transition to SQLite. HITL
//! nodes park the workflow until an external approval or rejection
//! re-enters the loop.

pub mod agents;
pub mod db;
pub mod engine;
pub mod substitution;

use thiserror::Error;

pub use agents::{AgentDescriptor, AgentRegistry, AgentResult, LlmUsed};
pub use db::{DatabaseConnection, DatabasePool};
pub use engine::{WorkflowOrchestrator, WorkflowStatus};

/// Errors surfaced by orchestrator operations.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The submitted graph failed validation (cycle, dangling edge, ...).
    #[error("Invalid graph: {0}")]
    InvalidGraph(#[from] dagcore::GraphError),

    /// No workflow row for the given id.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// The workflow exists but is no longer in the active map.
    #[error("Workflow not active: {0}")]
    WorkflowNotActive(String),

    /// No HITL request row for the given id.
    #[error("HITL request not found: {0}")]
    RequestNotFound(String),

    /// Store-level failure.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Serialization failure.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for orchestrator operations.
pub type Result<T> = std::result::Result<T, OrchestratorError>;

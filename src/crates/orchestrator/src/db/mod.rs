//! Database module for the orchestrator.
//!
//! Provides the connection pool wrapper, row models, and repositories
//! for persistent storage of workflows, nodes, events, HITL requests,
//! agent executions, and the auxiliary user/session/planner tables.

pub mod connection;
pub mod models;
pub mod repositories;

pub use connection::{DatabaseConnection, DatabasePool};

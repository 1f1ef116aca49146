//! Error types for graph construction and DAG loading.

use thiserror::Error;

/// Result type for dagcore operations.
pub type Result<T> = std::result::Result<T, GraphError>;

/// Errors raised while building, validating, or loading graphs.
#[derive(Debug, Error)]
pub enum GraphError {
    /// The graph contains a dependency cycle.
    #[error("Graph contains a cycle")]
    Cycle,

    /// Two nodes share the same id.
    #[error("Duplicate node id: {0}")]
    DuplicateNode(String),

    /// An edge or dependency references a node that does not exist.
    #[error("Unknown node referenced: {0}")]
    UnknownNode(String),

    /// A declared start node does not exist or has dependencies.
    #[error("Invalid start node: {0}")]
    InvalidStartNode(String),

    /// A node declared an unrecognized node type.
    #[error("Unknown node type: {0}")]
    UnknownNodeType(String),

    /// The definition is structurally invalid.
    #[error("Invalid DAG definition: {0}")]
    InvalidDefinition(String),

    /// Serialization or deserialization failed.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem error while reading or writing definitions.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

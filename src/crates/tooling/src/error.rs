//! Error types for tool loading and execution.

use thiserror::Error;

/// Result type for tooling operations.
pub type Result<T> = std::result::Result<T, ToolError>;

/// Errors that can occur when loading or executing tools.
#[derive(Debug, Error)]
pub enum ToolError {
    /// No tool registered under the requested name.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// A descriptor file is malformed or names an unknown factory.
    #[error("Invalid tool descriptor: {0}")]
    InvalidDescriptor(String),

    /// Arguments rejected by the tool's input schema.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// Remote endpoint returned a non-success status.
    #[error("Remote tool call failed with status {status}: {detail}")]
    RemoteStatus { status: u16, detail: String },

    /// Remote endpoint unreachable or timed out.
    #[error("Remote tool transport error: {0}")]
    RemoteTransport(String),

    /// Remote endpoint answered 200 with a body that is not JSON.
    #[error("Remote tool returned malformed JSON: {0}")]
    MalformedResponse(String),

    /// Tool-level execution failure.
    #[error("{0}")]
    ExecutionFailed(String),

    /// Filesystem error inside a tool.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

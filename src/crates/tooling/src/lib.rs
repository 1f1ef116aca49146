//! Tool registry and tool implementations for weft.
//!
//! Tools are the deterministic leaves of a workflow: a node binds to a
//! tool by name and the registry dispatches the call. Two descriptor
//! families exist:
//!
//! - **local** tools, instantiated through a compile-time factory table
//!   (descriptor files name a factory key, never a code path)
//! - **remote** tools, thin adapters that POST to an MCP-style endpoint
//!
//! Every execution returns a uniform envelope (`success`, `result` or
//! `error`, tool name, timestamp) so the orchestrator never has to
//! special-case a tool failure.

pub mod builtin;
pub mod descriptor;
pub mod error;
pub mod registry;
pub mod remote;
pub mod tool;

pub use descriptor::{LocalToolDescriptor, RemoteServerDescriptor, RemoteToolSpec};
pub use error::{Result, ToolError};
pub use registry::{RemoteServerStatus, ToolFactory, ToolListing, ToolRegistry};
pub use remote::RemoteTool;
pub use tool::{ExecutionEnvelope, Tool, ToolSchema};

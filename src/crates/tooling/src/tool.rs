//! The tool trait and the uniform execution envelope.

use crate::error::Result;
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;

/// Schema description of a tool, surfaced to planners and UIs.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// A callable tool. Implementations must be cheap to clone behind an
/// `Arc`; a registry reload does not interrupt executions already
/// holding a reference.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Registered tool name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str;

    /// Execute with the given arguments object.
    async fn execute(&self, args: Value) -> Result<Value>;

    /// Schema describing the tool's inputs.
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: None,
        }
    }
}

/// Uniform result envelope for every tool execution.
#[derive(Debug, Clone, Serialize)]
pub struct ExecutionEnvelope {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub tool_name: String,
    pub executed_at: String,
}

impl ExecutionEnvelope {
    /// Successful execution.
    pub fn success(tool_name: &str, result: Value) -> Self {
        Self {
            success: true,
            result: Some(result),
            error: None,
            tool_name: tool_name.to_string(),
            executed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Failed execution.
    pub fn failure(tool_name: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            result: None,
            error: Some(error.into()),
            tool_name: tool_name.to_string(),
            executed_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// The envelope for a name that resolved to nothing.
    pub fn not_found(tool_name: &str) -> Self {
        Self::failure(tool_name, format!("Tool not found: {}", tool_name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_shapes() {
        let ok = ExecutionEnvelope::success("echo", json!({"msg": "hi"}));
        assert!(ok.success);
        assert!(ok.error.is_none());
        assert_eq!(ok.tool_name, "echo");

        let missing = ExecutionEnvelope::not_found("ghost");
        assert!(!missing.success);
        assert_eq!(missing.error.as_deref(), Some("Tool not found: ghost"));
    }
}

//! Echo tool: returns its arguments unchanged.
//!
//! Mostly useful for wiring tests and smoke-checking placeholder
//! substitution in workflows.

use crate::descriptor::LocalToolDescriptor;
use crate::error::Result;
use crate::tool::Tool;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Tool that echoes its arguments back as the result.
pub struct EchoTool {
    name: String,
    description: String,
}

impl EchoTool {
    /// Factory entry for the registry table.
    pub fn factory(descriptor: &LocalToolDescriptor) -> Result<Arc<dyn Tool>> {
        Ok(Arc::new(Self {
            name: descriptor.name.clone(),
            description: if descriptor.description.is_empty() {
                "Echo arguments back".to_string()
            } else {
                descriptor.description.clone()
            },
        }))
    }
}

#[async_trait]
impl Tool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        Ok(args)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_echo_returns_arguments() {
        let descriptor: LocalToolDescriptor =
            serde_json::from_str(r#"{"name": "echo", "module": "echo"}"#).unwrap();
        let tool = EchoTool::factory(&descriptor).unwrap();

        let out = tool.execute(json!({"msg": "hi"})).await.unwrap();
        assert_eq!(out["msg"], "hi");
    }
}

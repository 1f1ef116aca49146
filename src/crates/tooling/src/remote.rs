//! Remote tool adapter.
//!
//! A remote tool is a thin HTTP client around an MCP-style server. The
//! wire protocol is `POST <mcp_url>/execute` with
//! `{"tool": <name>, "arguments": <args>}`; a 200 response body is the
//! tool's result JSON. Arguments are validated against the descriptor's
//! `input_schema` before anything leaves the process. The adapter never
//! retries; retry policy belongs to callers.

use crate::descriptor::RemoteToolSpec;
use crate::error::{Result, ToolError};
use crate::tool::{Tool, ToolSchema};
use async_trait::async_trait;
use jsonschema::JSONSchema;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

/// Default timeout for a remote tool call.
pub const DEFAULT_REMOTE_TIMEOUT: Duration = Duration::from_secs(30);

/// A tool backed by a remote MCP-style server.
pub struct RemoteTool {
    /// Registered name (`<server>_<tool>`).
    name: String,
    description: String,
    mcp_url: String,
    /// Name the remote server knows the tool by.
    remote_name: String,
    input_schema: Option<Value>,
    compiled_schema: Option<Arc<JSONSchema>>,
    client: reqwest::Client,
}

impl RemoteTool {
    /// Build a remote tool from its server URL and spec. Fails when the
    /// declared input schema is not itself valid JSON Schema.
    pub fn new(
        server_name: &str,
        mcp_url: impl Into<String>,
        spec: &RemoteToolSpec,
        timeout: Duration,
    ) -> Result<Self> {
        let compiled_schema = match &spec.input_schema {
            Some(schema) => Some(Arc::new(JSONSchema::compile(schema).map_err(|e| {
                ToolError::InvalidDescriptor(format!(
                    "input_schema for {} does not compile: {}",
                    spec.name, e
                ))
            })?)),
            None => None,
        };

        Ok(Self {
            name: format!("{}_{}", server_name, spec.name),
            description: spec.description.clone(),
            mcp_url: mcp_url.into(),
            remote_name: spec.name.clone(),
            input_schema: spec.input_schema.clone(),
            compiled_schema,
            client: reqwest::Client::builder()
                .timeout(timeout)
                .build()
                .expect("Failed to create HTTP client"),
        })
    }

    fn validate_args(&self, args: &Value) -> Result<()> {
        if let Some(schema) = &self.compiled_schema {
            if let Err(errors) = schema.validate(args) {
                let detail = errors
                    .map(|e| e.to_string())
                    .collect::<Vec<_>>()
                    .join("; ");
                return Err(ToolError::InvalidArguments(detail));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        self.validate_args(&args)?;

        let payload = json!({
            "tool": self.remote_name,
            "arguments": args,
        });

        let response = self
            .client
            .post(format!("{}/execute", self.mcp_url))
            .json(&payload)
            .send()
            .await
            .map_err(|e| ToolError::RemoteTransport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(ToolError::RemoteStatus {
                status: status.as_u16(),
                detail,
            });
        }

        // A 200 with a non-JSON body is a tool failure, not a crash.
        let body = response
            .text()
            .await
            .map_err(|e| ToolError::RemoteTransport(e.to_string()))?;
        serde_json::from_str(&body).map_err(|e| ToolError::MalformedResponse(e.to_string()))
    }

    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.name.clone(),
            description: self.description.clone(),
            input_schema: self.input_schema.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec_with_schema() -> RemoteToolSpec {
        serde_json::from_value(json!({
            "name": "get_stock_price",
            "description": "quote",
            "input_schema": {
                "type": "object",
                "required": ["symbol"],
                "properties": {"symbol": {"type": "string"}}
            }
        }))
        .unwrap()
    }

    #[test]
    fn test_registered_name_is_prefixed() {
        let tool = RemoteTool::new(
            "finance",
            "http://localhost:8000",
            &spec_with_schema(),
            DEFAULT_REMOTE_TIMEOUT,
        )
        .unwrap();
        assert_eq!(tool.name(), "finance_get_stock_price");
        assert!(tool.schema().input_schema.is_some());
    }

    #[test]
    fn test_args_validated_against_schema() {
        let tool = RemoteTool::new(
            "finance",
            "http://localhost:8000",
            &spec_with_schema(),
            DEFAULT_REMOTE_TIMEOUT,
        )
        .unwrap();

        assert!(tool.validate_args(&json!({"symbol": "ACME"})).is_ok());
        assert!(matches!(
            tool.validate_args(&json!({"symbol": 42})),
            Err(ToolError::InvalidArguments(_))
        ));
        assert!(matches!(
            tool.validate_args(&json!({})),
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_transport_error() {
        // Nothing listens on this port; the call must come back as a
        // typed error, never a panic.
        let tool = RemoteTool::new(
            "dead",
            "http://127.0.0.1:59999",
            &RemoteToolSpec {
                name: "noop".to_string(),
                description: String::new(),
                input_schema: None,
            },
            Duration::from_millis(250),
        )
        .unwrap();

        let err = tool.execute(json!({})).await.unwrap_err();
        assert!(matches!(err, ToolError::RemoteTransport(_)));
    }
}

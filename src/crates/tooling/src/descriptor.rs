//! Tool descriptor file formats.
//!
//! Local descriptor:
//!
//! ```json
//! { "name": "echo", "description": "Echo arguments back",
//!   "module": "echo", "config": {}, "enabled": true }
//! ```
//!
//! Remote (MCP-style) descriptor:
//!
//! ```json
//! { "name": "finance", "mcp_url": "http://localhost:8000",
//!   "tool_description": { "tools": [
//!       { "name": "get_stock_price", "description": "...",
//!         "input_schema": {"type": "object"} } ] } }
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Descriptor of a locally-instantiated tool. `module` names an entry in
/// the registry's factory table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub module: String,
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default = "enabled_default")]
    pub enabled: bool,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn enabled_default() -> bool {
    true
}

/// One tool exposed by a remote server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteToolSpec {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_schema: Option<Value>,
}

/// Descriptor of a remote MCP-style tool server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteServerDescriptor {
    pub name: String,
    pub mcp_url: String,
    #[serde(default)]
    pub tool_description: RemoteToolList,
}

/// The `tool_description` block of a remote descriptor.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RemoteToolList {
    #[serde(default)]
    pub tools: Vec<RemoteToolSpec>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_descriptor_defaults() {
        let desc: LocalToolDescriptor =
            serde_json::from_str(r#"{"name": "echo", "module": "echo"}"#).unwrap();
        assert!(desc.enabled);
        assert!(desc.config.is_object());
    }

    #[test]
    fn test_remote_descriptor_parses() {
        let desc: RemoteServerDescriptor = serde_json::from_str(
            r#"{"name": "finance", "mcp_url": "http://localhost:8000",
                "tool_description": {"tools": [
                    {"name": "get_stock_price", "description": "quote",
                     "input_schema": {"type": "object",
                                      "required": ["symbol"],
                                      "properties": {"symbol": {"type": "string"}}}}
                ]}}"#,
        )
        .unwrap();
        assert_eq!(desc.tool_description.tools.len(), 1);
        assert_eq!(desc.tool_description.tools[0].name, "get_stock_price");
    }
}

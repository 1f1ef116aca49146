//! Declarative DAG definition files.
//!
//! A definition file is the on-disk JSON form a DAG is authored in:
//!
//! ```json
//! { "dag_id": "...", "name": "...", "description": "...",
//!   "parameters": { "codebase_path": {"description": "...", "required": true, "type": "string"} },
//!   "start_nodes": ["scan"],
//!   "nodes": [ { "node_id": "scan", "node_type": "tool",
//!                "config": {"tool_name": "filesystem"}, "dependencies": [] } ] }
//! ```
//!
//! Definitions are validated before a `Graph` is ever materialized from
//! them; a cyclic or dangling definition never reaches the orchestrator.

use crate::error::{GraphError, Result};
use crate::graph::{Edge, Graph, Node, NodeKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::collections::HashSet;

/// Declared parameter of a DAG (consumed by callers; the engine itself
/// does not interpolate parameters).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParameterSpec {
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub required: bool,
    #[serde(default, rename = "type")]
    pub param_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
}

/// One node entry in a definition file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeDefinition {
    pub node_id: String,
    pub node_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,
    #[serde(default = "empty_object")]
    pub config: Value,
    #[serde(default)]
    pub dependencies: Vec<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

/// A complete DAG definition as parsed from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DagDefinition {
    pub dag_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterSpec>,
    #[serde(default)]
    pub start_nodes: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDefinition>,
}

impl DagDefinition {
    /// Parse a definition from its JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize back to pretty JSON (the on-disk form).
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Structural validation: non-empty dag id, unique node ids, known
    /// node types, dependencies that reference declared nodes, and an
    /// acyclic dependency relation.
    pub fn validate(&self) -> Result<()> {
        if self.dag_id.trim().is_empty() {
            return Err(GraphError::InvalidDefinition(
                "dag_id must not be empty".to_string(),
            ));
        }

        let mut seen: HashSet<&str> = HashSet::new();
        for node in &self.nodes {
            if !seen.insert(node.node_id.as_str()) {
                return Err(GraphError::DuplicateNode(node.node_id.clone()));
            }
            NodeKind::parse(&node.node_type)?;
        }

        for node in &self.nodes {
            for dep in &node.dependencies {
                if !seen.contains(dep.as_str()) {
                    return Err(GraphError::UnknownNode(dep.clone()));
                }
            }
        }

        // Building the graph also checks start nodes and acyclicity.
        self.build_graph().map(|_| ())
    }

    /// Materialize a fresh `Graph` instance from this definition.
    pub fn build_graph(&self) -> Result<Graph> {
        let mut graph = Graph::new(&self.dag_id)
            .with_name(if self.name.is_empty() {
                self.dag_id.clone()
            } else {
                self.name.clone()
            })
            .with_description(&self.description);

        for def in &self.nodes {
            let mut node = Node::new(&def.node_id, NodeKind::parse(&def.node_type)?)
                .with_config(def.config.clone());
            node.agent_id = def.agent_id.clone();
            graph.add_node(node)?;
        }

        for def in &self.nodes {
            for dep in &def.dependencies {
                graph.add_edge(Edge::new(dep.clone(), def.node_id.clone()))?;
            }
        }

        graph.start_nodes = self.start_nodes.clone();
        graph.validate()?;
        Ok(graph)
    }
}

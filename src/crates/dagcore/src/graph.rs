//! In-memory DAG model for workflow execution.
//!
//! A `Graph` is a set of nodes keyed by id plus the edges between them.
//! Edges are stored both as an explicit list and as per-node dependency /
//! dependent sets, which is what readiness computation operates on.
//! Node and edge collections use ordered containers so the canonical JSON
//! form is stable across serialize/deserialize round-trips.

use crate::error::{GraphError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::{BTreeMap, BTreeSet, HashSet, VecDeque};

/// Execution status of a single node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    /// Not yet eligible to run.
    Pending,
    /// Dependencies satisfied, awaiting dispatch.
    Ready,
    /// Currently executing (or parked waiting for a human).
    Running,
    /// Finished successfully.
    Completed,
    /// Finished with an error.
    Failed,
    /// Skipped by a decision or recovery policy.
    Skipped,
}

impl NodeStatus {
    /// Stable string form used in database rows and events.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeStatus::Pending => "pending",
            NodeStatus::Ready => "ready",
            NodeStatus::Running => "running",
            NodeStatus::Completed => "completed",
            NodeStatus::Failed => "failed",
            NodeStatus::Skipped => "skipped",
        }
    }

    /// True once the node can never run again.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            NodeStatus::Completed | NodeStatus::Failed | NodeStatus::Skipped
        )
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dispatch category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Dispatched to the agent registry (LLM-backed).
    Agent,
    /// Dispatched to the tool registry.
    Tool,
    /// Parks the workflow awaiting external approval.
    HumanInLoop,
    /// Reserved; treated as passthrough.
    Decision,
}

impl NodeKind {
    /// Stable string form matching the definition file format.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeKind::Agent => "agent",
            NodeKind::Tool => "tool",
            NodeKind::HumanInLoop => "human_in_loop",
            NodeKind::Decision => "decision",
        }
    }

    /// Parse the definition-file spelling of a node type.
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "agent" => Ok(NodeKind::Agent),
            "tool" => Ok(NodeKind::Tool),
            "human_in_loop" => Ok(NodeKind::HumanInLoop),
            "decision" => Ok(NodeKind::Decision),
            other => Err(GraphError::UnknownNodeType(other.to_string())),
        }
    }
}

impl std::fmt::Display for NodeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single node in the DAG.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    /// Stable id, unique within the graph.
    pub node_id: String,

    /// Dispatch category.
    #[serde(rename = "node_type")]
    pub kind: NodeKind,

    /// Agent binding for agent nodes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    /// Free-form configuration, interpreted by kind.
    #[serde(default = "empty_object")]
    pub config: Value,

    /// Current execution status.
    #[serde(default = "default_status")]
    pub status: NodeStatus,

    /// Result value once completed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    /// Error message once failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Ids that must complete (or be skipped) before this node may run.
    #[serde(default)]
    pub dependencies: BTreeSet<String>,

    /// Reverse of `dependencies`, maintained by `Graph::add_edge`.
    #[serde(default)]
    pub dependents: BTreeSet<String>,
}

fn empty_object() -> Value {
    Value::Object(serde_json::Map::new())
}

fn default_status() -> NodeStatus {
    NodeStatus::Pending
}

impl Node {
    /// Create a new pending node.
    pub fn new(node_id: impl Into<String>, kind: NodeKind) -> Self {
        Self {
            node_id: node_id.into(),
            kind,
            agent_id: None,
            config: empty_object(),
            status: NodeStatus::Pending,
            result: None,
            error: None,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }

    /// Set the agent binding.
    pub fn with_agent_id(mut self, agent_id: impl Into<String>) -> Self {
        self.agent_id = Some(agent_id.into());
        self
    }

    /// Set the configuration object.
    pub fn with_config(mut self, config: Value) -> Self {
        self.config = config;
        self
    }

    /// Check whether every dependency is in `completed`.
    pub fn is_ready(&self, completed: &HashSet<String>) -> bool {
        self.dependencies.iter().all(|d| completed.contains(d))
    }
}

/// A directed edge. The optional condition is reserved for future guard
/// evaluation and is never interpreted by the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from_node: String,
    pub to_node: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<String>,
}

impl Edge {
    /// Create an unconditioned edge.
    pub fn new(from_node: impl Into<String>, to_node: impl Into<String>) -> Self {
        Self {
            from_node: from_node.into(),
            to_node: to_node.into(),
            condition: None,
        }
    }
}

/// A directed acyclic graph of workflow nodes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    /// Graph identity (usually the dag id it was materialized from).
    pub graph_id: String,

    /// Human-readable name.
    #[serde(default)]
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Nodes keyed by id. BTreeMap keeps serialization order stable.
    pub nodes: BTreeMap<String, Node>,

    /// All edges, in insertion order.
    #[serde(default)]
    pub edges: Vec<Edge>,

    /// Explicit start set. Advisory: a node with no dependencies is
    /// eligible whether or not it is listed here.
    #[serde(default)]
    pub start_nodes: Vec<String>,
}

impl Graph {
    /// Create an empty graph.
    pub fn new(graph_id: impl Into<String>) -> Self {
        Self {
            graph_id: graph_id.into(),
            name: String::new(),
            description: String::new(),
            nodes: BTreeMap::new(),
            edges: Vec::new(),
            start_nodes: Vec::new(),
        }
    }

    /// Set the graph name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the graph description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Add a node. Fails on a duplicate id.
    pub fn add_node(&mut self, node: Node) -> Result<()> {
        if self.nodes.contains_key(&node.node_id) {
            return Err(GraphError::DuplicateNode(node.node_id));
        }
        self.nodes.insert(node.node_id.clone(), node);
        Ok(())
    }

    /// Add an edge and update both endpoint dependency/dependent sets.
    /// Fails if either endpoint is missing.
    pub fn add_edge(&mut self, edge: Edge) -> Result<()> {
        if !self.nodes.contains_key(&edge.from_node) {
            return Err(GraphError::UnknownNode(edge.from_node));
        }
        if !self.nodes.contains_key(&edge.to_node) {
            return Err(GraphError::UnknownNode(edge.to_node));
        }

        if let Some(to) = self.nodes.get_mut(&edge.to_node) {
            to.dependencies.insert(edge.from_node.clone());
        }
        if let Some(from) = self.nodes.get_mut(&edge.from_node) {
            from.dependents.insert(edge.to_node.clone());
        }
        self.edges.push(edge);
        Ok(())
    }

    /// Get a node by id.
    pub fn get_node(&self, node_id: &str) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// Get a mutable node by id.
    pub fn get_node_mut(&mut self, node_id: &str) -> Option<&mut Node> {
        self.nodes.get_mut(node_id)
    }

    /// Start nodes: the explicit set when non-empty, otherwise every node
    /// with an empty dependency set.
    pub fn get_start_nodes(&self) -> Vec<&Node> {
        if !self.start_nodes.is_empty() {
            self.start_nodes
                .iter()
                .filter_map(|id| self.nodes.get(id))
                .collect()
        } else {
            self.nodes
                .values()
                .filter(|n| n.dependencies.is_empty())
                .collect()
        }
    }

    /// Every PENDING node whose dependencies are all in `completed`.
    pub fn get_ready_nodes(&self, completed: &HashSet<String>) -> Vec<&Node> {
        self.nodes
            .values()
            .filter(|n| n.status == NodeStatus::Pending && n.is_ready(completed))
            .collect()
    }

    /// Topological order via Kahn's algorithm. Returns an empty vec when
    /// the graph contains a cycle.
    pub fn topological_sort(&self) -> Vec<String> {
        let mut in_degree: BTreeMap<&str, usize> = self
            .nodes
            .iter()
            .map(|(id, node)| (id.as_str(), node.dependencies.len()))
            .collect();

        let mut queue: VecDeque<&str> = in_degree
            .iter()
            .filter(|(_, d)| **d == 0)
            .map(|(id, _)| *id)
            .collect();

        let mut sorted = Vec::with_capacity(self.nodes.len());
        while let Some(id) = queue.pop_front() {
            sorted.push(id.to_string());
            if let Some(node) = self.nodes.get(id) {
                for dep in &node.dependents {
                    if let Some(d) = in_degree.get_mut(dep.as_str()) {
                        *d -= 1;
                        if *d == 0 {
                            queue.push_back(dep.as_str());
                        }
                    }
                }
            }
        }

        if sorted.len() == self.nodes.len() {
            sorted
        } else {
            Vec::new()
        }
    }

    /// Cycle check via DFS with a recursion stack.
    pub fn has_cycle(&self) -> bool {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut stack: HashSet<&str> = HashSet::new();

        fn visit<'a>(
            graph: &'a Graph,
            id: &'a str,
            visited: &mut HashSet<&'a str>,
            stack: &mut HashSet<&'a str>,
        ) -> bool {
            visited.insert(id);
            stack.insert(id);

            if let Some(node) = graph.nodes.get(id) {
                for dep in &node.dependents {
                    if !visited.contains(dep.as_str()) {
                        if visit(graph, dep, visited, stack) {
                            return true;
                        }
                    } else if stack.contains(dep.as_str()) {
                        return true;
                    }
                }
            }

            stack.remove(id);
            false
        }

        for id in self.nodes.keys() {
            if !visited.contains(id.as_str()) && visit(self, id, &mut visited, &mut stack) {
                return true;
            }
        }
        false
    }

    /// Structural validation: edge endpoints exist, the graph is acyclic,
    /// and every explicit start node exists with no dependencies.
    pub fn validate(&self) -> Result<()> {
        for edge in &self.edges {
            if !self.nodes.contains_key(&edge.from_node) {
                return Err(GraphError::UnknownNode(edge.from_node.clone()));
            }
            if !self.nodes.contains_key(&edge.to_node) {
                return Err(GraphError::UnknownNode(edge.to_node.clone()));
            }
        }

        for start in &self.start_nodes {
            match self.nodes.get(start) {
                Some(node) if node.dependencies.is_empty() => {}
                _ => return Err(GraphError::InvalidStartNode(start.clone())),
            }
        }

        if self.has_cycle() {
            return Err(GraphError::Cycle);
        }
        Ok(())
    }

    /// Canonical JSON value form.
    pub fn to_value(&self) -> Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Canonical JSON string form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Rebuild from the canonical JSON string form.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn diamond() -> Graph {
        let mut g = Graph::new("diamond");
        for id in ["s", "p1", "p2", "j"] {
            g.add_node(Node::new(id, NodeKind::Tool)).unwrap();
        }
        g.add_edge(Edge::new("s", "p1")).unwrap();
        g.add_edge(Edge::new("s", "p2")).unwrap();
        g.add_edge(Edge::new("p1", "j")).unwrap();
        g.add_edge(Edge::new("p2", "j")).unwrap();
        g
    }

    #[test]
    fn test_add_edge_updates_both_sets() {
        let g = diamond();
        assert!(g.nodes["j"].dependencies.contains("p1"));
        assert!(g.nodes["j"].dependencies.contains("p2"));
        assert!(g.nodes["s"].dependents.contains("p1"));
    }

    #[test]
    fn test_duplicate_node_rejected() {
        let mut g = Graph::new("g");
        g.add_node(Node::new("a", NodeKind::Tool)).unwrap();
        let err = g.add_node(Node::new("a", NodeKind::Agent)).unwrap_err();
        assert!(matches!(err, GraphError::DuplicateNode(_)));
    }

    #[test]
    fn test_edge_to_missing_node_rejected() {
        let mut g = Graph::new("g");
        g.add_node(Node::new("a", NodeKind::Tool)).unwrap();
        let err = g.add_edge(Edge::new("a", "ghost")).unwrap_err();
        assert!(matches!(err, GraphError::UnknownNode(_)));
    }

    #[test]
    fn test_start_nodes_default_to_no_dependencies() {
        let g = diamond();
        let starts = g.get_start_nodes();
        assert_eq!(starts.len(), 1);
        assert_eq!(starts[0].node_id, "s");
    }

    #[test]
    fn test_ready_nodes_follow_completion() {
        let g = diamond();
        let mut completed = HashSet::new();

        let ready: Vec<_> = g
            .get_ready_nodes(&completed)
            .iter()
            .map(|n| n.node_id.clone())
            .collect();
        assert_eq!(ready, vec!["s"]);

        completed.insert("s".to_string());
        // s is still Pending in this graph; a real driver marks it first.
        let ready: Vec<_> = g
            .get_ready_nodes(&completed)
            .iter()
            .map(|n| n.node_id.clone())
            .collect();
        assert!(ready.contains(&"p1".to_string()));
        assert!(ready.contains(&"p2".to_string()));
        assert!(!ready.contains(&"j".to_string()));
    }

    #[test]
    fn test_topological_sort_diamond() {
        let g = diamond();
        let order = g.topological_sort();
        assert_eq!(order.len(), 4);
        let pos = |id: &str| order.iter().position(|n| n == id).unwrap();
        assert!(pos("s") < pos("p1"));
        assert!(pos("s") < pos("p2"));
        assert!(pos("p1") < pos("j"));
        assert!(pos("p2") < pos("j"));
    }

    #[test]
    fn test_cycle_detected() {
        let mut g = Graph::new("cyclic");
        g.add_node(Node::new("a", NodeKind::Tool)).unwrap();
        g.add_node(Node::new("b", NodeKind::Tool)).unwrap();
        g.add_edge(Edge::new("a", "b")).unwrap();
        g.add_edge(Edge::new("b", "a")).unwrap();

        assert!(g.has_cycle());
        assert!(g.topological_sort().is_empty());
        assert!(matches!(g.validate(), Err(GraphError::Cycle)));
    }

    #[test]
    fn test_validate_rejects_start_node_with_dependencies() {
        let mut g = diamond();
        g.start_nodes = vec!["j".to_string()];
        assert!(matches!(
            g.validate(),
            Err(GraphError::InvalidStartNode(_))
        ));
    }

    #[test]
    fn test_json_round_trip_is_stable() {
        let mut g = diamond();
        g.get_node_mut("s").unwrap().result = Some(json!({"files": ["a.rs", "b.rs"]}));
        g.get_node_mut("s").unwrap().status = NodeStatus::Completed;

        let first = g.to_json().unwrap();
        let reparsed = Graph::from_json(&first).unwrap();
        let second = reparsed.to_json().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_status_strings() {
        assert_eq!(NodeStatus::Pending.as_str(), "pending");
        assert_eq!(NodeStatus::Completed.as_str(), "completed");
        assert!(NodeStatus::Skipped.is_terminal());
        assert!(!NodeStatus::Running.is_terminal());
    }
}

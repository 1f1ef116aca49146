//! Graph model and DAG registry for weft workflows.
//!
//! This crate provides the building blocks the orchestrator executes:
//!
//! - `graph` - the in-memory DAG (nodes, edges, ready-set computation,
//!   cycle detection, canonical JSON serialization)
//! - `definition` - the declarative DAG definition file format and its
//!   validation rules
//! - `registry` - a directory-backed registry of DAG definitions with
//!   atomic on-disk mutations
//! - `generator` - dynamic generation of documentation DAGs from section
//!   templates

pub mod definition;
pub mod error;
pub mod generator;
pub mod graph;
pub mod registry;

pub use definition::{DagDefinition, NodeDefinition, ParameterSpec};
pub use error::{GraphError, Result};
pub use generator::{DocTemplate, DynamicDagGenerator, TemplateSection};
pub use graph::{Edge, Graph, Node, NodeKind, NodeStatus};
pub use registry::{DagRegistry, DagSummary, LoadError};

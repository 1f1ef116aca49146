//! Dynamic generation of documentation DAGs from section templates.
//!
//! A documentation template lists sections (with optional subsections);
//! the generator expands it into a definition with a fixed preprocessing
//! chain, one drafting node per top-level section, and an assembly
//! fan-in. The resulting definition adapts automatically when the
//! template changes.

use crate::definition::{DagDefinition, NodeDefinition, ParameterSpec};
use crate::error::{GraphError, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

/// Section ids always treated as top-level regardless of title shape.
const SPECIAL_H1_IDS: &[&str] = &["executive_summary", "conclusion", "introduction"];

static NUMBERED_TITLE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.").unwrap());

/// One section of a documentation template.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TemplateSection {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub subsections: Vec<TemplateSection>,
}

/// A documentation template: named, with an ordered section list.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocTemplate {
    pub name: String,
    #[serde(default)]
    pub sections: Vec<TemplateSection>,
}

impl DocTemplate {
    /// Parse a template from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Expands documentation templates into DAG definitions.
pub struct DynamicDagGenerator;

impl DynamicDagGenerator {
    /// Generate a complete documentation DAG from `template`.
    ///
    /// The shape is fixed: `scan_codebase` -> `parse_all_files` ->
    /// `generate_file_summaries`, then one `draft_<id>` node per
    /// top-level section, a fan-in `assemble_document`, and a terminal
    /// `write_final_doc`.
    pub fn generate_documentation_dag(
        template: &DocTemplate,
        dag_id: Option<&str>,
    ) -> Result<DagDefinition> {
        if template.name.trim().is_empty() {
            return Err(GraphError::InvalidDefinition(
                "template name must not be empty".to_string(),
            ));
        }

        let dag_id = dag_id
            .map(str::to_string)
            .unwrap_or_else(|| format!("{}_generated_dag", slug(&template.name)));

        let h1_sections = Self::extract_h1_sections(template);
        debug!(
            "Template {} expanded to {} top-level sections",
            template.name,
            h1_sections.len()
        );

        let mut nodes = Self::preprocessing_nodes();
        nodes.extend(Self::section_nodes(&h1_sections));
        nodes.extend(Self::assembly_nodes(&h1_sections, &dag_id));

        let def = DagDefinition {
            dag_id: dag_id.clone(),
            name: format!("Dynamic {}", template.name),
            description: format!(
                "Auto-generated from template: {}. Adapts to template changes automatically.",
                template.name
            ),
            parameters: Self::parameters(&dag_id, &template.name),
            start_nodes: vec!["scan_codebase".to_string()],
            nodes,
        };

        def.validate()?;
        Ok(def)
    }

    /// Top-level section classification: a numbered title ("1. Intro"),
    /// one of the special ids, or a section with no subsections. Falls
    /// back to every section when nothing qualifies.
    fn extract_h1_sections(template: &DocTemplate) -> Vec<TemplateSection> {
        let h1: Vec<TemplateSection> = template
            .sections
            .iter()
            .filter(|s| {
                NUMBERED_TITLE.is_match(&s.title)
                    || SPECIAL_H1_IDS.contains(&s.id.as_str())
                    || s.subsections.is_empty()
            })
            .cloned()
            .collect();

        if h1.is_empty() {
            warn!(
                "No top-level sections identified in template {}; using all sections",
                template.name
            );
            return template.sections.clone();
        }
        h1
    }

    fn parameters(dag_id: &str, template_name: &str) -> std::collections::BTreeMap<String, ParameterSpec> {
        let mut params = std::collections::BTreeMap::new();
        params.insert(
            "codebase_path".to_string(),
            ParameterSpec {
                description: "Path to the codebase to document".to_string(),
                required: true,
                param_type: "string".to_string(),
                default: None,
                example: Some(json!("/path/to/project")),
            },
        );
        params.insert(
            "output_path".to_string(),
            ParameterSpec {
                description: "Path to write final documentation".to_string(),
                required: false,
                param_type: "string".to_string(),
                default: Some(json!(format!("/tmp/weft_{}_output.md", dag_id))),
                example: None,
            },
        );
        params.insert(
            "template_name".to_string(),
            ParameterSpec {
                description: "Template to use for documentation structure".to_string(),
                required: false,
                param_type: "string".to_string(),
                default: Some(json!(template_name)),
                example: None,
            },
        );
        params.insert(
            "metadata".to_string(),
            ParameterSpec {
                description: "Project metadata (name, version, authors, etc.)".to_string(),
                required: false,
                param_type: "object".to_string(),
                default: Some(json!({
                    "doc_id": "AUTO-GENERATED",
                    "doc_version": "1.0",
                    "status": "Draft",
                    "publication_date": "AUTO"
                })),
                example: None,
            },
        );
        params
    }

    fn preprocessing_nodes() -> Vec<NodeDefinition> {
        vec![
            NodeDefinition {
                node_id: "scan_codebase".to_string(),
                node_type: "tool".to_string(),
                agent_id: None,
                config: json!({
                    "tool_name": "filesystem",
                    "input": {
                        "action": "list_directory",
                        "path": "{codebase_path}",
                        "extensions": [".rs", ".py", ".js", ".ts", ".md", ".json"],
                        "recursive": true
                    }
                }),
                dependencies: vec![],
            },
            NodeDefinition {
                node_id: "parse_all_files".to_string(),
                node_type: "tool".to_string(),
                agent_id: None,
                config: json!({
                    "tool_name": "code_parser",
                    "input": {
                        "action": "analyze_structure",
                        "files": "{scan_codebase.result.files}"
                    }
                }),
                dependencies: vec!["scan_codebase".to_string()],
            },
            NodeDefinition {
                node_id: "generate_file_summaries".to_string(),
                node_type: "tool".to_string(),
                agent_id: None,
                config: json!({
                    "tool_name": "llm_summarization",
                    "input": {
                        "action": "hierarchical_summary",
                        "file_summaries": "{parse_all_files.result.summaries}"
                    }
                }),
                dependencies: vec!["parse_all_files".to_string()],
            },
        ]
    }

    fn section_nodes(sections: &[TemplateSection]) -> Vec<NodeDefinition> {
        sections
            .iter()
            .map(|section| {
                let mut context = Map::new();
                context.insert(
                    "hierarchical_summary".to_string(),
                    json!("{generate_file_summaries.result.hierarchical_summary}"),
                );
                context.insert("metadata".to_string(), json!("{metadata}"));

                // Implementation-heavy sections also get the raw per-file
                // summaries.
                if matches!(section.id.as_str(), "implementation" | "methodology" | "data") {
                    context.insert(
                        "file_summaries".to_string(),
                        json!("{parse_all_files.result.summaries}"),
                    );
                }

                NodeDefinition {
                    node_id: format!("draft_{}", section.id),
                    node_type: "tool".to_string(),
                    agent_id: None,
                    config: json!({
                        "tool_name": "section_drafting",
                        "input": {
                            "action": "draft_section",
                            "section_id": section.id,
                            "template_name": "{template_name}",
                            "context": Value::Object(context)
                        }
                    }),
                    dependencies: vec!["generate_file_summaries".to_string()],
                }
            })
            .collect()
    }

    fn assembly_nodes(sections: &[TemplateSection], _dag_id: &str) -> Vec<NodeDefinition> {
        let draft_ids: Vec<String> = sections
            .iter()
            .map(|s| format!("draft_{}", s.id))
            .collect();

        let mut mapping = Map::new();
        for section in sections {
            mapping.insert(
                section.id.clone(),
                json!(format!("{{draft_{}.result}}", section.id)),
            );
        }

        vec![
            NodeDefinition {
                node_id: "assemble_document".to_string(),
                node_type: "tool".to_string(),
                agent_id: None,
                config: json!({
                    "tool_name": "document_assembler",
                    "input": {
                        "action": "assemble_document",
                        "template_name": "{template_name}",
                        "sections": Value::Object(mapping),
                        "metadata": "{metadata}"
                    }
                }),
                dependencies: draft_ids,
            },
            NodeDefinition {
                node_id: "write_final_doc".to_string(),
                node_type: "tool".to_string(),
                agent_id: None,
                config: json!({
                    "tool_name": "filesystem",
                    "input": {
                        "action": "write_file",
                        "file_path": "{output_path}",
                        "content": "{assemble_document.result.document}"
                    }
                }),
                dependencies: vec!["assemble_document".to_string()],
            },
        ]
    }
}

fn slug(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect()
}

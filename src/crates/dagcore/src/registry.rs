//! Directory-backed registry of DAG definitions.
//!
//! The registry owns a directory of `*.json` definition files. A file
//! that fails to parse or validate is skipped and reported in the load
//! result; one bad file never prevents the rest from loading. Reads go
//! against an in-memory map behind a `RwLock`; mutations rewrite the
//! backing file with a write-temp-then-rename so a crash mid-write leaves
//! the previous definition intact.

use crate::definition::DagDefinition;
use crate::error::{GraphError, Result};
use crate::graph::Graph;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A definition file that failed to load.
#[derive(Debug, Clone)]
pub struct LoadError {
    /// File the error came from.
    pub file: PathBuf,
    /// Why it was skipped.
    pub reason: String,
}

/// Summary row for listing DAGs.
#[derive(Debug, Clone, serde::Serialize)]
pub struct DagSummary {
    pub dag_id: String,
    pub name: String,
    pub description: String,
    pub node_count: usize,
}

/// Registry of validated DAG definitions keyed by dag id.
pub struct DagRegistry {
    config_dir: PathBuf,
    dags: RwLock<HashMap<String, DagDefinition>>,
}

impl DagRegistry {
    /// Create a registry over `config_dir` and load every definition in
    /// it. Returns the registry together with any per-file load errors.
    pub fn load(config_dir: impl Into<PathBuf>) -> Result<(Self, Vec<LoadError>)> {
        let registry = Self {
            config_dir: config_dir.into(),
            dags: RwLock::new(HashMap::new()),
        };
        let errors = registry.reload()?;
        Ok((registry, errors))
    }

    /// Re-scan the directory and atomically swap the in-memory map.
    pub fn reload(&self) -> Result<Vec<LoadError>> {
        let mut loaded = HashMap::new();
        let mut errors = Vec::new();

        if !self.config_dir.exists() {
            fs::create_dir_all(&self.config_dir)?;
        }

        for entry in fs::read_dir(&self.config_dir)? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }

            match Self::load_file(&path) {
                Ok(def) => {
                    loaded.insert(def.dag_id.clone(), def);
                }
                Err(e) => {
                    warn!("Skipping DAG definition {}: {}", path.display(), e);
                    errors.push(LoadError {
                        file: path,
                        reason: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Loaded {} DAG definitions from {} ({} skipped)",
            loaded.len(),
            self.config_dir.display(),
            errors.len()
        );
        *self.dags.write() = loaded;
        Ok(errors)
    }

    fn load_file(path: &Path) -> Result<DagDefinition> {
        let text = fs::read_to_string(path)?;
        let def = DagDefinition::from_json(&text)?;
        def.validate()?;
        Ok(def)
    }

    /// Get a clone of a definition by id.
    pub fn get_dag(&self, dag_id: &str) -> Option<DagDefinition> {
        self.dags.read().get(dag_id).cloned()
    }

    /// Materialize a fresh `Graph` for a definition. `None` for unknown
    /// ids (including ids whose files were skipped at load).
    pub fn materialize(&self, dag_id: &str) -> Option<Graph> {
        let def = self.dags.read().get(dag_id).cloned()?;
        // Definitions were validated at load; a failure here would mean
        // the in-memory map was corrupted.
        def.build_graph().ok()
    }

    /// List loaded DAGs.
    pub fn list_dags(&self) -> Vec<DagSummary> {
        let mut rows: Vec<DagSummary> = self
            .dags
            .read()
            .values()
            .map(|def| DagSummary {
                dag_id: def.dag_id.clone(),
                name: if def.name.is_empty() {
                    def.dag_id.clone()
                } else {
                    def.name.clone()
                },
                description: def.description.clone(),
                node_count: def.nodes.len(),
            })
            .collect();
        rows.sort_by(|a, b| a.dag_id.cmp(&b.dag_id));
        rows
    }

    /// Add a new definition, validating it and persisting to disk.
    pub fn add_dag(&self, def: DagDefinition) -> Result<()> {
        def.validate()?;
        let mut dags = self.dags.write();
        self.write_file(&def)?;
        dags.insert(def.dag_id.clone(), def);
        Ok(())
    }

    /// Update an existing definition. Fails for unknown ids.
    pub fn update_dag(&self, dag_id: &str, def: DagDefinition) -> Result<()> {
        if def.dag_id != dag_id {
            return Err(GraphError::InvalidDefinition(format!(
                "dag_id mismatch: {} vs {}",
                dag_id, def.dag_id
            )));
        }
        def.validate()?;

        let mut dags = self.dags.write();
        if !dags.contains_key(dag_id) {
            return Err(GraphError::UnknownNode(dag_id.to_string()));
        }
        self.write_file(&def)?;
        dags.insert(dag_id.to_string(), def);
        Ok(())
    }

    /// Delete a definition and its file. Fails for unknown ids.
    pub fn delete_dag(&self, dag_id: &str) -> Result<()> {
        let mut dags = self.dags.write();
        if dags.remove(dag_id).is_none() {
            return Err(GraphError::UnknownNode(dag_id.to_string()));
        }
        let path = self.file_path(dag_id);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    fn file_path(&self, dag_id: &str) -> PathBuf {
        self.config_dir.join(format!("{}.json", dag_id))
    }

    /// Write-temp-then-rename keeps the previous file intact on a crash
    /// mid-write.
    fn write_file(&self, def: &DagDefinition) -> Result<()> {
        fs::create_dir_all(&self.config_dir)?;
        let target = self.file_path(&def.dag_id);
        let tmp = self.config_dir.join(format!(".{}.json.tmp", def.dag_id));
        fs::write(&tmp, def.to_json()?)?;
        fs::rename(&tmp, &target)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_dag(dir: &Path, dag_id: &str, body: &str) {
        fs::write(dir.join(format!("{}.json", dag_id)), body).unwrap();
    }

    fn valid_dag(dag_id: &str) -> String {
        format!(
            r#"{{"dag_id": "{}", "name": "Test", "nodes": [
                {{"node_id": "a", "node_type": "tool", "dependencies": []}},
                {{"node_id": "b", "node_type": "tool", "dependencies": ["a"]}}
            ]}}"#,
            dag_id
        )
    }

    #[test]
    fn test_load_valid_definitions() {
        let dir = TempDir::new().unwrap();
        write_dag(dir.path(), "one", &valid_dag("one"));
        write_dag(dir.path(), "two", &valid_dag("two"));

        let (registry, errors) = DagRegistry::load(dir.path()).unwrap();
        assert!(errors.is_empty());
        assert_eq!(registry.list_dags().len(), 2);
    }

    #[test]
    fn test_bad_file_skipped_not_fatal() {
        let dir = TempDir::new().unwrap();
        write_dag(dir.path(), "good", &valid_dag("good"));
        write_dag(dir.path(), "bad", "{ not json");
        write_dag(
            dir.path(),
            "cyclic",
            r#"{"dag_id": "cyclic", "nodes": [
                {"node_id": "a", "node_type": "tool", "dependencies": ["b"]},
                {"node_id": "b", "node_type": "tool", "dependencies": ["a"]}
            ]}"#,
        );

        let (registry, errors) = DagRegistry::load(dir.path()).unwrap();
        assert_eq!(errors.len(), 2);
        assert_eq!(registry.list_dags().len(), 1);
        assert!(registry.get_dag("good").is_some());
        assert!(registry.materialize("cyclic").is_none());
    }

    #[test]
    fn test_materialize_returns_fresh_graph() {
        let dir = TempDir::new().unwrap();
        write_dag(dir.path(), "one", &valid_dag("one"));
        let (registry, _) = DagRegistry::load(dir.path()).unwrap();

        let mut g1 = registry.materialize("one").unwrap();
        g1.get_node_mut("a").unwrap().status = crate::graph::NodeStatus::Completed;

        let g2 = registry.materialize("one").unwrap();
        assert_eq!(
            g2.get_node("a").unwrap().status,
            crate::graph::NodeStatus::Pending
        );
    }

    #[test]
    fn test_add_update_delete_persist() {
        let dir = TempDir::new().unwrap();
        let (registry, _) = DagRegistry::load(dir.path()).unwrap();

        let def = DagDefinition::from_json(&valid_dag("fresh")).unwrap();
        registry.add_dag(def.clone()).unwrap();
        assert!(dir.path().join("fresh.json").exists());

        let mut updated = def.clone();
        updated.description = "updated".to_string();
        registry.update_dag("fresh", updated).unwrap();
        assert_eq!(registry.get_dag("fresh").unwrap().description, "updated");

        registry.delete_dag("fresh").unwrap();
        assert!(!dir.path().join("fresh.json").exists());
        assert!(registry.get_dag("fresh").is_none());

        // Reload sees the same state the mutations left on disk.
        let errors = registry.reload().unwrap();
        assert!(errors.is_empty());
        assert!(registry.list_dags().is_empty());
    }

    #[test]
    fn test_identical_reload_leaves_listing_unchanged() {
        let dir = TempDir::new().unwrap();
        write_dag(dir.path(), "one", &valid_dag("one"));
        let (registry, _) = DagRegistry::load(dir.path()).unwrap();

        let before: Vec<_> = registry.list_dags().iter().map(|d| d.dag_id.clone()).collect();
        registry.reload().unwrap();
        let after: Vec<_> = registry.list_dags().iter().map(|d| d.dag_id.clone()).collect();
        assert_eq!(before, after);
    }
}

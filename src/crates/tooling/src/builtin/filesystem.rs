//! Filesystem tool: directory listing and file read/write under a
//! configured root.
//!
//! Actions are selected by the `action` argument:
//!
//! - `list_directory` - `path`, optional `extensions` filter, optional
//!   `recursive`
//! - `read_file` - `file_path`
//! - `write_file` - `file_path`, `content` (parent directories created)
//!
//! Every resolved path must stay inside the configured root; traversal
//! outside it is rejected.

use crate::descriptor::LocalToolDescriptor;
use crate::error::{Result, ToolError};
use crate::tool::Tool;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

/// Local filesystem tool rooted at a configured directory.
pub struct FilesystemTool {
    name: String,
    description: String,
    root: PathBuf,
}

impl FilesystemTool {
    /// Factory entry for the registry table. The descriptor config may
    /// set `root`; it defaults to the process working directory.
    pub fn factory(descriptor: &LocalToolDescriptor) -> Result<Arc<dyn Tool>> {
        let root = descriptor
            .config
            .get("root")
            .and_then(Value::as_str)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        Ok(Arc::new(Self {
            name: descriptor.name.clone(),
            description: if descriptor.description.is_empty() {
                "Filesystem access under a configured root".to_string()
            } else {
                descriptor.description.clone()
            },
            root,
        }))
    }

    /// Resolve `path` against the root, rejecting `..` escapes and
    /// absolute paths that leave it.
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let candidate = Path::new(path);
        let joined = if candidate.is_absolute() {
            candidate.to_path_buf()
        } else {
            self.root.join(candidate)
        };

        let mut normalized = PathBuf::new();
        for component in joined.components() {
            match component {
                Component::ParentDir => {
                    if !normalized.pop() {
                        return Err(ToolError::InvalidArguments(format!(
                            "Path escapes tool root: {}",
                            path
                        )));
                    }
                }
                Component::CurDir => {}
                other => normalized.push(other),
            }
        }

        let root = self
            .root
            .canonicalize()
            .unwrap_or_else(|_| self.root.clone());
        if !normalized.starts_with(&root) && !normalized.starts_with(&self.root) {
            return Err(ToolError::InvalidArguments(format!(
                "Path escapes tool root: {}",
                path
            )));
        }
        Ok(normalized)
    }

    fn list_directory(&self, args: &Value) -> Result<Value> {
        let path = args
            .get("path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing path".to_string()))?;
        let extensions: Vec<String> = args
            .get("extensions")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();
        let recursive = args
            .get("recursive")
            .and_then(Value::as_bool)
            .unwrap_or(false);

        let dir = self.resolve(path)?;
        let mut files = Vec::new();
        collect_files(&dir, recursive, &extensions, &mut files)?;
        files.sort();

        Ok(json!({ "files": files, "count": files.len() }))
    }

    fn read_file(&self, args: &Value) -> Result<Value> {
        let path = args
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing file_path".to_string()))?;
        let resolved = self.resolve(path)?;
        let content = std::fs::read_to_string(&resolved)?;
        Ok(json!({ "file_path": path, "content": content }))
    }

    fn write_file(&self, args: &Value) -> Result<Value> {
        let path = args
            .get("file_path")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing file_path".to_string()))?;
        let content = args
            .get("content")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing content".to_string()))?;

        let resolved = self.resolve(path)?;
        if let Some(parent) = resolved.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&resolved, content)?;
        Ok(json!({ "file_path": path, "bytes_written": content.len() }))
    }
}

fn collect_files(
    dir: &Path,
    recursive: bool,
    extensions: &[String],
    out: &mut Vec<String>,
) -> Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_dir() {
            if recursive {
                collect_files(&path, recursive, extensions, out)?;
            }
            continue;
        }
        let keep = extensions.is_empty()
            || extensions.iter().any(|ext| {
                path.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| format!(".{}", e) == *ext || e == ext.trim_start_matches('.'))
                    .unwrap_or(false)
            });
        if keep {
            out.push(path.to_string_lossy().to_string());
        }
    }
    Ok(())
}

#[async_trait]
impl Tool for FilesystemTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    async fn execute(&self, args: Value) -> Result<Value> {
        let action = args
            .get("action")
            .and_then(Value::as_str)
            .ok_or_else(|| ToolError::InvalidArguments("missing action".to_string()))?;

        match action {
            "list_directory" => self.list_directory(&args),
            "read_file" => self.read_file(&args),
            "write_file" => self.write_file(&args),
            other => Err(ToolError::InvalidArguments(format!(
                "Unknown action: {}",
                other
            ))),
        }
    }
}

//! `list_files`: list a directory, optionally recursively.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use toolclaw_core::error::ToolError;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};

use crate::paths;

/// Directories listed but never descended into.
const SKIP_DIRS: [&str; 3] = [".git", "node_modules", "target"];

pub struct ListFilesTool {
    max_entries: usize,
    forbidden_paths: Vec<PathBuf>,
}

impl ListFilesTool {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            forbidden_paths: Vec::new(),
        }
    }

    pub fn with_forbidden_paths(mut self, forbidden_paths: Vec<PathBuf>) -> Self {
        self.forbidden_paths = forbidden_paths;
        self
    }
}

impl Default for ListFilesTool {
    fn default() -> Self {
        Self::new(200)
    }
}

pub(crate) struct Entry {
    pub path: PathBuf,
    pub is_dir: bool,
}

/// Collect entries under `root`, sorted by path. Stops after `limit` entries;
/// the flag reports whether anything was left out.
pub(crate) async fn walk(root: &Path, recursive: bool, limit: usize) -> std::io::Result<(Vec<Entry>, bool)> {
    let mut out = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    let mut truncated = false;

    while let Some(dir) = pending.pop() {
        let mut reader = tokio::fs::read_dir(&dir).await?;
        let mut batch = Vec::new();
        while let Some(entry) = reader.next_entry().await? {
            let is_dir = entry.file_type().await?.is_dir();
            batch.push(Entry {
                path: entry.path(),
                is_dir,
            });
        }
        batch.sort_by(|a, b| a.path.cmp(&b.path));

        for entry in batch.iter().rev() {
            let skipped = entry
                .path
                .file_name()
                .is_some_and(|n| SKIP_DIRS.iter().any(|s| n == *s));
            if recursive && entry.is_dir && !skipped {
                pending.push(entry.path.clone());
            }
        }

        for entry in batch {
            if out.len() >= limit {
                truncated = true;
                break;
            }
            out.push(entry);
        }
        if truncated {
            break;
        }
    }

    out.sort_by(|a, b| a.path.cmp(&b.path));
    Ok((out, truncated))
}

#[async_trait]
impl ToolHandler for ListFilesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ListFiles
    }

    fn description(&self, cwd: &Path) -> String {
        format!(
            "## list_files\n\
             Description: List files and directories. Directories end with '/'.\n\
             Parameters:\n\
             - path: (required) Directory path relative to {}\n\
             - recursive: (optional) \"true\" to list the whole tree\n\
             Usage:\n\
             <list_files>\n<path>.</path>\n<recursive>false</recursive>\n</list_files>",
            cwd.display()
        )
    }

    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError> {
        let raw = tool_use.require(ToolParam::Path)?;
        let recursive = tool_use
            .param(ToolParam::Recursive)
            .is_some_and(|v| v.eq_ignore_ascii_case("true"));
        let root = paths::resolve("list_files", cwd, raw, &self.forbidden_paths)?;

        let (entries, truncated) =
            walk(&root, recursive, self.max_entries)
                .await
                .map_err(|e| ToolError::ExecutionFailed {
                    tool_name: "list_files".into(),
                    reason: format!("Failed to list '{raw}': {e}"),
                })?;

        if entries.is_empty() {
            return Ok(ToolOutput::Text("No files found.".into()));
        }

        let mut lines: Vec<String> = entries
            .iter()
            .map(|e| {
                let rel = paths::display_relative(&e.path, &root);
                if e.is_dir { format!("{rel}/") } else { rel }
            })
            .collect();
        if truncated {
            lines.push(format!(
                "(File list truncated at {} entries. List a subdirectory to see more.)",
                self.max_entries
            ));
        }
        Ok(ToolOutput::Text(lines.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src/bin")).unwrap();
        std::fs::create_dir_all(dir.path().join(".git")).unwrap();
        std::fs::write(dir.path().join(".git/HEAD"), "ref").unwrap();
        std::fs::write(dir.path().join("Cargo.toml"), "").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "").unwrap();
        std::fs::write(dir.path().join("src/bin/main.rs"), "").unwrap();
        dir
    }

    async fn list(dir: &Path, recursive: &str, max: usize) -> String {
        let call = ToolUse::new("list_files")
            .with_param(ToolParam::Path, ".")
            .with_param(ToolParam::Recursive, recursive);
        ListFilesTool::new(max).execute(&call, dir).await.unwrap().into_text()
    }

    #[tokio::test]
    async fn top_level_only() {
        let dir = tree();
        assert_eq!(list(dir.path(), "false", 100).await, ".git/\nCargo.toml\nsrc/");
    }

    #[tokio::test]
    async fn recursive_is_sorted_and_skips_git() {
        let dir = tree();
        assert_eq!(
            list(dir.path(), "true", 100).await,
            ".git/\nCargo.toml\nsrc/\nsrc/bin/\nsrc/bin/main.rs\nsrc/lib.rs"
        );
    }

    #[tokio::test]
    async fn truncates_at_cap() {
        let dir = tree();
        let out = list(dir.path(), "true", 2).await;
        assert!(out.contains("truncated at 2 entries"));
        assert_eq!(out.lines().count(), 3);
    }

    #[tokio::test]
    async fn empty_directory() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(list(dir.path(), "false", 10).await, "No files found.");
    }

    #[tokio::test]
    async fn missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let call = ToolUse::new("list_files").with_param(ToolParam::Path, "missing");
        let result = ListFilesTool::default().execute(&call, dir.path()).await;
        assert!(matches!(result, Err(ToolError::ExecutionFailed { .. })));
    }
}

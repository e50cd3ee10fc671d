//! `search_files`: regex search across the files under a directory.

use async_trait::async_trait;
use regex_lite::Regex;
use std::path::{Path, PathBuf};
use toolclaw_core::error::ToolError;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};
use tracing::debug;

use crate::list_files::walk;
use crate::paths;

/// Upper bound on files visited per search.
const MAX_FILES: usize = 5_000;

pub struct SearchFilesTool {
    max_results: usize,
    forbidden_paths: Vec<PathBuf>,
}

impl SearchFilesTool {
    pub fn new(max_results: usize) -> Self {
        Self {
            max_results,
            forbidden_paths: Vec::new(),
        }
    }

    pub fn with_forbidden_paths(mut self, forbidden_paths: Vec<PathBuf>) -> Self {
        self.forbidden_paths = forbidden_paths;
        self
    }
}

impl Default for SearchFilesTool {
    fn default() -> Self {
        Self::new(300)
    }
}

/// Minimal glob: `*` alone or a leading `*` suffix match (`*.rs`), otherwise
/// an exact file name.
fn matches_pattern(file_name: &str, pattern: Option<&str>) -> bool {
    match pattern {
        None | Some("") | Some("*") => true,
        Some(p) => match p.strip_prefix('*') {
            Some(suffix) => file_name.ends_with(suffix),
            None => file_name == p,
        },
    }
}

#[async_trait]
impl ToolHandler for SearchFilesTool {
    fn kind(&self) -> ToolKind {
        ToolKind::SearchFiles
    }

    fn description(&self, cwd: &Path) -> String {
        format!(
            "## search_files\n\
             Description: Search file contents with a regular expression. Each match is shown as \
             path:line: text.\n\
             Parameters:\n\
             - path: (required) Directory to search, relative to {}\n\
             - regex: (required) Regular expression to look for\n\
             - file_pattern: (optional) File name filter such as *.rs\n\
             Usage:\n\
             <search_files>\n<path>src</path>\n<regex>fn main</regex>\n<file_pattern>*.rs</file_pattern>\n</search_files>",
            cwd.display()
        )
    }

    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError> {
        let raw = tool_use.require(ToolParam::Path)?;
        let pattern = tool_use.require(ToolParam::Regex)?;
        let file_pattern = tool_use.param(ToolParam::FilePattern);
        let regex = Regex::new(pattern)
            .map_err(|e| ToolError::InvalidArguments(format!("Invalid regex '{pattern}': {e}")))?;
        let root = paths::resolve("search_files", cwd, raw, &self.forbidden_paths)?;

        let (entries, _) = walk(&root, true, MAX_FILES)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "search_files".into(),
                reason: format!("Failed to search '{raw}': {e}"),
            })?;

        let mut hits = Vec::new();
        'files: for entry in entries.iter().filter(|e| !e.is_dir) {
            let name = entry.path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default();
            if !matches_pattern(&name, file_pattern) {
                continue;
            }
            // Binary and unreadable files are skipped.
            let Ok(text) = tokio::fs::read_to_string(&entry.path).await else {
                continue;
            };
            let rel = paths::display_relative(&entry.path, cwd);
            for (i, line) in text.lines().enumerate() {
                if regex.is_match(line) {
                    hits.push(format!("{rel}:{}: {}", i + 1, line.trim()));
                    if hits.len() >= self.max_results {
                        break 'files;
                    }
                }
            }
        }

        debug!(regex = %pattern, hits = hits.len(), "Search complete");

        if hits.is_empty() {
            return Ok(ToolOutput::Text("Found 0 results.".into()));
        }
        let header = if hits.len() >= self.max_results {
            format!("Showing the first {} results.", self.max_results)
        } else {
            format!("Found {} results.", hits.len())
        };
        Ok(ToolOutput::Text(format!("{header}\n\n{}", hits.join("\n"))))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("src")).unwrap();
        std::fs::write(dir.path().join("src/main.rs"), "fn main() {\n    run();\n}\n").unwrap();
        std::fs::write(dir.path().join("src/lib.rs"), "pub fn run() {}\n").unwrap();
        std::fs::write(dir.path().join("README.md"), "call run() to start\n").unwrap();
        dir
    }

    #[test]
    fn pattern_matching() {
        assert!(matches_pattern("main.rs", Some("*.rs")));
        assert!(!matches_pattern("main.rs", Some("*.md")));
        assert!(matches_pattern("Cargo.toml", Some("Cargo.toml")));
        assert!(matches_pattern("anything", None));
    }

    #[tokio::test]
    async fn finds_matches_with_filter() {
        let dir = project();
        let call = ToolUse::new("search_files")
            .with_param(ToolParam::Path, ".")
            .with_param(ToolParam::Regex, r"run\(")
            .with_param(ToolParam::FilePattern, "*.rs");
        let out = SearchFilesTool::default()
            .execute(&call, dir.path())
            .await
            .unwrap()
            .into_text();
        assert!(out.starts_with("Found 2 results."));
        assert!(out.contains("src/lib.rs:1: pub fn run() {}"));
        assert!(out.contains("src/main.rs:2: run();"));
        assert!(!out.contains("README"));
    }

    #[tokio::test]
    async fn caps_results() {
        let dir = project();
        let call = ToolUse::new("search_files")
            .with_param(ToolParam::Path, ".")
            .with_param(ToolParam::Regex, "run");
        let out = SearchFilesTool::new(1)
            .execute(&call, dir.path())
            .await
            .unwrap()
            .into_text();
        assert!(out.starts_with("Showing the first 1 results."));
    }

    #[tokio::test]
    async fn invalid_regex_rejected() {
        let dir = project();
        let call = ToolUse::new("search_files")
            .with_param(ToolParam::Path, ".")
            .with_param(ToolParam::Regex, "(unclosed");
        let result = SearchFilesTool::default().execute(&call, dir.path()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}

//! `write_to_file`: create or overwrite a file with the given content.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use toolclaw_core::error::ToolError;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};
use tracing::debug;

use crate::paths;

pub struct WriteToFileTool {
    forbidden_paths: Vec<PathBuf>,
}

impl WriteToFileTool {
    pub fn new() -> Self {
        Self {
            forbidden_paths: Vec::new(),
        }
    }

    pub fn with_forbidden_paths(forbidden_paths: Vec<PathBuf>) -> Self {
        Self { forbidden_paths }
    }
}

impl Default for WriteToFileTool {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolHandler for WriteToFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::WriteToFile
    }

    fn description(&self, cwd: &Path) -> String {
        format!(
            "## write_to_file\n\
             Description: Write the complete content of a file. Creates the file and any missing \
             parent directories, or overwrites the file if it exists.\n\
             Parameters:\n\
             - path: (required) File path relative to {}\n\
             - content: (required) The full file content, without line numbers\n\
             Usage:\n\
             <write_to_file>\n<path>notes.txt</path>\n<content>\nhello\n</content>\n</write_to_file>",
            cwd.display()
        )
    }

    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError> {
        let raw = tool_use.require(ToolParam::Path)?;
        let content = tool_use
            .param(ToolParam::Content)
            .ok_or_else(|| ToolError::InvalidArguments("Missing 'content' parameter for write_to_file".into()))?;
        let path = paths::resolve("write_to_file", cwd, raw, &self.forbidden_paths)?;

        let failed = |e: std::io::Error| ToolError::ExecutionFailed {
            tool_name: "write_to_file".into(),
            reason: format!("Failed to write '{raw}': {e}"),
        };

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(failed)?;
        }

        let mut body = content.to_string();
        if !body.is_empty() && !body.ends_with('\n') {
            body.push('\n');
        }
        tokio::fs::write(&path, &body).await.map_err(failed)?;

        let lines = body.lines().count();
        debug!(path = %path.display(), lines, "File written");
        Ok(ToolOutput::Text(format!("Wrote {lines} lines to {raw}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let call = ToolUse::new("write_to_file")
            .with_param(ToolParam::Path, "deep/nested/out.txt")
            .with_param(ToolParam::Content, "one\ntwo");

        let out = WriteToFileTool::new().execute(&call, dir.path()).await.unwrap();
        assert_eq!(out.into_text(), "Wrote 2 lines to deep/nested/out.txt");
        let written = std::fs::read_to_string(dir.path().join("deep/nested/out.txt")).unwrap();
        assert_eq!(written, "one\ntwo\n");
    }

    #[tokio::test]
    async fn overwrites_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("f.txt"), "old content\n").unwrap();
        let call = ToolUse::new("write_to_file")
            .with_param(ToolParam::Path, "f.txt")
            .with_param(ToolParam::Content, "new\n");

        WriteToFileTool::new().execute(&call, dir.path()).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("f.txt")).unwrap(), "new\n");
    }

    #[tokio::test]
    async fn missing_content_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let call = ToolUse::new("write_to_file").with_param(ToolParam::Path, "f.txt");
        let result = WriteToFileTool::new().execute(&call, dir.path()).await;
        assert!(matches!(result, Err(ToolError::InvalidArguments(_))));
    }
}

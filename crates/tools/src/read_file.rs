//! `read_file`: read a file, optionally a line range, with line numbers.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use toolclaw_core::error::ToolError;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};

use crate::paths;

pub struct ReadFileTool {
    forbidden_paths: Vec<PathBuf>,
}

impl ReadFileTool {
    pub fn new() -> Self {
        Self {
            forbidden_paths: Vec::new(),
        }
    }

    pub fn with_forbidden_paths(forbidden_paths: Vec<PathBuf>) -> Self {
        Self { forbidden_paths }
    }
}

impl Default for ReadFileTool {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_line(tool_use: &ToolUse, param: ToolParam) -> Result<Option<usize>, ToolError> {
    match tool_use.param(param) {
        None | Some("") => Ok(None),
        Some(v) => v.parse::<usize>().map(Some).map_err(|_| {
            ToolError::InvalidArguments(format!("'{}' must be a line number, got '{v}'", param.as_str()))
        }),
    }
}

#[async_trait]
impl ToolHandler for ReadFileTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ReadFile
    }

    fn description(&self, cwd: &Path) -> String {
        format!(
            "## read_file\n\
             Description: Read the contents of a file. Output lines are prefixed with their line \
             number, e.g. \"1 | fn main() {{\".\n\
             Parameters:\n\
             - path: (required) File path relative to {}\n\
             - start_line: (optional) First line to read, 1-based\n\
             - end_line: (optional) Last line to read, inclusive\n\
             Usage:\n\
             <read_file>\n<path>src/main.rs</path>\n</read_file>",
            cwd.display()
        )
    }

    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError> {
        let raw = tool_use.require(ToolParam::Path)?;
        let start = parse_line(tool_use, ToolParam::StartLine)?;
        let end = parse_line(tool_use, ToolParam::EndLine)?;
        let path = paths::resolve("read_file", cwd, raw, &self.forbidden_paths)?;

        let content = tokio::fs::read_to_string(&path)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "read_file".into(),
                reason: format!("Failed to read '{raw}': {e}"),
            })?;

        let first = start.unwrap_or(1).max(1);
        let numbered: Vec<String> = content
            .lines()
            .enumerate()
            .map(|(i, line)| (i + 1, line))
            .filter(|(n, _)| *n >= first && end.is_none_or(|e| *n <= e))
            .map(|(n, line)| format!("{n} | {line}"))
            .collect();

        if numbered.is_empty() {
            return Ok(ToolOutput::Text(format!("(no content in '{raw}' for the requested range)")));
        }
        Ok(ToolOutput::Text(numbered.join("\n")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn read(dir: &Path, call: ToolUse) -> Result<String, ToolError> {
        ReadFileTool::new().execute(&call, dir).await.map(ToolOutput::into_text)
    }

    #[tokio::test]
    async fn reads_with_line_numbers() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\nbeta\ngamma\n").unwrap();

        let out = read(dir.path(), ToolUse::new("read_file").with_param(ToolParam::Path, "a.txt"))
            .await
            .unwrap();
        assert_eq!(out, "1 | alpha\n2 | beta\n3 | gamma");
    }

    #[tokio::test]
    async fn reads_line_range() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.txt"), "alpha\nbeta\ngamma\n").unwrap();

        let call = ToolUse::new("read_file")
            .with_param(ToolParam::Path, "a.txt")
            .with_param(ToolParam::StartLine, "2")
            .with_param(ToolParam::EndLine, "2");
        assert_eq!(read(dir.path(), call).await.unwrap(), "2 | beta");
    }

    #[tokio::test]
    async fn missing_file_is_execution_failure() {
        let dir = tempfile::tempdir().unwrap();
        let err = read(dir.path(), ToolUse::new("read_file").with_param(ToolParam::Path, "nope.txt"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn bad_line_number_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let call = ToolUse::new("read_file")
            .with_param(ToolParam::Path, "a.txt")
            .with_param(ToolParam::StartLine, "first");
        assert!(matches!(
            read(dir.path(), call).await,
            Err(ToolError::InvalidArguments(_))
        ));
    }

    #[tokio::test]
    async fn forbidden_path_blocked() {
        let tool = ReadFileTool::with_forbidden_paths(vec!["/etc".into()]);
        let call = ToolUse::new("read_file").with_param(ToolParam::Path, "/etc/shadow");
        let result = tool.execute(&call, Path::new("/tmp")).await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }
}

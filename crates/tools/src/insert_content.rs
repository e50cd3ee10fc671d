//! `insert_content`: insert lines into an existing file.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use toolclaw_core::error::ToolError;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};

use crate::paths;

pub struct InsertContentTool {
    forbidden_paths: Vec<PathBuf>,
}

impl InsertContentTool {
    pub fn new() -> Self {
        Self {
            forbidden_paths: Vec::new(),
        }
    }

    pub fn with_forbidden_paths(forbidden_paths: Vec<PathBuf>) -> Self {
        Self { forbidden_paths }
    }
}

impl Default for InsertContentTool {
    fn default() -> Self {
        Self::new()
    }
}

/// Insert `content` before 1-based `line`; `0` appends.
fn insert_lines(original: &str, line: usize, content: &str) -> Result<String, ToolError> {
    let mut lines: Vec<&str> = original.lines().collect();
    let index = if line == 0 { lines.len() } else { line - 1 };
    if index > lines.len() {
        return Err(ToolError::InvalidArguments(format!(
            "line {line} is past the end of the file ({} lines)",
            lines.len()
        )));
    }
    let new: Vec<&str> = content.lines().collect();
    lines.splice(index..index, new);
    let mut out = lines.join("\n");
    out.push('\n');
    Ok(out)
}

#[async_trait]
impl ToolHandler for InsertContentTool {
    fn kind(&self) -> ToolKind {
        ToolKind::InsertContent
    }

    fn description(&self, cwd: &Path) -> String {
        format!(
            "## insert_content\n\
             Description: Insert new lines into an existing file without rewriting it.\n\
             Parameters:\n\
             - path: (required) File path relative to {}\n\
             - line: (required) 1-based line to insert before; 0 appends at the end\n\
             - content: (required) The lines to insert\n\
             Usage:\n\
             <insert_content>\n<path>src/lib.rs</path>\n<line>1</line>\n<content>\nuse std::fmt;\n</content>\n</insert_content>",
            cwd.display()
        )
    }

    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError> {
        let raw = tool_use.require(ToolParam::Path)?;
        let line_raw = tool_use.require(ToolParam::Line)?;
        let content = tool_use.require(ToolParam::Content)?;
        let line: usize = line_raw.parse().map_err(|_| {
            ToolError::InvalidArguments(format!("'line' must be a number, got '{line_raw}'"))
        })?;
        let path = paths::resolve("insert_content", cwd, raw, &self.forbidden_paths)?;

        let failed = |e: std::io::Error| ToolError::ExecutionFailed {
            tool_name: "insert_content".into(),
            reason: format!("'{raw}': {e}"),
        };

        let original = tokio::fs::read_to_string(&path).await.map_err(failed)?;
        let updated = insert_lines(&original, line, content)?;
        tokio::fs::write(&path, updated).await.map_err(failed)?;

        let count = content.lines().count();
        let at = if line == 0 { "the end".to_string() } else { format!("line {line}") };
        Ok(ToolOutput::Text(format!("Inserted {count} lines at {at} of {raw}")))
    }
}

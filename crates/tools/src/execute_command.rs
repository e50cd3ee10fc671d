//! `execute_command`: run a shell command in the task directory.
//!
//! Supports command allowlisting and an optional working directory override.

use async_trait::async_trait;
use std::path::Path;
use tokio::process::Command;
use toolclaw_core::error::ToolError;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};
use tracing::{debug, warn};

/// Execute shell commands with an optional allowlist.
pub struct ExecuteCommandTool {
    /// If non-empty, only these base commands are allowed.
    allowed_commands: Vec<String>,
}

impl ExecuteCommandTool {
    pub fn new(allowed_commands: Vec<String>) -> Self {
        Self { allowed_commands }
    }

    fn is_command_allowed(&self, command: &str) -> bool {
        if self.allowed_commands.is_empty() {
            return true;
        }

        let base_cmd = command.split_whitespace().next().unwrap_or("").trim();
        self.allowed_commands.iter().any(|a| a == base_cmd)
    }
}

#[async_trait]
impl ToolHandler for ExecuteCommandTool {
    fn kind(&self) -> ToolKind {
        ToolKind::ExecuteCommand
    }

    fn description(&self, cwd: &Path) -> String {
        let mut text = format!(
            "## execute_command\n\
             Description: Run a CLI command and return its stdout and stderr. Commands run in {} \
             unless cwd is given.\n\
             Parameters:\n\
             - command: (required) The command line to execute\n\
             - cwd: (optional) Working directory for this command\n\
             Usage:\n\
             <execute_command>\n<command>cargo test</command>\n</execute_command>",
            cwd.display()
        );
        if !self.allowed_commands.is_empty() {
            text.push_str(&format!("\nAllowed commands: {}", self.allowed_commands.join(", ")));
        }
        text
    }

    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError> {
        let command = tool_use.require(ToolParam::Command)?;

        if !self.is_command_allowed(command) {
            return Err(ToolError::PermissionDenied {
                tool_name: "execute_command".into(),
                reason: format!(
                    "Command '{}' not in allowlist",
                    command.split_whitespace().next().unwrap_or("")
                ),
            });
        }

        let workdir = match tool_use.param(ToolParam::Cwd) {
            Some(dir) if !dir.is_empty() => cwd.join(dir),
            _ => cwd.to_path_buf(),
        };

        debug!(command = %command, cwd = %workdir.display(), "Executing command");

        let output = if cfg!(target_os = "windows") {
            Command::new("cmd").args(["/C", command]).current_dir(&workdir).output().await
        } else {
            Command::new("sh").args(["-c", command]).current_dir(&workdir).output().await
        };

        let output = output.map_err(|e| ToolError::ExecutionFailed {
            tool_name: "execute_command".into(),
            reason: e.to_string(),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();

        let text = if output.status.success() {
            if stderr.is_empty() {
                stdout
            } else {
                format!("{stdout}\n[stderr]: {stderr}")
            }
        } else {
            let code = output.status.code().unwrap_or(-1);
            warn!(command = %command, exit_code = code, "Command failed");
            format!("[exit code: {code}]\n{stdout}\n{stderr}")
        };

        let text = text.trim();
        Ok(ToolOutput::Text(if text.is_empty() {
            "(command produced no output)".into()
        } else {
            text.to_string()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allowlist_check() {
        let tool = ExecuteCommandTool::new(vec!["ls".into(), "cat".into(), "git".into()]);
        assert!(tool.is_command_allowed("ls -la"));
        assert!(tool.is_command_allowed("git status"));
        assert!(!tool.is_command_allowed("rm -rf /"));
    }

    #[test]
    fn empty_allowlist_allows_all() {
        let tool = ExecuteCommandTool::new(vec![]);
        assert!(tool.is_command_allowed("anything goes"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn runs_in_task_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("marker.txt"), "").unwrap();
        let call = ToolUse::new("execute_command").with_param(ToolParam::Command, "ls");
        let out = ExecuteCommandTool::new(vec![])
            .execute(&call, dir.path())
            .await
            .unwrap()
            .into_text();
        assert_eq!(out, "marker.txt");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn nonzero_exit_is_reported_not_raised() {
        let call = ToolUse::new("execute_command").with_param(ToolParam::Command, "exit 3");
        let out = ExecuteCommandTool::new(vec![])
            .execute(&call, Path::new("/"))
            .await
            .unwrap()
            .into_text();
        assert!(out.starts_with("[exit code: 3]"));
    }

    #[tokio::test]
    async fn blocked_command() {
        let tool = ExecuteCommandTool::new(vec!["ls".into()]);
        let call = ToolUse::new("execute_command").with_param(ToolParam::Command, "rm -rf /");
        let result = tool.execute(&call, Path::new("/")).await;
        assert!(matches!(result, Err(ToolError::PermissionDenied { .. })));
    }
}

//! `new_task`: run a sub-task in another mode.

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;
use toolclaw_config::ToolsConfig;
use toolclaw_core::error::ToolError;
use toolclaw_core::mode::find_mode;
use toolclaw_core::provider::Provider;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};
use toolclaw_store::TaskStore;
use toolclaw_tools::default_dispatcher;
use tracing::info;

use crate::controller::ExecutionController;
use crate::run_config::RunConfig;

/// Starts a nested run with the parent's settings and the requested mode.
///
/// The nested run only gets the built-in tools, so a sub-task cannot spawn
/// further sub-tasks.
pub struct NewTaskTool {
    provider: Arc<dyn Provider>,
    store: Arc<TaskStore>,
    tools: ToolsConfig,
    config: RunConfig,
}

impl NewTaskTool {
    pub fn new(provider: Arc<dyn Provider>, store: Arc<TaskStore>, tools: ToolsConfig, config: RunConfig) -> Self {
        Self {
            provider,
            store,
            tools,
            config,
        }
    }
}

#[async_trait]
impl ToolHandler for NewTaskTool {
    fn kind(&self) -> ToolKind {
        ToolKind::NewTask
    }

    fn description(&self, _cwd: &Path) -> String {
        "## new_task\n\
         Description: Start a sub-task in another mode. The sub-task runs to \
         completion and its result is returned.\n\
         Parameters:\n\
         - mode: (required) Slug of the mode to run in (e.g. \"code\", \"ask\")\n\
         - message: (required) Instructions for the sub-task\n\
         Usage:\n\
         <new_task>\n<mode>ask</mode>\n<message>Explain the build setup</message>\n</new_task>"
            .into()
    }

    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError> {
        let mode = tool_use.require(ToolParam::Mode)?;
        let message = tool_use.require(ToolParam::Message)?;
        if find_mode(mode, &self.config.custom_modes).is_none() {
            return Err(ToolError::InvalidArguments(format!("Unknown mode '{mode}'")));
        }

        let mut config = self.config.clone().with_mode(mode);
        config.cwd = cwd.to_path_buf();
        info!(mode = %mode, "Starting sub-task");

        let controller = ExecutionController::new(
            Arc::clone(&self.provider),
            Arc::new(default_dispatcher(&self.tools)),
            Arc::clone(&self.store),
            config,
        );
        let result = controller
            .run(message, None)
            .await
            .map_err(|e| ToolError::ExecutionFailed {
                tool_name: "new_task".into(),
                reason: e.to_string(),
            })?;

        Ok(ToolOutput::Text(format!(
            "Subtask {} ({}):\n{}",
            result.task_id, result.status, result.output
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{memory_store, SequentialMockProvider};
    use toolclaw_core::message::Role;

    fn tool(provider: Arc<SequentialMockProvider>, store: Arc<TaskStore>) -> NewTaskTool {
        NewTaskTool::new(provider, store, ToolsConfig::default(), RunConfig::new("m", "/tmp"))
    }

    #[tokio::test]
    async fn runs_subtask_in_requested_mode() {
        let store = memory_store();
        let provider = Arc::new(SequentialMockProvider::texts(&["It builds with cargo."]));
        let call = ToolUse::new("new_task")
            .with_param(ToolParam::Mode, "ask")
            .with_param(ToolParam::Message, "How does it build?");

        let dir = tempfile::tempdir().unwrap();
        let output = tool(Arc::clone(&provider), Arc::clone(&store))
            .execute(&call, dir.path())
            .await
            .unwrap()
            .into_text();
        assert!(output.starts_with("Subtask "));
        assert!(output.contains("(done)"));
        assert!(output.ends_with("It builds with cargo."));

        let request = &provider.requests()[0];
        assert!(request.system_prompt.contains("Current mode: Ask (ask)"));
        assert!(!request.system_prompt.contains("## write_to_file"));
        assert_eq!(request.messages[0].role, Role::User);
    }

    #[tokio::test]
    async fn unknown_mode_is_rejected() {
        let provider = Arc::new(SequentialMockProvider::texts(&[]));
        let call = ToolUse::new("new_task")
            .with_param(ToolParam::Mode, "wizard")
            .with_param(ToolParam::Message, "x");
        let err = tool(Arc::clone(&provider), memory_store())
            .execute(&call, Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
        assert_eq!(provider.call_count(), 0);
    }

    #[tokio::test]
    async fn missing_message_is_rejected() {
        let call = ToolUse::new("new_task").with_param(ToolParam::Mode, "ask");
        let err = tool(Arc::new(SequentialMockProvider::texts(&[])), memory_store())
            .execute(&call, Path::new("/tmp"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}

//! Tool dispatcher: routes a [`ToolUse`] to its registered handler.
//!
//! The controller uses this to:
//! 1. Check whether a requested tool may run in the current mode
//! 2. Render tool descriptions into the system prompt
//! 3. Execute the tool and get back text for the next turn

use std::collections::HashMap;
use std::path::Path;
use toolclaw_core::error::ToolError;
use toolclaw_core::mode::ModeConfig;
use toolclaw_core::tool::{ToolHandler, ToolKind, ToolUse};
use tracing::{debug, warn};

use crate::permissions::ModeCapabilities;

/// Registry of tool handlers keyed by [`ToolKind`].
pub struct ToolDispatcher {
    handlers: HashMap<ToolKind, Box<dyn ToolHandler>>,
}

impl ToolDispatcher {
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Register a handler. Replaces any existing handler for the same kind.
    pub fn register(&mut self, handler: Box<dyn ToolHandler>) {
        self.handlers.insert(handler.kind(), handler);
    }

    /// Builder-style registration.
    pub fn with_handler(mut self, handler: Box<dyn ToolHandler>) -> Self {
        self.register(handler);
        self
    }

    pub fn has(&self, kind: ToolKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    /// Registered kinds, in declaration order.
    pub fn kinds(&self) -> Vec<ToolKind> {
        ToolKind::ALL
            .into_iter()
            .filter(|k| self.handlers.contains_key(k))
            .collect()
    }

    /// Resolve `tool_name` and check that `mode` may run it.
    pub fn check(
        &self,
        tool_name: &str,
        mode: &str,
        custom_modes: &[ModeConfig],
    ) -> Result<ToolKind, ToolError> {
        let kind =
            ToolKind::from_name(tool_name).ok_or_else(|| ToolError::NotFound(tool_name.into()))?;
        if !ModeCapabilities::new(custom_modes).allows_tool(mode, kind) {
            return Err(ToolError::UnavailableInMode {
                tool_name: tool_name.into(),
                mode: mode.into(),
            });
        }
        Ok(kind)
    }

    /// Usage text for the system prompt. Empty when no handler is registered.
    pub fn describe(&self, tool_name: &str, cwd: &Path) -> String {
        ToolKind::from_name(tool_name)
            .and_then(|k| self.handlers.get(&k))
            .map(|h| h.description(cwd))
            .unwrap_or_default()
    }

    /// Descriptions of every registered tool `mode` may run.
    pub fn describe_for_mode(&self, mode: &str, custom_modes: &[ModeConfig], cwd: &Path) -> Vec<String> {
        ModeCapabilities::new(custom_modes)
            .tools_for(mode)
            .into_iter()
            .filter_map(|k| self.handlers.get(&k))
            .map(|h| h.description(cwd))
            .collect()
    }

    /// Execute a tool call. Never fails: errors come back as text for the model.
    pub async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> String {
        let Some(handler) = tool_use.kind().and_then(|k| self.handlers.get(&k)) else {
            warn!(tool = %tool_use.name, "No handler registered");
            return format!("Error: Tool '{}' not found", tool_use.name);
        };

        debug!(tool = %tool_use.name, params = tool_use.params.len(), "Executing tool");

        match handler.execute(tool_use, cwd).await {
            Ok(output) => output.into_text(),
            Err(e) => {
                warn!(tool = %tool_use.name, error = %e, "Tool execution failed");
                format!("Error executing tool {}: {}", tool_use.name, error_message(&e))
            }
        }
    }
}

impl Default for ToolDispatcher {
    fn default() -> Self {
        Self::new()
    }
}

fn error_message(error: &ToolError) -> String {
    match error {
        ToolError::ExecutionFailed { reason, .. } => reason.clone(),
        ToolError::InvalidArguments(msg) => msg.clone(),
        other => other.to_string(),
    }
}

//! Tool permissions, dispatch and built-in tools for toolclaw.
//!
//! Tools give the model the ability to act on the task directory:
//! read, list, search and edit files, and run shell commands. Which tools a
//! mode may use is decided by [`ModeCapabilities`].

pub mod dispatcher;
pub mod execute_command;
pub mod insert_content;
pub mod list_files;
pub mod paths;
pub mod permissions;
pub mod read_file;
pub mod search_files;
pub mod write_to_file;

pub use dispatcher::ToolDispatcher;
pub use permissions::{is_available, ModeCapabilities};

use toolclaw_config::ToolsConfig;

/// Create a dispatcher with every built-in tool registered.
///
/// `browser_action`, the MCP tools and `switch_mode` have no built-in
/// handler; `new_task` is registered by the agent crate.
pub fn default_dispatcher(config: &ToolsConfig) -> ToolDispatcher {
    let forbidden = config.forbidden_paths.clone();
    ToolDispatcher::new()
        .with_handler(Box::new(read_file::ReadFileTool::with_forbidden_paths(forbidden.clone())))
        .with_handler(Box::new(
            list_files::ListFilesTool::new(config.max_list_entries).with_forbidden_paths(forbidden.clone()),
        ))
        .with_handler(Box::new(
            search_files::SearchFilesTool::new(config.max_search_results)
                .with_forbidden_paths(forbidden.clone()),
        ))
        .with_handler(Box::new(write_to_file::WriteToFileTool::with_forbidden_paths(
            forbidden.clone(),
        )))
        .with_handler(Box::new(insert_content::InsertContentTool::with_forbidden_paths(forbidden)))
        .with_handler(Box::new(execute_command::ExecuteCommandTool::new(
            config.allowed_commands.clone(),
        )))
}

#[cfg(test)]
mod tests {
    use super::*;
    use toolclaw_core::tool::ToolKind;

    #[test]
    fn default_dispatcher_registers_builtins() {
        let d = default_dispatcher(&ToolsConfig::default());
        assert_eq!(
            d.kinds(),
            vec![
                ToolKind::ReadFile,
                ToolKind::ListFiles,
                ToolKind::SearchFiles,
                ToolKind::WriteToFile,
                ToolKind::InsertContent,
                ToolKind::ExecuteCommand,
            ]
        );
        assert!(!d.has(ToolKind::BrowserAction));
    }

    #[test]
    fn ask_mode_descriptions_omit_edit_tools() {
        let d = default_dispatcher(&ToolsConfig::default());
        let docs = d.describe_for_mode("ask", &[], std::path::Path::new("/work")).join("\n");
        assert!(docs.contains("## read_file"));
        assert!(!docs.contains("## write_to_file"));
    }
}

//! Tool abstractions: the closed set of agent capabilities.
//!
//! Tools are requested by the model with tag markup such as
//! `<read_file><path>src/main.rs</path></read_file>`. The set of tool names
//! is closed ([`ToolKind`]); each tool belongs to exactly one permission
//! [`ToolGroup`], and the compiler checks that mapping exhaustively.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use crate::error::ToolError;

/// Permission groups a mode can grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolGroup {
    Read,
    Edit,
    Browser,
    Command,
    Mcp,
    /// Mode switching and sub-tasks. Granted in every mode.
    Modes,
}

impl ToolGroup {
    pub const ALL: [ToolGroup; 6] = [
        ToolGroup::Read,
        ToolGroup::Edit,
        ToolGroup::Browser,
        ToolGroup::Command,
        ToolGroup::Mcp,
        ToolGroup::Modes,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Read => "read",
            Self::Edit => "edit",
            Self::Browser => "browser",
            Self::Command => "command",
            Self::Mcp => "mcp",
            Self::Modes => "modes",
        }
    }
}

impl std::fmt::Display for ToolGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Every tool the model may request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolKind {
    ReadFile,
    ListFiles,
    SearchFiles,
    WriteToFile,
    InsertContent,
    BrowserAction,
    ExecuteCommand,
    UseMcpTool,
    AccessMcpResource,
    SwitchMode,
    NewTask,
}

impl ToolKind {
    pub const ALL: [ToolKind; 11] = [
        ToolKind::ReadFile,
        ToolKind::ListFiles,
        ToolKind::SearchFiles,
        ToolKind::WriteToFile,
        ToolKind::InsertContent,
        ToolKind::BrowserAction,
        ToolKind::ExecuteCommand,
        ToolKind::UseMcpTool,
        ToolKind::AccessMcpResource,
        ToolKind::SwitchMode,
        ToolKind::NewTask,
    ];

    /// The tag name used in model output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadFile => "read_file",
            Self::ListFiles => "list_files",
            Self::SearchFiles => "search_files",
            Self::WriteToFile => "write_to_file",
            Self::InsertContent => "insert_content",
            Self::BrowserAction => "browser_action",
            Self::ExecuteCommand => "execute_command",
            Self::UseMcpTool => "use_mcp_tool",
            Self::AccessMcpResource => "access_mcp_resource",
            Self::SwitchMode => "switch_mode",
            Self::NewTask => "new_task",
        }
    }

    /// Look up a tool by its tag name. Unknown names return `None`.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == name)
    }

    /// The permission group this tool belongs to.
    pub fn group(&self) -> ToolGroup {
        match self {
            Self::ReadFile | Self::ListFiles | Self::SearchFiles => ToolGroup::Read,
            Self::WriteToFile | Self::InsertContent => ToolGroup::Edit,
            Self::BrowserAction => ToolGroup::Browser,
            Self::ExecuteCommand => ToolGroup::Command,
            Self::UseMcpTool | Self::AccessMcpResource => ToolGroup::Mcp,
            Self::SwitchMode | Self::NewTask => ToolGroup::Modes,
        }
    }

    /// Parameters the tool cannot run without.
    pub fn required_params(&self) -> &'static [ToolParam] {
        use ToolParam::*;
        match self {
            Self::ReadFile => &[Path],
            Self::ListFiles => &[Path],
            Self::SearchFiles => &[Path, Regex],
            Self::WriteToFile => &[Path, Content],
            Self::InsertContent => &[Path, Line, Content],
            Self::BrowserAction => &[Action],
            Self::ExecuteCommand => &[Command],
            Self::UseMcpTool => &[ServerName, ToolName],
            Self::AccessMcpResource => &[ServerName, Uri],
            Self::SwitchMode => &[ModeSlug],
            Self::NewTask => &[Mode, Message],
        }
    }

    /// Parameters the tool accepts but can do without.
    pub fn optional_params(&self) -> &'static [ToolParam] {
        use ToolParam::*;
        match self {
            Self::ReadFile => &[StartLine, EndLine],
            Self::ListFiles => &[Recursive],
            Self::SearchFiles => &[FilePattern],
            Self::ExecuteCommand => &[Cwd],
            Self::BrowserAction => &[Url, Coordinate, Text],
            Self::UseMcpTool => &[Arguments],
            Self::SwitchMode => &[Reason],
            Self::WriteToFile
            | Self::InsertContent
            | Self::AccessMcpResource
            | Self::NewTask => &[],
        }
    }
}

impl std::fmt::Display for ToolKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Parameter names recognised inside a tool tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ToolParam {
    Path,
    Content,
    Line,
    StartLine,
    EndLine,
    Recursive,
    Regex,
    FilePattern,
    Command,
    Cwd,
    Action,
    Url,
    Coordinate,
    Text,
    ServerName,
    ToolName,
    Arguments,
    Uri,
    ModeSlug,
    Reason,
    Mode,
    Message,
}

impl ToolParam {
    pub const ALL: [ToolParam; 22] = [
        ToolParam::Path,
        ToolParam::Content,
        ToolParam::Line,
        ToolParam::StartLine,
        ToolParam::EndLine,
        ToolParam::Recursive,
        ToolParam::Regex,
        ToolParam::FilePattern,
        ToolParam::Command,
        ToolParam::Cwd,
        ToolParam::Action,
        ToolParam::Url,
        ToolParam::Coordinate,
        ToolParam::Text,
        ToolParam::ServerName,
        ToolParam::ToolName,
        ToolParam::Arguments,
        ToolParam::Uri,
        ToolParam::ModeSlug,
        ToolParam::Reason,
        ToolParam::Mode,
        ToolParam::Message,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Path => "path",
            Self::Content => "content",
            Self::Line => "line",
            Self::StartLine => "start_line",
            Self::EndLine => "end_line",
            Self::Recursive => "recursive",
            Self::Regex => "regex",
            Self::FilePattern => "file_pattern",
            Self::Command => "command",
            Self::Cwd => "cwd",
            Self::Action => "action",
            Self::Url => "url",
            Self::Coordinate => "coordinate",
            Self::Text => "text",
            Self::ServerName => "server_name",
            Self::ToolName => "tool_name",
            Self::Arguments => "arguments",
            Self::Uri => "uri",
            Self::ModeSlug => "mode_slug",
            Self::Reason => "reason",
            Self::Mode => "mode",
            Self::Message => "message",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str() == name)
    }
}

/// A normalized request to run one tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    /// Tool name as the model wrote it (may be unknown)
    pub name: String,

    /// Parameter values, already trimmed
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

impl ToolUse {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: BTreeMap::new(),
        }
    }

    /// Builder-style parameter insertion.
    pub fn with_param(mut self, param: ToolParam, value: impl Into<String>) -> Self {
        self.params.insert(param.as_str().to_string(), value.into());
        self
    }

    /// The tool kind, if the name is known.
    pub fn kind(&self) -> Option<ToolKind> {
        ToolKind::from_name(&self.name)
    }

    pub fn param(&self, param: ToolParam) -> Option<&str> {
        self.params.get(param.as_str()).map(String::as_str)
    }

    /// A parameter that must be present and non-empty.
    pub fn require(&self, param: ToolParam) -> Result<&str, ToolError> {
        match self.param(param) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(ToolError::InvalidArguments(format!(
                "Missing '{}' parameter for {}",
                param.as_str(),
                self.name
            ))),
        }
    }

    /// Short human-readable label, e.g. `read_file for 'src/lib.rs'`.
    pub fn label(&self) -> String {
        let target = self
            .param(ToolParam::Path)
            .or_else(|| self.param(ToolParam::Command))
            .or_else(|| self.param(ToolParam::Mode));
        match target {
            Some(t) => format!("{} for '{}'", self.name, t),
            None => self.name.clone(),
        }
    }
}

/// What a tool handler returns: plain text or a `{text}` wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolOutput {
    Text(String),
    Wrapped { text: String },
}

impl ToolOutput {
    /// Normalize to plain text.
    pub fn into_text(self) -> String {
        match self {
            Self::Text(text) | Self::Wrapped { text } => text,
        }
    }
}

impl From<String> for ToolOutput {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for ToolOutput {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

/// The core tool handler trait.
///
/// Each capability implements this trait and is registered in the
/// dispatcher under its [`ToolKind`].
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Which tool this handler implements.
    fn kind(&self) -> ToolKind;

    /// Usage description rendered into the system prompt.
    fn description(&self, cwd: &Path) -> String;

    /// Execute the tool. Relative paths resolve against `cwd`.
    async fn execute(&self, tool_use: &ToolUse, cwd: &Path) -> Result<ToolOutput, ToolError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_names_roundtrip() {
        for kind in ToolKind::ALL {
            assert_eq!(ToolKind::from_name(kind.as_str()), Some(kind));
        }
        assert_eq!(ToolKind::from_name("rm_rf"), None);
    }

    #[test]
    fn param_names_roundtrip() {
        for param in ToolParam::ALL {
            assert_eq!(ToolParam::from_name(param.as_str()), Some(param));
        }
    }

    #[test]
    fn groups_cover_expected_tools() {
        assert_eq!(ToolKind::WriteToFile.group(), ToolGroup::Edit);
        assert_eq!(ToolKind::ReadFile.group(), ToolGroup::Read);
        assert_eq!(ToolKind::ExecuteCommand.group(), ToolGroup::Command);
        assert_eq!(ToolKind::NewTask.group(), ToolGroup::Modes);
    }

    #[test]
    fn required_params_are_known_params() {
        for kind in ToolKind::ALL {
            for p in kind.required_params().iter().chain(kind.optional_params()) {
                assert!(ToolParam::ALL.contains(p));
            }
        }
    }

    #[test]
    fn require_rejects_missing_and_empty() {
        let tu = ToolUse::new("read_file").with_param(ToolParam::Path, "");
        assert!(matches!(
            tu.require(ToolParam::Path),
            Err(ToolError::InvalidArguments(_))
        ));
        let tu = ToolUse::new("read_file").with_param(ToolParam::Path, "a.txt");
        assert_eq!(tu.require(ToolParam::Path).unwrap(), "a.txt");
        assert_eq!(tu.label(), "read_file for 'a.txt'");
    }

    #[test]
    fn tool_output_normalizes_both_shapes() {
        assert_eq!(ToolOutput::from("plain").into_text(), "plain");
        let wrapped: ToolOutput = serde_json::from_str(r#"{"text":"inner"}"#).unwrap();
        assert_eq!(wrapped.into_text(), "inner");
    }
}

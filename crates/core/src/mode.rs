//! Modes: named behavioral profiles.
//!
//! A mode decides which [`ToolGroup`]s are usable and how the system prompt
//! frames the model's role. Built-in modes and user-defined custom modes
//! share the same [`ModeConfig`] shape.

use serde::{Deserialize, Serialize};
use crate::tool::ToolGroup;

/// Mode used when the caller does not name one.
pub const DEFAULT_MODE: &str = "code";

/// Slugs of the built-in modes.
pub const BUILTIN_MODES: [&str; 4] = ["code", "architect", "ask", "debug"];

/// A mode definition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModeConfig {
    /// Identifier used on the command line and in tasks (e.g. "code")
    pub slug: String,

    /// Display name
    pub name: String,

    /// Opening paragraph of the system prompt
    pub role_definition: String,

    /// Tool groups this mode grants
    pub groups: Vec<ToolGroup>,

    /// Extra instructions appended to the system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_instructions: Option<String>,
}

impl ModeConfig {
    pub fn allows(&self, group: ToolGroup) -> bool {
        self.groups.contains(&group)
    }
}

/// The built-in mode table.
///
/// `ask` is the only built-in mode without the `edit` group.
pub fn builtin_modes() -> Vec<ModeConfig> {
    use ToolGroup::*;
    vec![
        ModeConfig {
            slug: "code".into(),
            name: "Code".into(),
            role_definition: "You are a highly skilled software engineer with extensive knowledge \
                in many programming languages, frameworks, design patterns, and best practices."
                .into(),
            groups: vec![Read, Edit, Browser, Command, Mcp, Modes],
            custom_instructions: None,
        },
        ModeConfig {
            slug: "architect".into(),
            name: "Architect".into(),
            role_definition: "You are an experienced technical leader who is inquisitive and an \
                excellent planner. You gather context and produce a detailed plan before any \
                implementation starts."
                .into(),
            groups: vec![Read, Edit, Browser, Command, Mcp, Modes],
            custom_instructions: None,
        },
        ModeConfig {
            slug: "ask".into(),
            name: "Ask".into(),
            role_definition: "You are a knowledgeable technical assistant focused on answering \
                questions about software development, technology, and related topics. You do not \
                modify files."
                .into(),
            groups: vec![Read, Browser, Command, Mcp, Modes],
            custom_instructions: None,
        },
        ModeConfig {
            slug: "debug".into(),
            name: "Debug".into(),
            role_definition: "You are an expert software debugger specializing in systematic \
                problem diagnosis and resolution."
                .into(),
            groups: vec![Read, Edit, Browser, Command, Mcp, Modes],
            custom_instructions: None,
        },
    ]
}

/// Resolve a mode slug: custom modes first, then built-ins.
pub fn find_mode(slug: &str, custom_modes: &[ModeConfig]) -> Option<ModeConfig> {
    custom_modes
        .iter()
        .find(|m| m.slug == slug)
        .cloned()
        .or_else(|| builtin_modes().into_iter().find(|m| m.slug == slug))
}

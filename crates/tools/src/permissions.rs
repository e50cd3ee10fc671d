//! Mode capability table.
//!
//! Maps every mode slug to the tool groups it grants. Custom modes replace
//! built-in entries with the same slug; an unknown slug that is not a custom
//! mode falls back to the default mode's entry.

use std::collections::{HashMap, HashSet};
use toolclaw_core::mode::{builtin_modes, ModeConfig, DEFAULT_MODE};
use toolclaw_core::tool::{ToolGroup, ToolKind};

/// Mode slug → allowed tool groups.
#[derive(Debug, Clone)]
pub struct ModeCapabilities {
    table: HashMap<String, HashSet<ToolGroup>>,
}

impl ModeCapabilities {
    /// Build the table from the built-in modes plus `custom_modes`.
    pub fn new(custom_modes: &[ModeConfig]) -> Self {
        let mut table = HashMap::new();
        for mode in builtin_modes().iter().chain(custom_modes) {
            table.insert(mode.slug.clone(), mode.groups.iter().copied().collect());
        }
        Self { table }
    }

    /// Groups granted to `mode`.
    pub fn groups(&self, mode: &str) -> HashSet<ToolGroup> {
        let mut groups = self
            .table
            .get(mode)
            .or_else(|| self.table.get(DEFAULT_MODE))
            .cloned()
            .unwrap_or_default();
        groups.insert(ToolGroup::Modes);
        groups
    }

    pub fn allows(&self, mode: &str, group: ToolGroup) -> bool {
        group == ToolGroup::Modes || self.groups(mode).contains(&group)
    }

    /// Whether `kind` may run under `mode`.
    pub fn allows_tool(&self, mode: &str, kind: ToolKind) -> bool {
        self.allows(mode, kind.group())
    }

    /// Every known tool `mode` may run, in declaration order.
    pub fn tools_for(&self, mode: &str) -> Vec<ToolKind> {
        let groups = self.groups(mode);
        ToolKind::ALL
            .into_iter()
            .filter(|k| groups.contains(&k.group()))
            .collect()
    }
}

impl Default for ModeCapabilities {
    fn default() -> Self {
        Self::new(&[])
    }
}

/// Whether the tool named `tool_name` may run under `mode`.
///
/// Unknown tool names are never available.
pub fn is_available(tool_name: &str, mode: &str, custom_modes: &[ModeConfig]) -> bool {
    match ToolKind::from_name(tool_name) {
        Some(kind) => ModeCapabilities::new(custom_modes).allows_tool(mode, kind),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reviewer() -> ModeConfig {
        ModeConfig {
            slug: "reviewer".into(),
            name: "Reviewer".into(),
            role_definition: "Review only.".into(),
            groups: vec![ToolGroup::Read],
            custom_instructions: None,
        }
    }

    #[test]
    fn ask_mode_cannot_edit() {
        assert!(!is_available("write_to_file", "ask", &[]));
        assert!(!is_available("insert_content", "ask", &[]));
        assert!(is_available("read_file", "ask", &[]));
        assert!(is_available("execute_command", "ask", &[]));
    }

    #[test]
    fn full_modes_allow_everything() {
        for mode in ["code", "architect", "debug"] {
            for kind in ToolKind::ALL {
                assert!(is_available(kind.as_str(), mode, &[]), "{kind} in {mode}");
            }
        }
    }

    #[test]
    fn unknown_tool_is_unavailable() {
        assert!(!is_available("rm_rf", "code", &[]));
    }

    #[test]
    fn unknown_mode_falls_back_to_code() {
        assert!(is_available("write_to_file", "nonexistent", &[]));
    }

    #[test]
    fn custom_mode_limits_groups_but_keeps_modes() {
        let custom = vec![reviewer()];
        assert!(is_available("read_file", "reviewer", &custom));
        assert!(!is_available("execute_command", "reviewer", &custom));
        assert!(is_available("new_task", "reviewer", &custom));
    }

    #[test]
    fn custom_mode_overrides_builtin() {
        let mut locked = reviewer();
        locked.slug = "code".into();
        assert!(!is_available("write_to_file", "code", &[locked]));
    }

    #[test]
    fn tools_for_ask_excludes_edit_group() {
        let tools = ModeCapabilities::default().tools_for("ask");
        assert!(tools.contains(&ToolKind::ReadFile));
        assert!(!tools.iter().any(|k| k.group() == ToolGroup::Edit));
    }
}

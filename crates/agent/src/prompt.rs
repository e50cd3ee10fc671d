//! System prompt assembly.

use std::path::Path;
use toolclaw_core::mode::{builtin_modes, find_mode, ModeConfig, DEFAULT_MODE};

/// Resolve a mode slug; unknown slugs fall back to the default mode.
pub fn resolve_mode(slug: &str, custom_modes: &[ModeConfig]) -> ModeConfig {
    find_mode(slug, custom_modes)
        .or_else(|| find_mode(DEFAULT_MODE, custom_modes))
        .unwrap_or_else(|| builtin_modes().remove(0))
}

const TOOL_USE_RULES: &str = "\
TOOL USE

You have access to a set of tools that run on the user's machine. Use one tool \
per message; the result comes back in the next message. Use tools step by step, \
each informed by the result of the previous one.

Tool uses are formatted with XML-style tags. The tool name is the enclosing tag \
and each parameter is its own tag inside it:

<tool_name>
<parameter1_name>value1</parameter1_name>
<parameter2_name>value2</parameter2_name>
</tool_name>

Always close every tag. When the task is complete, reply with a summary of the \
result and no tool use.";

/// Build the system prompt for `mode`.
///
/// `tool_docs` are the descriptions of the tools the mode may use.
pub fn build_system_prompt(mode: &ModeConfig, tool_docs: &[String], cwd: &Path, auto: bool) -> String {
    let mut prompt = format!("{}\n\n====\n\n{TOOL_USE_RULES}\n\n# Tools\n\n", mode.role_definition.trim());
    if tool_docs.is_empty() {
        prompt.push_str("(no tools are available in this mode)");
    } else {
        prompt.push_str(&tool_docs.join("\n\n"));
    }

    prompt.push_str(&format!(
        "\n\n====\n\nSYSTEM INFORMATION\n\nCurrent working directory: {}\nCurrent mode: {} ({})",
        cwd.display(),
        mode.name,
        mode.slug
    ));

    if auto {
        prompt.push_str(
            "\n\n====\n\nAUTONOMOUS EXECUTION\n\nNo user is watching this run. Proceed without \
             asking for confirmation and make reasonable assumptions where details are missing.",
        );
    }

    if let Some(extra) = mode.custom_instructions.as_deref().filter(|s| !s.trim().is_empty()) {
        prompt.push_str(&format!("\n\n====\n\nMODE INSTRUCTIONS\n\n{}", extra.trim()));
    }

    prompt
}

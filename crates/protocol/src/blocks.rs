//! Content blocks produced by the scanner.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use toolclaw_core::tool::{ToolKind, ToolUse};

/// Plain prose between tool invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextContent {
    pub content: String,
    /// More text may still arrive for this block.
    pub partial: bool,
}

/// A tool invocation written with tag markup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseBlock {
    pub name: ToolKind,
    pub params: BTreeMap<String, String>,
    /// The closing tag has not been seen yet.
    pub partial: bool,
}

impl ToolUseBlock {
    /// Normalize into the request handed to the dispatcher.
    pub fn to_tool_use(&self) -> ToolUse {
        ToolUse {
            name: self.name.as_str().to_string(),
            params: self.params.clone(),
        }
    }
}

/// One block of a parsed assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text(TextContent),
    ToolUse(ToolUseBlock),
}

impl ContentBlock {
    pub fn is_partial(&self) -> bool {
        match self {
            Self::Text(t) => t.partial,
            Self::ToolUse(t) => t.partial,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(t) => Some(&t.content),
            Self::ToolUse(_) => None,
        }
    }

    pub fn as_tool_use(&self) -> Option<&ToolUseBlock> {
        match self {
            Self::ToolUse(t) => Some(t),
            Self::Text(_) => None,
        }
    }
}

/// Join every text block, in order, separated by blank lines.
pub fn assistant_text(blocks: &[ContentBlock]) -> String {
    blocks
        .iter()
        .filter_map(ContentBlock::as_text)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Tool invocations whose closing tag was observed, in source order.
pub fn completed_tool_uses(blocks: &[ContentBlock]) -> Vec<&ToolUseBlock> {
    blocks
        .iter()
        .filter_map(ContentBlock::as_tool_use)
        .filter(|t| !t.partial)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tool(partial: bool) -> ContentBlock {
        let mut params = BTreeMap::new();
        params.insert("path".to_string(), ".".to_string());
        ContentBlock::ToolUse(ToolUseBlock {
            name: ToolKind::ListFiles,
            params,
            partial,
        })
    }

    #[test]
    fn serializes_with_type_tag() {
        let json = serde_json::to_value(tool(false)).unwrap();
        assert_eq!(json["type"], "tool_use");
        assert_eq!(json["name"], "list_files");
        assert_eq!(json["params"]["path"], ".");
    }

    #[test]
    fn completed_tool_uses_skips_partial() {
        let blocks = vec![
            ContentBlock::Text(TextContent {
                content: "Hi".into(),
                partial: false,
            }),
            tool(false),
            tool(true),
        ];
        assert_eq!(completed_tool_uses(&blocks).len(), 1);
        assert_eq!(assistant_text(&blocks), "Hi");
    }

    #[test]
    fn to_tool_use_keeps_params() {
        let ContentBlock::ToolUse(block) = tool(false) else {
            unreachable!()
        };
        let tu = block.to_tool_use();
        assert_eq!(tu.name, "list_files");
        assert_eq!(tu.params.get("path").map(String::as_str), Some("."));
    }
}

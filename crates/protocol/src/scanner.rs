//! Resumable scanner for tool-use markup in model output.
//!
//! The model writes at most one tool request per turn as tag markup inside
//! ordinary prose:
//!
//! ```text
//! I'll look at the directory first.
//! <list_files>
//! <path>src</path>
//! <recursive>true</recursive>
//! </list_files>
//! ```
//!
//! Grammar (informal, not XML):
//! ```text
//! message  = (text | tool_use)*
//! tool_use = "<" TOOL ">" (param | text)* "</" TOOL ">"
//! param    = "<" PARAM ">" value "</" PARAM ">"
//! TOOL     = one of ToolKind names
//! PARAM    = one of ToolParam names
//! ```
//!
//! The scanner keeps its position, open block and accumulator between calls,
//! so feeding a streamed reply chunk by chunk costs the same as scanning the
//! whole reply once.

use std::collections::BTreeMap;
use toolclaw_core::tool::{ToolKind, ToolParam};
use crate::blocks::{ContentBlock, TextContent, ToolUseBlock};

const CONTENT_OPEN: &str = "<content>";
const CONTENT_CLOSE: &str = "</content>";

/// Opening and closing tags, rendered once per scanner.
struct TagTable {
    tools: Vec<(ToolKind, String, String)>,
    params: Vec<(ToolParam, String, String)>,
}

impl TagTable {
    fn new() -> Self {
        Self {
            tools: ToolKind::ALL
                .into_iter()
                .map(|k| (k, format!("<{}>", k.as_str()), format!("</{}>", k.as_str())))
                .collect(),
            params: ToolParam::ALL
                .into_iter()
                .map(|p| (p, format!("<{}>", p.as_str()), format!("</{}>", p.as_str())))
                .collect(),
        }
    }

    fn tool_close(&self, kind: ToolKind) -> &str {
        self.tools
            .iter()
            .find(|(k, _, _)| *k == kind)
            .map(|(_, _, close)| close.as_str())
            .unwrap_or_default()
    }

    fn param_close(&self, param: ToolParam) -> &str {
        self.params
            .iter()
            .find(|(p, _, _)| *p == param)
            .map(|(_, _, close)| close.as_str())
            .unwrap_or_default()
    }
}

struct OpenTool {
    kind: ToolKind,
    /// Byte offset just past the opening tag.
    start: usize,
    params: BTreeMap<String, String>,
}

struct OpenParam {
    name: ToolParam,
    /// Byte offset just past the opening tag.
    start: usize,
}

/// Incremental parser over a growing assistant message.
pub struct MessageScanner {
    tags: TagTable,
    acc: String,
    completed: Vec<ContentBlock>,
    text_start: Option<usize>,
    tool: Option<OpenTool>,
    param: Option<OpenParam>,
}

impl MessageScanner {
    pub fn new() -> Self {
        Self {
            tags: TagTable::new(),
            acc: String::new(),
            completed: Vec::new(),
            text_start: None,
            tool: None,
            param: None,
        }
    }

    /// Scan another chunk of model output.
    pub fn feed(&mut self, chunk: &str) {
        for ch in chunk.chars() {
            self.acc.push(ch);
            self.step(ch);
        }
    }

    /// Everything fed so far.
    pub fn text(&self) -> &str {
        &self.acc
    }

    /// Bytes scanned so far.
    pub fn consumed(&self) -> usize {
        self.acc.len()
    }

    /// Whether a tool invocation is currently open.
    pub fn in_tool_use(&self) -> bool {
        self.tool.is_some()
    }

    /// Current view: completed blocks plus the open one, marked partial.
    pub fn blocks(&self) -> Vec<ContentBlock> {
        self.view(true)
    }

    /// End of stream. A trailing text block is complete; an unclosed tool
    /// invocation stays partial.
    pub fn finish(self) -> Vec<ContentBlock> {
        self.view(false)
    }

    fn step(&mut self, ch: char) {
        let len = self.acc.len();

        if let Some(param) = &self.param {
            let close = self.tags.param_close(param.name);
            if self.acc[param.start..].ends_with(close) {
                let value = self.acc[param.start..len - close.len()].trim().to_string();
                let name = param.name.as_str().to_string();
                if let Some(tool) = self.tool.as_mut() {
                    tool.params.insert(name, value);
                }
                self.param = None;
            }
            return;
        }

        if let Some(tool) = self.tool.as_mut() {
            let span = &self.acc[tool.start..];
            if span.ends_with(self.tags.tool_close(tool.kind)) {
                let block = ToolUseBlock {
                    name: tool.kind,
                    params: std::mem::take(&mut tool.params),
                    partial: false,
                };
                tracing::trace!(tool = %block.name, "Tool use block closed");
                self.completed.push(ContentBlock::ToolUse(block));
                self.tool = None;
                return;
            }

            let opened = self
                .tags
                .params
                .iter()
                .find(|(_, open, _)| span.ends_with(open.as_str()))
                .map(|(name, _, _)| *name);
            if let Some(name) = opened {
                self.param = Some(OpenParam { name, start: len });
            }

            // The payload of write_to_file may itself contain "</content>":
            // take the first opening tag and the last closing tag in the span.
            if tool.kind == ToolKind::WriteToFile && span.ends_with(CONTENT_CLOSE) {
                if let Some(content) = payload_between(span, true) {
                    tool.params.insert(ToolParam::Content.as_str().to_string(), content);
                }
            }
            return;
        }

        let opened = self
            .tags
            .tools
            .iter()
            .find(|(_, open, _)| self.acc.ends_with(open.as_str()))
            .map(|(kind, open, _)| (*kind, open.len()));
        if let Some((kind, tag_len)) = opened {
            self.close_text(len - tag_len);
            self.tool = Some(OpenTool {
                kind,
                start: len,
                params: BTreeMap::new(),
            });
            return;
        }

        if self.text_start.is_none() {
            self.text_start = Some(len - ch.len_utf8());
        }
    }

    fn close_text(&mut self, end: usize) {
        if let Some(start) = self.text_start.take() {
            let content = self.acc[start..end].trim();
            if !content.is_empty() {
                self.completed.push(ContentBlock::Text(TextContent {
                    content: content.to_string(),
                    partial: false,
                }));
            }
        }
    }

    fn view(&self, streaming: bool) -> Vec<ContentBlock> {
        let mut blocks = self.completed.clone();

        if let Some(tool) = &self.tool {
            let mut params = tool.params.clone();
            if let Some(param) = &self.param {
                let span = &self.acc[tool.start..];
                let value = if tool.kind == ToolKind::WriteToFile && param.name == ToolParam::Content {
                    payload_between(span, false).unwrap_or_default()
                } else {
                    self.acc[param.start..].trim().to_string()
                };
                params.insert(param.name.as_str().to_string(), value);
            }
            blocks.push(ContentBlock::ToolUse(ToolUseBlock {
                name: tool.kind,
                params,
                partial: true,
            }));
        } else if let Some(start) = self.text_start {
            let content = self.acc[start..].trim();
            if !content.is_empty() {
                blocks.push(ContentBlock::Text(TextContent {
                    content: content.to_string(),
                    partial: streaming,
                }));
            }
        }

        blocks
    }
}

impl Default for MessageScanner {
    fn default() -> Self {
        Self::new()
    }
}

/// Text between the first `<content>` and the last `</content>` of a tool
/// span. With `closed == false` the value runs to the end of the span.
fn payload_between(span: &str, closed: bool) -> Option<String> {
    let start = span.find(CONTENT_OPEN)? + CONTENT_OPEN.len();
    let end = if closed {
        span.rfind(CONTENT_CLOSE)?
    } else {
        span.len()
    };
    (end >= start).then(|| span[start..end].trim().to_string())
}

/// Parse a complete or partial assistant message in one call.
///
/// The input is treated as possibly incomplete: a trailing text block is
/// reported as partial. Use [`MessageScanner::finish`] once the stream has
/// ended.
pub fn parse_assistant_message(input: &str) -> Vec<ContentBlock> {
    let mut scanner = MessageScanner::new();
    scanner.feed(input);
    scanner.blocks()
}

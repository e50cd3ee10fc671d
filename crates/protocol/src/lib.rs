//! Tool-use markup protocol for toolclaw.
//!
//! Turns raw, possibly incomplete model output into an ordered list of
//! [`ContentBlock`]s: plain text and tool invocations. The scanner is
//! resumable, so the same instance can follow a streamed reply as it grows.

pub mod blocks;
pub mod scanner;

pub use blocks::{assistant_text, completed_tool_uses, ContentBlock, TextContent, ToolUseBlock};
pub use scanner::{parse_assistant_message, MessageScanner};

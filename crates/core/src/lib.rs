//! # toolclaw Core
//!
//! Domain types, traits, and error definitions for the toolclaw agentic
//! task loop. Every collaborator of the execution controller is a trait
//! here; implementations live in their respective crates:
//!
//! - [`Provider`]: the completion backend (`toolclaw-providers`)
//! - [`ToolHandler`]: a single tool capability (`toolclaw-tools`)
//!
//! All crates depend inward on this one.

pub mod error;
pub mod message;
pub mod mode;
pub mod provider;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use error::{BackendError, Error, Result, StoreError, ToolError};
pub use message::{Message, Role, Task, TaskId};
pub use mode::{builtin_modes, find_mode, ModeConfig, BUILTIN_MODES, DEFAULT_MODE};
pub use provider::{CompletionRequest, CompletionResponse, Provider, StreamChunk, Usage};
pub use tool::{ToolGroup, ToolHandler, ToolKind, ToolOutput, ToolParam, ToolUse};

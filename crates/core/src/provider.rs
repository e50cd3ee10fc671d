//! Provider trait: the abstraction over completion backends.
//!
//! A Provider sends the task history to a language model and returns its
//! reply, either complete or as a stream of chunks. The execution
//! controller depends only on this contract.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::BackendError;
use crate::message::Message;
use crate::tool::ToolUse;

/// One request to the completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// The model to use (e.g., "gpt-4o")
    pub model: String,

    /// System prompt, sent ahead of the history
    pub system_prompt: String,

    /// Full task history, oldest first (system message excluded)
    pub messages: Vec<Message>,

    /// Temperature (0.0 = deterministic)
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum tokens to generate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

fn default_temperature() -> f32 {
    0.0
}

impl CompletionRequest {
    /// The newest user or tool turn, i.e. what the model is answering.
    pub fn prompt(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| matches!(m.role, crate::message::Role::User | crate::message::Role::Tool))
            .map(|m| m.content.as_str())
    }
}

/// A complete (non-streaming) reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CompletionResponse {
    /// Raw assistant text, possibly containing tool tags
    pub text: String,

    /// Token usage statistics
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Native tool calls returned next to the text
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolUse>,
}

impl CompletionResponse {
    /// A plain text reply with no usage information.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A single chunk in a streaming reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StreamChunk {
    /// Text delta
    #[serde(default)]
    pub text: Option<String>,

    /// Native tool calls (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolUse>,

    /// Whether this is the final chunk
    #[serde(default)]
    pub done: bool,

    /// Usage info (typically only in the final chunk)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,
}

/// The core Provider trait.
#[async_trait]
pub trait Provider: Send + Sync {
    /// A human-readable name for this backend (e.g., "openai").
    fn name(&self) -> &str;

    /// Send a request and get a complete reply.
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, BackendError>;

    /// Send a request and get a stream of reply chunks.
    ///
    /// Default implementation calls `complete()` and wraps the result as a single chunk.
    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError> {
        let response = self.complete(request).await?;
        let (tx, rx) = tokio::sync::mpsc::channel(1);
        let _ = tx
            .send(Ok(StreamChunk {
                text: Some(response.text),
                tool_calls: response.tool_calls,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed;

    #[async_trait]
    impl Provider for Fixed {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn complete(&self, _request: CompletionRequest) -> Result<CompletionResponse, BackendError> {
            Ok(CompletionResponse {
                text: "hello".into(),
                usage: Some(Usage {
                    prompt_tokens: 3,
                    completion_tokens: 1,
                    total_tokens: 4,
                }),
                tool_calls: vec![],
            })
        }
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "m".into(),
            system_prompt: "sys".into(),
            messages: vec![Message::user("first"), Message::assistant("a"), Message::tool("result")],
            temperature: default_temperature(),
            max_tokens: None,
        }
    }

    #[test]
    fn prompt_is_latest_user_or_tool_turn() {
        assert_eq!(request().prompt(), Some("result"));
    }

    #[tokio::test]
    async fn default_stream_wraps_complete() {
        let mut rx = Fixed.stream(request()).await.unwrap();
        let chunk = rx.recv().await.unwrap().unwrap();
        assert!(chunk.done);
        assert_eq!(chunk.text.as_deref(), Some("hello"));
        assert_eq!(chunk.usage.unwrap().total_tokens, 4);
        assert!(rx.recv().await.is_none());
    }
}

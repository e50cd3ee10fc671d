//! Shared test helpers for controller tests.

use std::sync::{Arc, Mutex};
use toolclaw_core::error::BackendError;
use toolclaw_core::provider::{CompletionRequest, CompletionResponse, Provider, StreamChunk, Usage};
use toolclaw_store::{InMemorySink, TaskStore};

type Scripted = Result<CompletionResponse, BackendError>;

/// A mock provider that returns a sequence of scripted responses.
///
/// Each call to `complete` returns the next response in the queue. With
/// `repeat_last`, the final response is returned forever; otherwise running
/// out of responses panics.
pub struct SequentialMockProvider {
    responses: Vec<Scripted>,
    repeat_last: bool,
    /// Split streamed text into chunks of this many chars.
    chunk_chars: usize,
    call_count: Mutex<usize>,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl SequentialMockProvider {
    pub fn new(responses: Vec<Scripted>) -> Self {
        Self {
            responses,
            repeat_last: false,
            chunk_chars: 7,
            call_count: Mutex::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Text replies, in order.
    pub fn texts(texts: &[&str]) -> Self {
        Self::new(texts.iter().map(|t| Ok(make_text_response(t))).collect())
    }

    /// The same reply on every call.
    pub fn repeating(text: &str) -> Self {
        let mut provider = Self::texts(&[text]);
        provider.repeat_last = true;
        provider
    }

    pub fn call_count(&self) -> usize {
        *self.call_count.lock().unwrap()
    }

    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl Provider for SequentialMockProvider {
    fn name(&self) -> &str {
        "sequential_mock"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, BackendError> {
        self.requests.lock().unwrap().push(request);
        let mut count = self.call_count.lock().unwrap();
        let index = if *count >= self.responses.len() {
            assert!(
                self.repeat_last && !self.responses.is_empty(),
                "SequentialMockProvider: no more responses (call #{}, have {})",
                *count,
                self.responses.len()
            );
            self.responses.len() - 1
        } else {
            *count
        };
        *count += 1;
        self.responses[index].clone()
    }

    async fn stream(
        &self,
        request: CompletionRequest,
    ) -> Result<tokio::sync::mpsc::Receiver<Result<StreamChunk, BackendError>>, BackendError> {
        let response = self.complete(request).await?;
        let chars: Vec<char> = response.text.chars().collect();
        let (tx, rx) = tokio::sync::mpsc::channel(chars.len() / self.chunk_chars + 2);
        for piece in chars.chunks(self.chunk_chars) {
            let _ = tx
                .send(Ok(StreamChunk {
                    text: Some(piece.iter().collect()),
                    ..Default::default()
                }))
                .await;
        }
        let _ = tx
            .send(Ok(StreamChunk {
                text: None,
                tool_calls: response.tool_calls,
                done: true,
                usage: response.usage,
            }))
            .await;
        Ok(rx)
    }
}

/// A simple text response with fixed usage.
pub fn make_text_response(text: &str) -> CompletionResponse {
    CompletionResponse {
        text: text.into(),
        usage: Some(Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: 15,
        }),
        tool_calls: vec![],
    }
}

pub fn memory_store() -> Arc<TaskStore> {
    Arc::new(TaskStore::new(Arc::new(InMemorySink::new())))
}

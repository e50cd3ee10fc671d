//! OpenAI-compatible provider implementation.
//!
//! Works with: OpenAI, OpenRouter, Ollama, vLLM, Together AI, Fireworks AI,
//! and any OpenAI-compatible `/chat/completions` endpoint.
//!
//! Requests are non-streaming; `Provider::stream` falls back to the trait's
//! default, which wraps `complete` in a single chunk.

use async_trait::async_trait;
use std::collections::BTreeMap;
use serde::{Deserialize, Serialize};
use toolclaw_core::error::BackendError;
use toolclaw_core::message::{Message, Role};
use toolclaw_core::provider::*;
use toolclaw_core::tool::ToolUse;
use tracing::{debug, warn};

/// An OpenAI-compatible completion backend.
pub struct OpenAiCompatProvider {
    name: String,
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiCompatProvider {
    /// Create a new OpenAI-compatible provider.
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(300))
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create an OpenAI provider (convenience constructor).
    pub fn openai(api_key: impl Into<String>) -> Self {
        Self::new("openai", "https://api.openai.com/v1", api_key)
    }

    /// Create an OpenRouter provider (convenience constructor).
    pub fn openrouter(api_key: impl Into<String>) -> Self {
        Self::new("openrouter", "https://openrouter.ai/api/v1", api_key)
    }

    /// Create an Ollama provider (convenience constructor).
    pub fn ollama(base_url: Option<&str>) -> Self {
        Self::new("ollama", base_url.unwrap_or("http://localhost:11434/v1"), "ollama")
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// System prompt first, then the task history.
    ///
    /// Tool results carry no call id, so they are sent as user turns.
    fn to_api_messages(system_prompt: &str, messages: &[Message]) -> Vec<ApiMessage> {
        let system = (!system_prompt.is_empty()).then(|| ApiMessage {
            role: "system".into(),
            content: Some(system_prompt.to_string()),
            tool_calls: None,
        });

        system
            .into_iter()
            .chain(messages.iter().filter(|m| m.role != Role::System).map(|m| ApiMessage {
                role: match m.role {
                    Role::Assistant => "assistant".into(),
                    Role::User | Role::Tool | Role::System => "user".into(),
                },
                content: Some(m.content.clone()),
                tool_calls: None,
            }))
            .collect()
    }

    /// Flatten a function call's JSON arguments into string parameters.
    fn to_tool_use(call: ApiToolCall) -> ToolUse {
        let mut params = BTreeMap::new();
        match serde_json::from_str::<serde_json::Value>(&call.function.arguments) {
            Ok(serde_json::Value::Object(map)) => {
                for (key, value) in map {
                    let text = match value {
                        serde_json::Value::String(s) => s,
                        other => other.to_string(),
                    };
                    params.insert(key, text.trim().to_string());
                }
            }
            Ok(_) | Err(_) => {
                warn!(tool = %call.function.name, "Ignoring unparseable tool call arguments");
            }
        }
        ToolUse {
            name: call.function.name,
            params,
        }
    }
}

fn status_error(status: u16, body: String) -> BackendError {
    match status {
        429 => BackendError::RateLimited { retry_after_secs: 5 },
        401 | 403 => BackendError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ),
        _ => BackendError::ApiError {
            status_code: status,
            message: body,
        },
    }
}

#[async_trait]
impl Provider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, BackendError> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut body = serde_json::json!({
            "model": request.model,
            "messages": Self::to_api_messages(&request.system_prompt, &request.messages),
            "temperature": request.temperature,
            "stream": false,
        });

        if let Some(max_tokens) = request.max_tokens {
            body["max_tokens"] = serde_json::json!(max_tokens);
        }

        debug!(
            provider = %self.name,
            model = %request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| BackendError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "Backend returned error");
            return Err(status_error(status, error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse response: {e}")))?;

        parse_response(api_response)
    }
}

fn parse_response(api_response: ApiResponse) -> Result<CompletionResponse, BackendError> {
    let choice = api_response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| BackendError::InvalidResponse("No choices in response".into()))?;

    let tool_calls = choice
        .message
        .tool_calls
        .unwrap_or_default()
        .into_iter()
        .map(OpenAiCompatProvider::to_tool_use)
        .collect();

    let usage = api_response.usage.map(|u| Usage {
        prompt_tokens: u.prompt_tokens,
        completion_tokens: u.completion_tokens,
        total_tokens: u.total_tokens,
    });

    Ok(CompletionResponse {
        text: choice.message.content.unwrap_or_default(),
        usage,
        tool_calls,
    })
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Serialize, Deserialize)]
struct ApiMessage {
    role: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    #[serde(default)]
    id: String,
    #[serde(default = "function_type")]
    r#type: String,
    function: ApiFunction,
}

fn function_type() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openrouter_constructor() {
        let provider = OpenAiCompatProvider::openrouter("sk-test");
        assert_eq!(provider.name(), "openrouter");
        assert!(provider.base_url().contains("openrouter.ai"));
    }

    #[test]
    fn trailing_slash_trimmed() {
        let provider = OpenAiCompatProvider::new("custom", "http://localhost:8000/v1/", "k");
        assert_eq!(provider.base_url(), "http://localhost:8000/v1");
    }

    #[test]
    fn message_conversion() {
        let messages = vec![
            Message::system("seeded prompt"),
            Message::user("list files"),
            Message::assistant("<list_files><path>.</path></list_files>"),
            Message::tool("[list_files for '.'] Result:\na.txt"),
        ];
        let api = OpenAiCompatProvider::to_api_messages("You are helpful", &messages);
        let roles: Vec<&str> = api.iter().map(|m| m.role.as_str()).collect();
        assert_eq!(roles, vec!["system", "user", "assistant", "user"]);
        assert_eq!(api[0].content.as_deref(), Some("You are helpful"));
    }

    #[test]
    fn parse_text_response() {
        let data = r#"{
            "model": "gpt-4o",
            "choices": [{"message": {"role": "assistant", "content": "Done."}}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 2, "total_tokens": 12}
        }"#;
        let resp = parse_response(serde_json::from_str(data).unwrap()).unwrap();
        assert_eq!(resp.text, "Done.");
        assert!(resp.tool_calls.is_empty());
        assert_eq!(resp.usage.unwrap().total_tokens, 12);
    }

    #[test]
    fn parse_native_tool_calls() {
        let data = r#"{
            "choices": [{"message": {
                "role": "assistant",
                "content": null,
                "tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "read_file", "arguments": "{\"path\": \" src/lib.rs \", \"start_line\": 3}"}
                }]
            }}]
        }"#;
        let resp = parse_response(serde_json::from_str(data).unwrap()).unwrap();
        assert_eq!(resp.text, "");
        let call = &resp.tool_calls[0];
        assert_eq!(call.name, "read_file");
        assert_eq!(call.params["path"], "src/lib.rs");
        assert_eq!(call.params["start_line"], "3");
    }

    #[test]
    fn bad_arguments_yield_empty_params() {
        let call = ApiToolCall {
            id: "x".into(),
            r#type: "function".into(),
            function: ApiFunction {
                name: "list_files".into(),
                arguments: "{not json".into(),
            },
        };
        let tool_use = OpenAiCompatProvider::to_tool_use(call);
        assert!(tool_use.params.is_empty());
    }

    #[test]
    fn empty_choices_is_invalid() {
        let resp: ApiResponse = serde_json::from_str(r#"{"choices": []}"#).unwrap();
        assert!(matches!(parse_response(resp), Err(BackendError::InvalidResponse(_))));
    }

    /// Serve one canned HTTP response on a local port and return its base URL.
    async fn serve_once(status_line: &'static str, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            // Drain headers and body so the client sees a clean response.
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request);
                if let Some(end) = text.find("\r\n\r\n") {
                    let length = text[..end]
                        .lines()
                        .find_map(|l| l.to_ascii_lowercase().strip_prefix("content-length:").map(|v| v.trim().to_string()))
                        .and_then(|v| v.parse::<usize>().ok())
                        .unwrap_or(0);
                    if request.len() >= end + 4 + length {
                        break;
                    }
                }
            }
            let response = format!(
                "HTTP/1.1 {status_line}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            socket.write_all(response.as_bytes()).await.unwrap();
        });
        format!("http://{addr}/v1")
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o".into(),
            system_prompt: "sys".into(),
            messages: vec![Message::user("hi")],
            temperature: 0.0,
            max_tokens: None,
        }
    }

    #[tokio::test]
    async fn complete_parses_success_body() {
        let base = serve_once(
            "200 OK",
            r#"{"choices": [{"message": {"role": "assistant", "content": "Hello."}}]}"#,
        )
        .await;
        let provider = OpenAiCompatProvider::new("custom", base, "k");
        let resp = provider.complete(request()).await.unwrap();
        assert_eq!(resp.text, "Hello.");
        assert!(resp.usage.is_none());
    }

    #[tokio::test]
    async fn complete_maps_error_status() {
        let base = serve_once("401 Unauthorized", r#"{"error": "bad key"}"#).await;
        let provider = OpenAiCompatProvider::new("custom", base, "k");
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, BackendError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn unreachable_backend_is_network_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let provider = OpenAiCompatProvider::new("custom", format!("http://{addr}/v1"), "k");
        let err = provider.complete(request()).await.unwrap_err();
        assert!(matches!(err, BackendError::Network(_)));
    }

    #[test]
    fn status_mapping() {
        assert!(matches!(status_error(429, String::new()), BackendError::RateLimited { .. }));
        assert!(matches!(status_error(401, String::new()), BackendError::AuthenticationFailed(_)));
        assert!(matches!(
            status_error(500, "boom".into()),
            BackendError::ApiError { status_code: 500, .. }
        ));
    }
}

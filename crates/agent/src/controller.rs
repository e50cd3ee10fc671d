//! Execution controller: request, parse, dispatch, repeat.
//!
//! One run drives a task through
//! `Init → AwaitingResponse → (ToolRequested → ExecutingTool → AwaitingResponse)*`
//! and ends in `Done`, `MaxStepsReached` or `Failed`. Every step is recorded
//! by a [`StructuredOutputTracker`].

use serde::Serialize;
use std::sync::Arc;
use toolclaw_core::error::{BackendError, Error, ToolError};
use toolclaw_core::message::{Role, TaskId};
use toolclaw_core::provider::{CompletionRequest, Provider, Usage};
use toolclaw_core::tool::{ToolParam, ToolUse};
use toolclaw_protocol::{assistant_text, completed_tool_uses, parse_assistant_message, ContentBlock, MessageScanner};
use toolclaw_store::TaskStore;
use toolclaw_telemetry::{
    LogLevel, RunStatus, SnapshotSink, StructuredExecutionResult, StructuredOutputTracker,
    TaskInfo, TelemetryError, ToolCallRecord,
};
use toolclaw_tools::ToolDispatcher;
use tracing::{debug, info, trace, warn};

use crate::prompt::{build_system_prompt, resolve_mode};
use crate::run_config::RunConfig;

/// Appended to the output of a run that used up its step budget.
pub fn max_steps_notice(max_steps: u32) -> String {
    format!("Task reached maximum number of steps ({max_steps}). The task may be incomplete.")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Init,
    AwaitingResponse,
    ToolRequested,
    ExecutingTool,
    Done,
    MaxStepsReached,
    Failed,
}

impl std::fmt::Display for ControllerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Init => "init",
            Self::AwaitingResponse => "awaiting_response",
            Self::ToolRequested => "tool_requested",
            Self::ExecutingTool => "executing_tool",
            Self::Done => "done",
            Self::MaxStepsReached => "max_steps_reached",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// What one step produced.
#[derive(Debug, Clone)]
pub struct StepOutcome {
    /// The assistant message as stored in the task.
    pub response: String,
    /// Prose with tool markup removed.
    pub text: String,
    /// The tool call that was acted on.
    pub tool_use: Option<ToolUse>,
    pub tool_result: Option<String>,
    /// Prose plus tool result.
    pub output: String,
    pub continue_loop: bool,
    pub usage: Option<Usage>,
    /// Labels of tool calls that were ignored.
    pub discarded: Vec<String>,
}

/// Final result of a run.
#[derive(Debug, Clone, Serialize)]
pub struct TaskResult {
    pub success: bool,
    pub output: String,
    pub task_id: TaskId,
    pub status: ControllerState,
    pub steps: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub structured: StructuredExecutionResult,
}

type UpdateCallback = Arc<dyn Fn(&StructuredExecutionResult) + Send + Sync>;

/// A normalized backend reply.
struct Reply {
    text: String,
    blocks: Vec<ContentBlock>,
    native_calls: Vec<ToolUse>,
    usage: Option<Usage>,
}

pub struct ExecutionController {
    provider: Arc<dyn Provider>,
    dispatcher: Arc<ToolDispatcher>,
    store: Arc<TaskStore>,
    config: RunConfig,
    snapshot_sink: Option<Arc<dyn SnapshotSink>>,
    on_update: Option<UpdateCallback>,
}

impl ExecutionController {
    pub fn new(
        provider: Arc<dyn Provider>,
        dispatcher: Arc<ToolDispatcher>,
        store: Arc<TaskStore>,
        config: RunConfig,
    ) -> Self {
        Self {
            provider,
            dispatcher,
            store,
            config,
            snapshot_sink: None,
            on_update: None,
        }
    }

    /// Write a structured output snapshot to `sink` after every change.
    pub fn with_snapshot_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.snapshot_sink = Some(sink);
        self
    }

    /// Invoke `callback` with the structured output after every change.
    pub fn on_update(mut self, callback: impl Fn(&StructuredExecutionResult) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Arc::new(callback));
        self
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// System prompt for the configured mode and registered tools.
    pub fn system_prompt(&self) -> String {
        let mode = resolve_mode(&self.config.mode, &self.config.custom_modes);
        let docs = self
            .dispatcher
            .describe_for_mode(&mode.slug, &self.config.custom_modes, &self.config.cwd);
        build_system_prompt(&mode, &docs, &self.config.cwd, self.config.auto)
    }

    fn mode_slug(&self) -> String {
        resolve_mode(&self.config.mode, &self.config.custom_modes).slug
    }

    fn enter(&self, task_id: &TaskId, state: ControllerState) {
        debug!(task_id = %task_id, state = %state, "Controller state");
    }

    /// Run one request/parse/dispatch cycle on an existing task.
    ///
    /// `prompt` is appended as a user message first when given. Tool failures
    /// come back as text in the outcome; a tool the mode may not use is an
    /// error and leaves no tool message behind.
    pub async fn single_step(&self, task_id: &TaskId, prompt: Option<&str>) -> Result<StepOutcome, Error> {
        if let Some(prompt) = prompt {
            self.store.add_user_message(task_id, prompt).await?;
        }

        let task = self.store.require_task(task_id).await?;
        let system_prompt = task
            .last_of(Role::System)
            .map(|m| m.content.clone())
            .unwrap_or_else(|| self.system_prompt());
        let request = CompletionRequest {
            model: self.config.model.clone(),
            system_prompt,
            messages: task.messages.into_iter().filter(|m| m.role != Role::System).collect(),
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        self.enter(task_id, ControllerState::AwaitingResponse);
        let reply = if self.config.stream {
            self.request_streaming(task_id, request).await?
        } else {
            self.request(request).await?
        };

        let prose = assistant_text(&reply.blocks);
        let native = !reply.native_calls.is_empty();
        let (tool_use, discarded) = select_tool_call(&reply.blocks, reply.native_calls);
        for label in &discarded {
            warn!(task_id = %task_id, tool = %label, "Discarding extra tool call");
        }

        let response = match &tool_use {
            Some(call) if native => join_nonempty(&reply.text, &render_tool_use(call)),
            _ => reply.text,
        };
        self.store.add_assistant_message(task_id, &response).await?;

        let Some(tool_use) = tool_use else {
            return Ok(StepOutcome {
                response,
                output: prose.clone(),
                text: prose,
                tool_use: None,
                tool_result: None,
                continue_loop: false,
                usage: reply.usage,
                discarded,
            });
        };

        self.enter(task_id, ControllerState::ToolRequested);
        match self
            .dispatcher
            .check(&tool_use.name, &self.mode_slug(), &self.config.custom_modes)
        {
            Err(e @ ToolError::UnavailableInMode { .. }) => {
                warn!(task_id = %task_id, tool = %tool_use.name, error = %e, "Tool refused");
                return Err(e.into());
            }
            // Unknown names still go to the dispatcher, which answers with an error text.
            Err(_) | Ok(_) => {}
        }

        self.enter(task_id, ControllerState::ExecutingTool);
        let result = self.dispatcher.execute(&tool_use, &self.config.cwd).await;
        self.store
            .add_tool_message(task_id, &format!("[{}] Result:\n{}", tool_use.label(), result))
            .await?;

        Ok(StepOutcome {
            response,
            output: join_nonempty(&prose, &result),
            text: prose,
            tool_use: Some(tool_use),
            tool_result: Some(result),
            continue_loop: true,
            usage: reply.usage,
            discarded,
        })
    }

    async fn request(&self, request: CompletionRequest) -> Result<Reply, BackendError> {
        let response = self.provider.complete(request).await?;
        Ok(Reply {
            blocks: parse_assistant_message(&response.text),
            text: response.text,
            native_calls: response.tool_calls,
            usage: response.usage,
        })
    }

    async fn request_streaming(&self, task_id: &TaskId, request: CompletionRequest) -> Result<Reply, BackendError> {
        let mut rx = self.provider.stream(request).await?;
        let mut scanner = MessageScanner::new();
        let mut native_calls = Vec::new();
        let mut usage = None;

        while let Some(chunk) = rx.recv().await {
            let chunk = chunk?;
            if let Some(text) = chunk.text.as_deref() {
                scanner.feed(text);
                trace!(
                    task_id = %task_id,
                    bytes = scanner.consumed(),
                    in_tool_use = scanner.in_tool_use(),
                    blocks = scanner.blocks().len(),
                    "Partial reply"
                );
            }
            native_calls.extend(chunk.tool_calls);
            if chunk.usage.is_some() {
                usage = chunk.usage;
            }
            if chunk.done {
                break;
            }
        }

        let text = scanner.text().to_string();
        Ok(Reply {
            blocks: scanner.finish(),
            text,
            native_calls,
            usage,
        })
    }

    /// Run a task until the model stops asking for tools or the step budget
    /// runs out.
    ///
    /// With `continue_from`, the prompt is appended to that task; an unknown
    /// id fails before the backend is contacted. Backend and tool-permission
    /// failures end the run as `Failed`; only store failures are returned as
    /// errors.
    pub async fn run(&self, prompt: &str, continue_from: Option<&TaskId>) -> Result<TaskResult, Error> {
        let mode = self.mode_slug();
        let system_prompt = self.system_prompt();
        let task_id = match continue_from {
            Some(id) => {
                self.store.require_task(id).await?;
                self.store.update_system_prompt(id, &mode, &system_prompt).await?;
                id.clone()
            }
            None => {
                self.store
                    .create_task(&mode, self.config.cwd.clone(), &system_prompt)
                    .await?
            }
        };
        self.enter(&task_id, ControllerState::Init);
        info!(
            task_id = %task_id,
            mode = %mode,
            max_steps = self.config.max_steps,
            resumed = continue_from.is_some(),
            "Run started"
        );

        let tracker = self.tracker(&task_id, &mode, prompt);
        let max_steps = self.config.max_steps.max(1);
        let mut outputs: Vec<String> = Vec::new();
        let mut last_text = String::new();
        let mut step = 0;

        let (state, error) = loop {
            step += 1;
            track(tracker.start_step(step));

            match self.single_step(&task_id, (step == 1).then_some(prompt)).await {
                Ok(outcome) => {
                    for label in &outcome.discarded {
                        tracker.log(LogLevel::Warn, format!("Discarded extra tool call: {label}"));
                    }
                    let records = outcome.tool_use.as_ref().map(|call| {
                        vec![ToolCallRecord {
                            tool: call.name.clone(),
                            params: call.params.clone(),
                            output: outcome.tool_result.clone().unwrap_or_default(),
                        }]
                    });
                    track(tracker.complete_step(
                        outcome.response.clone(),
                        records,
                        outcome.output.clone(),
                        outcome.usage.map(|u| u64::from(u.total_tokens)),
                    ));

                    outputs.push(outcome.output);
                    last_text = outcome.text;
                    if !outcome.continue_loop {
                        break (ControllerState::Done, None);
                    }
                    if step >= max_steps {
                        break (ControllerState::MaxStepsReached, None);
                    }
                }
                Err(Error::Store(e)) => {
                    track(tracker.fail_step(e.to_string()));
                    tracker.complete_task(RunStatus::Error, outputs.join("\n\n"), Some(e.to_string()));
                    warn!(task_id = %task_id, error = %e, "Run aborted by store failure");
                    return Err(e.into());
                }
                Err(e) => {
                    let message = e.to_string();
                    track(tracker.fail_step(message.clone()));
                    tracker.log(LogLevel::Error, message.clone());
                    break (ControllerState::Failed, Some((e, message)));
                }
            }
        };
        self.enter(&task_id, state);

        let mut output = if self.config.only_return_last_result {
            last_text
        } else {
            outputs.join("\n\n")
        };
        if state == ControllerState::MaxStepsReached {
            output = join_nonempty(&output, &max_steps_notice(max_steps));
        }

        let (run_status, error) = match error {
            Some((Error::Backend(_), message)) => (RunStatus::Error, Some(message)),
            Some((_, message)) => (RunStatus::Failed, Some(message)),
            None => (RunStatus::Completed, None),
        };
        tracker.complete_task(run_status, output.clone(), error.clone());
        info!(task_id = %task_id, state = %state, steps = step, "Run finished");

        Ok(TaskResult {
            success: error.is_none(),
            output,
            task_id,
            status: state,
            steps: step,
            error,
            structured: tracker.snapshot(),
        })
    }

    fn tracker(&self, task_id: &TaskId, mode: &str, prompt: &str) -> StructuredOutputTracker {
        let info = TaskInfo::new(task_id.as_str(), mode, prompt, self.config.cwd.clone());
        let mut tracker = StructuredOutputTracker::new(info, self.config.snapshot(), self.config.max_steps);
        if let Some(sink) = &self.snapshot_sink {
            tracker = tracker.with_sink(Arc::clone(sink));
        }
        if let Some(callback) = &self.on_update {
            let callback = Arc::clone(callback);
            tracker = tracker.on_update(move |state| callback(state));
        }
        tracker
    }
}

fn track(result: Result<(), TelemetryError>) {
    if let Err(e) = result {
        warn!(error = %e, "Structured output update rejected");
    }
}

/// Pick the call to act on. Native calls win over tags in the text; every
/// other call is returned by label as discarded.
fn select_tool_call(blocks: &[ContentBlock], native_calls: Vec<ToolUse>) -> (Option<ToolUse>, Vec<String>) {
    let tagged: Vec<ToolUse> = completed_tool_uses(blocks).into_iter().map(|b| b.to_tool_use()).collect();
    let (mut chosen, others) = if native_calls.is_empty() {
        (tagged, Vec::new())
    } else {
        (native_calls, tagged)
    };
    if chosen.is_empty() {
        return (None, Vec::new());
    }
    let first = chosen.remove(0);
    let discarded = chosen.iter().chain(others.iter()).map(ToolUse::label).collect();
    (Some(first), discarded)
}

/// Tag form of a call, stored next to native calls so the history reads the
/// same either way.
///
/// `content` goes last: the scanner reads a `write_to_file` payload from the
/// first `<content>` to the last `</content>`, so a payload that embeds its own
/// closing tag survives a re-parse.
fn render_tool_use(call: &ToolUse) -> String {
    let content = ToolParam::Content.as_str();
    let params = call
        .params
        .iter()
        .filter(|(name, _)| name.as_str() != content)
        .chain(call.params.get_key_value(content));

    let mut out = format!("<{}>\n", call.name);
    for (name, value) in params {
        out.push_str(&format!("<{name}>{value}</{name}>\n"));
    }
    out.push_str(&format!("</{}>", call.name));
    out
}

fn join_nonempty(first: &str, second: &str) -> String {
    match (first.trim().is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (false, true) => first.to_string(),
        (false, false) => format!("{first}\n\n{second}"),
    }
}

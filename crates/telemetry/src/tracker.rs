//! Structured output tracker: records the steps of one run.
//!
//! Thread-safe via `Mutex`. After every mutation the tracker invokes the
//! optional update callback and writes a snapshot to the optional sink. Sink
//! failures are logged and never interrupt the run.

use crate::TelemetryError;
use crate::model::*;
use crate::sink::SnapshotSink;
use chrono::Utc;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

type UpdateCallback = Box<dyn Fn(&StructuredExecutionResult) + Send + Sync>;

pub struct StructuredOutputTracker {
    state: Mutex<StructuredExecutionResult>,
    callback: Option<UpdateCallback>,
    sink: Option<Arc<dyn SnapshotSink>>,
}

impl StructuredOutputTracker {
    pub fn new(task: TaskInfo, config: RunConfigSnapshot, total_steps: u32) -> Self {
        Self {
            state: Mutex::new(StructuredExecutionResult {
                task,
                config,
                progress: Progress::new(total_steps),
                steps: Vec::new(),
                logs: Vec::new(),
                stats: RunStats::default(),
            }),
            callback: None,
            sink: None,
        }
    }

    /// Invoke `callback` with the full state after every mutation.
    pub fn on_update(mut self, callback: impl Fn(&StructuredExecutionResult) + Send + Sync + 'static) -> Self {
        self.callback = Some(Box::new(callback));
        self
    }

    /// Write a snapshot to `sink` after every mutation.
    pub fn with_sink(mut self, sink: Arc<dyn SnapshotSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// A copy of the current state.
    pub fn snapshot(&self) -> StructuredExecutionResult {
        self.lock().clone()
    }

    /// Open step `step_number`. Numbers must follow the previous step by one.
    pub fn start_step(&self, step_number: u32) -> Result<(), TelemetryError> {
        let mut state = self.lock();
        let expected = state.steps.last().map_or(1, |s| s.step_number + 1);
        if step_number != expected {
            return Err(TelemetryError::StepOutOfOrder {
                expected,
                got: step_number,
            });
        }
        if let Some(open) = state.steps.last_mut().filter(|s| s.status == StepStatus::Running) {
            warn!(step = open.step_number, "Previous step was never closed");
            open.end(StepStatus::Failed);
            open.error = Some("superseded by the next step".into());
        }

        state.steps.push(ExecutionStep::start(step_number));
        state.progress.advance(step_number);
        debug!(step = step_number, percentage = state.progress.percentage, "Step started");
        self.publish(state);
        Ok(())
    }

    /// Close the open step as completed.
    pub fn complete_step(
        &self,
        ai_response: impl Into<String>,
        tool_results: Option<Vec<ToolCallRecord>>,
        output: impl Into<String>,
        tokens: Option<u64>,
    ) -> Result<(), TelemetryError> {
        let mut state = self.lock();
        let step = open_step(&mut state)?;
        step.ai_response = Some(ai_response.into());
        step.output = output.into();
        let tool_calls = tool_results.as_ref().map_or(0, |r| r.len() as u32);
        step.tool_results = tool_results;
        step.end(StepStatus::Completed);

        state.stats.total_tool_calls += tool_calls;
        state.stats.total_tokens_used += tokens.unwrap_or(0);
        state.stats.average_step_time = average_step_time(&state.steps);
        self.publish(state);
        Ok(())
    }

    /// Close the open step as failed.
    pub fn fail_step(&self, error: impl Into<String>) -> Result<(), TelemetryError> {
        let mut state = self.lock();
        let step = open_step(&mut state)?;
        step.error = Some(error.into());
        step.end(StepStatus::Failed);
        state.stats.average_step_time = average_step_time(&state.steps);
        self.publish(state);
        Ok(())
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        let mut state = self.lock();
        let step = state
            .steps
            .last()
            .filter(|s| s.status == StepStatus::Running)
            .map(|s| s.step_number);
        state.logs.push(LogEntry {
            timestamp: Utc::now(),
            level,
            message: message.into(),
            step,
        });
        self.publish(state);
    }

    /// Stamp the end of the run.
    pub fn complete_task(&self, status: RunStatus, final_output: impl Into<String>, error: Option<String>) {
        let mut state = self.lock();
        state.task.end_time = Some(Utc::now());
        state.task.status = status;
        state.task.final_output = Some(final_output.into());
        state.task.error = error;
        state.progress.status = status;
        self.publish(state);
    }

    fn lock(&self) -> MutexGuard<'_, StructuredExecutionResult> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn publish(&self, state: MutexGuard<'_, StructuredExecutionResult>) {
        if let Some(callback) = &self.callback {
            callback(&state);
        }
        let Some(sink) = &self.sink else {
            return;
        };

        let status = state.task.status;
        let result = status.is_terminal().then(|| SnapshotResult {
            success: status == RunStatus::Completed,
            output: state.task.final_output.clone().unwrap_or_default(),
            error: state.task.error.clone(),
        });
        let doc = SnapshotDocument {
            status,
            last_update: Utc::now(),
            structured: state.clone(),
            result,
        };
        drop(state);

        if let Err(e) = sink.write(&doc) {
            warn!(error = %e, "Failed to write structured output snapshot");
        }
    }
}

fn open_step(state: &mut StructuredExecutionResult) -> Result<&mut ExecutionStep, TelemetryError> {
    state
        .steps
        .last_mut()
        .filter(|s| s.status == StepStatus::Running)
        .ok_or(TelemetryError::NoOpenStep)
}

fn average_step_time(steps: &[ExecutionStep]) -> f64 {
    let durations: Vec<u64> = steps.iter().filter_map(ExecutionStep::duration_ms).collect();
    if durations.is_empty() {
        return 0.0;
    }
    durations.iter().sum::<u64>() as f64 / durations.len() as f64
}

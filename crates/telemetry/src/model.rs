//! Data model for structured run output: steps, progress, logs and stats.
//!
//! Everything serializes as camelCase JSON so snapshots can be consumed by
//! tooling outside the process.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

// ── Status ────────────────────────────────────────────────────────────────

/// Status of a single step.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StepStatus {
    Running,
    Completed,
    Failed,
}

/// Status of the whole run, also used as the snapshot status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    Running,
    Completed,
    Failed,
    Error,
}

impl RunStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Running => write!(f, "running"),
            Self::Completed => write!(f, "completed"),
            Self::Failed => write!(f, "failed"),
            Self::Error => write!(f, "error"),
        }
    }
}

// ── Steps ─────────────────────────────────────────────────────────────────

/// One tool call made during a step.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    pub output: String,
}

/// One controller iteration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionStep {
    /// 1-based, increasing by one within a run.
    pub step_number: u32,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: StepStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_response: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_results: Option<Vec<ToolCallRecord>>,
    #[serde(default)]
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionStep {
    pub fn start(step_number: u32) -> Self {
        Self {
            step_number,
            start_time: Utc::now(),
            end_time: None,
            status: StepStatus::Running,
            ai_response: None,
            tool_results: None,
            output: String::new(),
            error: None,
        }
    }

    /// Close the step with the given status.
    pub fn end(&mut self, status: StepStatus) {
        self.end_time = Some(Utc::now());
        self.status = status;
    }

    /// Duration in milliseconds, once ended.
    pub fn duration_ms(&self) -> Option<u64> {
        self.end_time.map(|end| {
            end.signed_duration_since(self.start_time)
                .num_milliseconds()
                .max(0) as u64
        })
    }
}

// ── Aggregates ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current_step: u32,
    pub total_steps: u32,
    pub status: RunStatus,
    pub percentage: u8,
}

impl Progress {
    pub fn new(total_steps: u32) -> Self {
        Self {
            current_step: 0,
            total_steps,
            status: RunStatus::Running,
            percentage: 0,
        }
    }

    /// Move to `step` and recompute the percentage.
    pub fn advance(&mut self, step: u32) {
        self.current_step = step;
        self.percentage = percentage(step, self.total_steps);
    }
}

/// `round(current / total * 100)`, clamped to 0..=100.
pub fn percentage(current: u32, total: u32) -> u8 {
    if total == 0 {
        return 0;
    }
    let pct = (f64::from(current) / f64::from(total) * 100.0).round();
    pct.clamp(0.0, 100.0) as u8
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Step that was open when the entry was written.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunStats {
    pub total_tool_calls: u32,
    pub total_tokens_used: u64,
    /// Milliseconds, averaged over closed steps.
    pub average_step_time: f64,
}

// ── Run description ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskInfo {
    pub id: String,
    pub mode: String,
    pub prompt: String,
    pub cwd: PathBuf,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: RunStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub final_output: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TaskInfo {
    pub fn new(id: impl Into<String>, mode: impl Into<String>, prompt: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            id: id.into(),
            mode: mode.into(),
            prompt: prompt.into(),
            cwd: cwd.into(),
            start_time: Utc::now(),
            end_time: None,
            status: RunStatus::Running,
            final_output: None,
            error: None,
        }
    }
}

/// The run settings, as recorded in the snapshot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunConfigSnapshot {
    pub model: String,
    pub mode: String,
    pub max_steps: u32,
    pub auto: bool,
    pub only_return_last_result: bool,
    pub stream: bool,
}

/// Everything the tracker knows about a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StructuredExecutionResult {
    pub task: TaskInfo,
    pub config: RunConfigSnapshot,
    pub progress: Progress,
    pub steps: Vec<ExecutionStep>,
    pub logs: Vec<LogEntry>,
    pub stats: RunStats,
}

// ── Snapshot document ─────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResult {
    pub success: bool,
    pub output: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// What a [`crate::SnapshotSink`] receives on every tracker mutation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotDocument {
    pub status: RunStatus,
    pub last_update: DateTime<Utc>,
    pub structured: StructuredExecutionResult,
    /// Set only once the run reaches a terminal state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<SnapshotResult>,
}

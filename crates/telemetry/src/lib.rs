//! Structured output for toolclaw runs.
//!
//! Records every step of a run (timings, model replies, tool results),
//! aggregate stats, and log entries, and publishes a JSON snapshot after
//! each change for tooling that watches a run from outside.

pub mod model;
pub mod sink;
pub mod tracker;

pub use model::{
    ExecutionStep, LogEntry, LogLevel, Progress, RunConfigSnapshot, RunStats, RunStatus,
    SnapshotDocument, SnapshotResult, StepStatus, StructuredExecutionResult, TaskInfo,
    ToolCallRecord,
};
pub use sink::{JsonFileSnapshotSink, MemorySnapshotSink, SnapshotSink};
pub use tracker::StructuredOutputTracker;

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("step {got} started out of order (expected {expected})")]
    StepOutOfOrder { expected: u32, got: u32 },

    #[error("no step is open")]
    NoOpenStep,

    #[error("snapshot write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),
}

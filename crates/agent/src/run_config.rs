//! Explicit settings for one run.

use std::path::PathBuf;
use toolclaw_config::AppConfig;
use toolclaw_core::mode::{ModeConfig, DEFAULT_MODE};
use toolclaw_telemetry::RunConfigSnapshot;

/// Everything a controller needs to know about how to run a task.
///
/// Passed explicitly to the controller and to nested sub-tasks; there is no
/// process-wide run state.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: Option<u32>,
    pub mode: String,
    pub cwd: PathBuf,
    pub max_steps: u32,
    pub auto: bool,
    pub only_return_last_result: bool,
    pub stream: bool,
    pub custom_modes: Vec<ModeConfig>,
}

impl RunConfig {
    pub fn new(model: impl Into<String>, cwd: impl Into<PathBuf>) -> Self {
        Self {
            model: model.into(),
            temperature: 0.0,
            max_tokens: None,
            mode: DEFAULT_MODE.into(),
            cwd: cwd.into(),
            max_steps: 20,
            auto: false,
            only_return_last_result: false,
            stream: false,
            custom_modes: Vec::new(),
        }
    }

    /// Defaults taken from the loaded configuration file.
    pub fn from_app(config: &AppConfig, cwd: impl Into<PathBuf>) -> Self {
        Self {
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: Some(config.max_tokens),
            mode: config.run.mode.clone(),
            cwd: cwd.into(),
            max_steps: config.run.max_steps,
            auto: config.run.auto,
            only_return_last_result: config.run.only_return_last_result,
            stream: config.run.stream,
            custom_modes: config.custom_modes.clone(),
        }
    }

    pub fn with_mode(mut self, mode: impl Into<String>) -> Self {
        self.mode = mode.into();
        self
    }

    pub fn with_max_steps(mut self, max_steps: u32) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn with_auto(mut self, auto: bool) -> Self {
        self.auto = auto;
        self
    }

    pub fn with_only_last_result(mut self, only_last: bool) -> Self {
        self.only_return_last_result = only_last;
        self
    }

    pub fn with_stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn with_custom_modes(mut self, custom_modes: Vec<ModeConfig>) -> Self {
        self.custom_modes = custom_modes;
        self
    }

    /// The subset recorded in structured output.
    pub fn snapshot(&self) -> RunConfigSnapshot {
        RunConfigSnapshot {
            model: self.model.clone(),
            mode: self.mode.clone(),
            max_steps: self.max_steps,
            auto: self.auto,
            only_return_last_result: self.only_return_last_result,
            stream: self.stream,
        }
    }
}

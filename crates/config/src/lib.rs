//! Configuration loading, validation, and management for toolclaw.
//!
//! Loads configuration from `~/.toolclaw/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use toolclaw_core::mode::{ModeConfig, DEFAULT_MODE};

/// The root configuration structure.
///
/// Maps directly to `~/.toolclaw/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the completion backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Backend name (used for logging and the default base URL)
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Override the backend base URL (OpenAI-compatible endpoint)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_url: Option<String>,

    /// Model to request
    #[serde(default = "default_model")]
    pub model: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Max tokens per completion
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Defaults for task runs
    #[serde(default)]
    pub run: RunDefaults,

    /// Where tasks are persisted
    #[serde(default)]
    pub storage: StorageConfig,

    /// Built-in tool settings
    #[serde(default)]
    pub tools: ToolsConfig,

    /// User-defined modes; a custom mode with a built-in slug replaces it
    #[serde(default)]
    pub custom_modes: Vec<ModeConfig>,

    /// Structured output settings
    #[serde(default)]
    pub telemetry: TelemetryConfig,
}

fn default_provider() -> String {
    "openai".into()
}
fn default_model() -> String {
    "gpt-4o".into()
}
fn default_temperature() -> f32 {
    0.0
}
fn default_max_tokens() -> u32 {
    4096
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("provider", &self.provider)
            .field("api_url", &self.api_url)
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("run", &self.run)
            .field("storage", &self.storage)
            .field("tools", &self.tools)
            .field("custom_modes", &self.custom_modes)
            .field("telemetry", &self.telemetry)
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunDefaults {
    /// Mode used when `--mode` is not given
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Step budget for a continuous run
    #[serde(default = "default_max_steps")]
    pub max_steps: u32,

    /// Tell the model it may act without asking for confirmation
    #[serde(default)]
    pub auto: bool,

    /// Return only the last step's text instead of every step's output
    #[serde(default)]
    pub only_return_last_result: bool,

    /// Consume the backend as a stream
    #[serde(default)]
    pub stream: bool,
}

fn default_mode() -> String {
    DEFAULT_MODE.into()
}
fn default_max_steps() -> u32 {
    20
}

impl Default for RunDefaults {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            max_steps: default_max_steps(),
            auto: false,
            only_return_last_result: false,
            stream: false,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding one `<task-id>.json` per task
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tasks_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// If non-empty, `execute_command` only runs these base commands
    #[serde(default)]
    pub allowed_commands: Vec<String>,

    /// File tools refuse paths under these prefixes
    #[serde(default)]
    pub forbidden_paths: Vec<PathBuf>,

    /// Cap on entries returned by `list_files`
    #[serde(default = "default_max_list_entries")]
    pub max_list_entries: usize,

    /// Cap on matches returned by `search_files`
    #[serde(default = "default_max_search_results")]
    pub max_search_results: usize,
}

fn default_max_list_entries() -> usize {
    200
}
fn default_max_search_results() -> usize {
    300
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            allowed_commands: vec![],
            forbidden_paths: vec![],
            max_list_entries: default_max_list_entries(),
            max_search_results: default_max_search_results(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Write a structured output snapshot here on every run transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub structured_output: Option<PathBuf>,
}

impl AppConfig {
    /// Load configuration from the default path (~/.toolclaw/config.toml).
    ///
    /// Also checks environment variables:
    /// - `TOOLCLAW_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `TOOLCLAW_MODEL`
    /// - `TOOLCLAW_API_URL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env();
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env(&mut self) {
        if let Ok(key) = std::env::var("TOOLCLAW_API_KEY") {
            self.api_key = Some(key);
        } else if self.api_key.is_none() {
            self.api_key = std::env::var("OPENAI_API_KEY").ok();
        }

        if let Ok(model) = std::env::var("TOOLCLAW_MODEL") {
            self.model = model;
        }

        if let Ok(url) = std::env::var("TOOLCLAW_API_URL") {
            self.api_url = Some(url);
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".toolclaw")
    }

    /// Directory where tasks are persisted.
    pub fn tasks_dir(&self) -> PathBuf {
        self.storage
            .tasks_dir
            .clone()
            .unwrap_or_else(|| Self::config_dir().join("tasks"))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.temperature < 0.0 || self.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "temperature must be between 0.0 and 2.0".into(),
            ));
        }

        if self.run.max_steps == 0 {
            return Err(ConfigError::ValidationError(
                "run.max_steps must be at least 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for mode in &self.custom_modes {
            if mode.slug.trim().is_empty() {
                return Err(ConfigError::ValidationError(
                    "custom mode slug must not be empty".into(),
                ));
            }
            if !seen.insert(mode.slug.as_str()) {
                return Err(ConfigError::ValidationError(format!(
                    "custom mode '{}' is defined more than once",
                    mode.slug
                )));
            }
        }

        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Generate a default config TOML string (for `config init`).
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            provider: default_provider(),
            api_url: None,
            model: default_model(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            run: RunDefaults::default(),
            storage: StorageConfig::default(),
            tools: ToolsConfig::default(),
            custom_modes: vec![],
            telemetry: TelemetryConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

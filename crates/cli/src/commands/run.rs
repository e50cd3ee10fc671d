//! `toolclaw run`: run a task to completion.

use std::path::PathBuf;
use std::sync::Arc;
use toolclaw_agent::{ExecutionController, NewTaskTool, RunConfig};
use toolclaw_config::AppConfig;
use toolclaw_core::message::TaskId;
use toolclaw_store::{JsonFileSink, TaskStore};
use toolclaw_telemetry::JsonFileSnapshotSink;
use tracing::info;

pub struct RunArgs {
    pub prompt: String,
    pub mode: Option<String>,
    pub max_steps: Option<u32>,
    pub auto: bool,
    pub continue_from: Option<String>,
    pub only_last: bool,
    pub structured_output: Option<PathBuf>,
    pub cwd: Option<PathBuf>,
    pub stream: bool,
}

/// Config file defaults with the command-line flags applied on top.
pub fn run_config(config: &AppConfig, args: &RunArgs, cwd: PathBuf) -> RunConfig {
    let mut run = RunConfig::from_app(config, cwd);
    if let Some(mode) = &args.mode {
        run = run.with_mode(mode.clone());
    }
    if let Some(max_steps) = args.max_steps {
        run = run.with_max_steps(max_steps);
    }
    let auto = run.auto || args.auto;
    let only_last = run.only_return_last_result || args.only_last;
    let stream = run.stream || args.stream;
    run.with_auto(auto).with_only_last_result(only_last).with_stream(stream)
}

pub async fn run(args: RunArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;

    // Check for the API key early and give a clear error
    let provider = toolclaw_providers::build_from_config(&config).map_err(|e| {
        eprintln!();
        eprintln!("  ERROR: {e}");
        eprintln!();
        eprintln!("  Set TOOLCLAW_API_KEY (or OPENAI_API_KEY), or add api_key to:");
        eprintln!("    {}", AppConfig::config_dir().join("config.toml").display());
        eprintln!();
        e
    })?;

    let cwd = match &args.cwd {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    let run_config = run_config(&config, &args, cwd);

    let store = Arc::new(TaskStore::new(Arc::new(JsonFileSink::new(config.tasks_dir()))));
    let mut dispatcher = toolclaw_tools::default_dispatcher(&config.tools);
    dispatcher.register(Box::new(NewTaskTool::new(
        Arc::clone(&provider),
        Arc::clone(&store),
        config.tools.clone(),
        run_config.clone(),
    )));

    let mut controller = ExecutionController::new(provider, Arc::new(dispatcher), store, run_config);
    if let Some(path) = args.structured_output.clone().or(config.telemetry.structured_output.clone()) {
        info!(path = %path.display(), "Writing structured output");
        controller = controller.with_snapshot_sink(Arc::new(JsonFileSnapshotSink::new(path)));
    }

    let continue_from = args.continue_from.as_deref().map(TaskId::from);
    let result = controller.run(&args.prompt, continue_from.as_ref()).await?;

    println!("{}", result.output);
    eprintln!();
    eprintln!("  Task:   {}", result.task_id);
    eprintln!("  Status: {} ({} steps)", result.status, result.steps);

    match result.error {
        Some(error) => Err(error.into()),
        None => Ok(()),
    }
}

//! toolclaw CLI: the main entry point.
//!
//! Commands:
//! - `run`: Run a task (new or continued) until it finishes
//! - `task`: Inspect persisted tasks
//! - `config`: Create or print the configuration file

use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod commands;

#[derive(Parser)]
#[command(
    name = "toolclaw",
    about = "toolclaw: an agentic task loop with permission-checked tools",
    version,
    author
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a task
    Run {
        /// What the task should do
        prompt: String,

        /// Mode slug (e.g. code, ask, architect, debug)
        #[arg(short, long)]
        mode: Option<String>,

        /// Maximum number of steps
        #[arg(long)]
        max_steps: Option<u32>,

        /// Act without asking for confirmation
        #[arg(long)]
        auto: bool,

        /// Continue an existing task
        #[arg(long, value_name = "TASK_ID")]
        continue_from: Option<String>,

        /// Print only the final step's answer
        #[arg(long)]
        only_last: bool,

        /// Write a structured output snapshot to this file
        #[arg(long, value_name = "FILE")]
        structured_output: Option<PathBuf>,

        /// Working directory for tools (default: current directory)
        #[arg(long)]
        cwd: Option<PathBuf>,

        /// Consume the reply as a stream
        #[arg(long)]
        stream: bool,
    },

    /// Inspect persisted tasks
    Task {
        #[command(subcommand)]
        action: TaskAction,
    },

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum TaskAction {
    /// Print a task summary
    Show { id: String },

    /// Print a task's messages
    Messages { id: String },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Write a default config file
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },

    /// Print the effective configuration
    Show,

    /// Print the config file path
    Path,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Initialize tracing
    let filter = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Run {
            prompt,
            mode,
            max_steps,
            auto,
            continue_from,
            only_last,
            structured_output,
            cwd,
            stream,
        } => {
            let args = commands::run::RunArgs {
                prompt,
                mode,
                max_steps,
                auto,
                continue_from,
                only_last,
                structured_output,
                cwd,
                stream,
            };
            commands::run::run(args).await?
        }
        Commands::Task { action } => match action {
            TaskAction::Show { id } => commands::task::show(&id).await?,
            TaskAction::Messages { id } => commands::task::messages(&id).await?,
        },
        Commands::Config { action } => match action {
            ConfigAction::Init { force } => commands::config_cmd::init(force).await?,
            ConfigAction::Show => commands::config_cmd::show().await?,
            ConfigAction::Path => commands::config_cmd::path().await?,
        },
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn run_flags_parse() {
        let cli = Cli::try_parse_from([
            "toolclaw", "run", "list files", "--mode", "ask", "--max-steps", "5", "--auto",
            "--continue-from", "abc", "--only-last", "--stream",
        ])
        .unwrap();
        let Commands::Run {
            prompt,
            mode,
            max_steps,
            auto,
            continue_from,
            only_last,
            stream,
            ..
        } = cli.command
        else {
            panic!("expected run");
        };
        assert_eq!(prompt, "list files");
        assert_eq!(mode.as_deref(), Some("ask"));
        assert_eq!(max_steps, Some(5));
        assert!(auto && only_last && stream);
        assert_eq!(continue_from.as_deref(), Some("abc"));
    }

    #[test]
    fn task_subcommands_parse() {
        let cli = Cli::try_parse_from(["toolclaw", "task", "messages", "t-1"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Task { action: TaskAction::Messages { ref id } } if id == "t-1"
        ));
    }
}

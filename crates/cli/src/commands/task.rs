//! `toolclaw task`: inspect persisted tasks.

use std::sync::Arc;
use toolclaw_config::AppConfig;
use toolclaw_core::message::{Message, Role, Task, TaskId};
use toolclaw_store::{JsonFileSink, TaskStore};

fn open_store() -> Result<TaskStore, Box<dyn std::error::Error>> {
    let config = AppConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
    Ok(TaskStore::new(Arc::new(JsonFileSink::new(config.tasks_dir()))))
}

pub async fn show(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let task = open_store()?.require_task(&TaskId::from(id)).await?;
    println!("{}", summary(&task));
    Ok(())
}

pub async fn messages(id: &str) -> Result<(), Box<dyn std::error::Error>> {
    let messages = open_store()?.get_messages(&TaskId::from(id)).await?;
    println!("{}", render_messages(&messages));
    Ok(())
}

fn summary(task: &Task) -> String {
    let count = |role: Role| task.messages.iter().filter(|m| m.role == role).count();
    format!(
        "  Task:      {}\n  Mode:      {}\n  Cwd:       {}\n  Created:   {}\n  Updated:   {}\n  Messages:  {} ({} user, {} assistant, {} tool)\n  Tokens:    ~{}",
        task.id,
        task.mode,
        task.cwd.display(),
        task.created_at.to_rfc3339(),
        task.updated_at.to_rfc3339(),
        task.messages.len(),
        count(Role::User),
        count(Role::Assistant),
        count(Role::Tool),
        task.estimated_tokens(),
    )
}

/// System prompts are long; only their first line is shown.
fn render_messages(messages: &[Message]) -> String {
    messages
        .iter()
        .map(|m| match m.role {
            Role::System => format!("[system] {} …", m.content.lines().next().unwrap_or_default()),
            _ => format!("[{}] {}", m.role, m.content),
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

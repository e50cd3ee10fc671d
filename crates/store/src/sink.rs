//! Task sinks: where tasks are persisted.
//!
//! `JsonFileSink` stores one pretty-printed JSON document per task at
//! `<dir>/<task-id>.json` and rewrites the whole file on every save.

use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use toolclaw_core::error::StoreError;
use toolclaw_core::message::{Task, TaskId};
use tracing::debug;

/// Persistence contract used by [`crate::TaskStore`].
#[async_trait]
pub trait TaskSink: Send + Sync {
    /// A human-readable name for this sink (e.g., "json-file").
    fn name(&self) -> &str;

    /// Load a task. `Ok(None)` when it does not exist.
    async fn load(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Persist a task, replacing any previous version.
    async fn save(&self, task: &Task) -> Result<(), StoreError>;
}

/// One JSON file per task.
pub struct JsonFileSink {
    dir: PathBuf,
}

impl JsonFileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &PathBuf {
        &self.dir
    }

    fn path_for(&self, id: &TaskId) -> Result<PathBuf, StoreError> {
        let raw = id.as_str();
        if raw.is_empty() || raw.contains(['/', '\\']) || raw == "." || raw == ".." {
            return Err(StoreError::Storage(format!("Invalid task id '{raw}'")));
        }
        Ok(self.dir.join(format!("{raw}.json")))
    }
}

#[async_trait]
impl TaskSink for JsonFileSink {
    fn name(&self) -> &str {
        "json-file"
    }

    async fn load(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let path = self.path_for(id)?;
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(StoreError::Storage(format!(
                    "Failed to read task file {}: {e}",
                    path.display()
                )));
            }
        };

        let task = serde_json::from_str(&content).map_err(|e| {
            StoreError::Storage(format!("Corrupted task file {}: {e}", path.display()))
        })?;
        Ok(Some(task))
    }

    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        let path = self.path_for(&task.id)?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to create task directory: {e}")))?;

        let content = serde_json::to_string_pretty(task)
            .map_err(|e| StoreError::Storage(format!("Failed to serialize task: {e}")))?;

        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StoreError::Storage(format!("Failed to write task file: {e}")))?;

        debug!(task_id = %task.id, messages = task.messages.len(), "Task saved");
        Ok(())
    }
}

/// Keeps tasks in a map. Nothing survives the process.
#[derive(Default)]
pub struct InMemorySink {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.tasks.read().await.is_empty()
    }
}

#[async_trait]
impl TaskSink for InMemorySink {
    fn name(&self) -> &str {
        "in-memory"
    }

    async fn load(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.read().await.get(id.as_str()).cloned())
    }

    async fn save(&self, task: &Task) -> Result<(), StoreError> {
        self.tasks
            .write()
            .await
            .insert(task.id.as_str().to_string(), task.clone());
        Ok(())
    }
}

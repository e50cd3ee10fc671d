//! Task store: create, resume and append to tasks.
//!
//! Every mutation is written through to the sink before it returns. The most
//! recently used task is kept in memory so consecutive appends during a run
//! do not reload it.

use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;
use toolclaw_core::error::StoreError;
use toolclaw_core::message::{Message, Role, Task, TaskId};
use tracing::{debug, info};

use crate::sink::TaskSink;

pub struct TaskStore {
    sink: Arc<dyn TaskSink>,
    last_used: Mutex<Option<Task>>,
}

impl TaskStore {
    pub fn new(sink: Arc<dyn TaskSink>) -> Self {
        Self {
            sink,
            last_used: Mutex::new(None),
        }
    }

    /// Create and persist a task seeded with `system_prompt`.
    pub async fn create_task(
        &self,
        mode: &str,
        cwd: impl Into<PathBuf>,
        system_prompt: &str,
    ) -> Result<TaskId, StoreError> {
        let task = Task::new(mode, cwd, system_prompt);
        self.sink.save(&task).await?;
        info!(task_id = %task.id, mode = %mode, sink = self.sink.name(), "Task created");
        let id = task.id.clone();
        *self.last_used.lock().await = Some(task);
        Ok(id)
    }

    /// Look up a task, serving the last-used one from memory.
    pub async fn get_task(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        let mut cache = self.last_used.lock().await;
        if let Some(task) = cache.as_ref().filter(|t| &t.id == id) {
            return Ok(Some(task.clone()));
        }
        let loaded = self.sink.load(id).await?;
        if let Some(task) = &loaded {
            debug!(task_id = %id, messages = task.messages.len(), "Task loaded");
            *cache = Some(task.clone());
        }
        Ok(loaded)
    }

    /// Like [`get_task`](Self::get_task) but a missing task is an error.
    pub async fn require_task(&self, id: &TaskId) -> Result<Task, StoreError> {
        self.get_task(id)
            .await?
            .ok_or_else(|| StoreError::TaskNotFound(id.to_string()))
    }

    pub async fn add_user_message(&self, id: &TaskId, content: &str) -> Result<(), StoreError> {
        self.append(id, Message::user(content)).await
    }

    pub async fn add_assistant_message(&self, id: &TaskId, content: &str) -> Result<(), StoreError> {
        self.append(id, Message::assistant(content)).await
    }

    pub async fn add_tool_message(&self, id: &TaskId, content: &str) -> Result<(), StoreError> {
        self.append(id, Message::tool(content)).await
    }

    pub async fn get_messages(&self, id: &TaskId) -> Result<Vec<Message>, StoreError> {
        Ok(self.require_task(id).await?.messages)
    }

    /// Replace the seeded system message, e.g. when a task resumes under a
    /// different mode. The task mode is updated with it.
    pub async fn update_system_prompt(
        &self,
        id: &TaskId,
        mode: &str,
        system_prompt: &str,
    ) -> Result<(), StoreError> {
        let mut task = self.require_task(id).await?;
        match task.messages.iter_mut().find(|m| m.role == Role::System) {
            Some(system) => system.content = system_prompt.to_string(),
            None => task.messages.insert(0, Message::system(system_prompt)),
        }
        task.mode = mode.to_string();
        task.touch();
        debug!(task_id = %id, mode = %mode, "System prompt replaced");
        self.commit(task).await
    }

    async fn append(&self, id: &TaskId, message: Message) -> Result<(), StoreError> {
        let mut task = self.require_task(id).await?;
        debug!(task_id = %id, role = %message.role, "Appending message");
        task.push(message);
        self.commit(task).await
    }

    /// Persist first, then refresh the cache, so a failed write leaves the
    /// cached copy matching the sink.
    async fn commit(&self, task: Task) -> Result<(), StoreError> {
        self.sink.save(&task).await?;
        *self.last_used.lock().await = Some(task);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::{InMemorySink, JsonFileSink};
    use async_trait::async_trait;

    fn memory_store() -> TaskStore {
        TaskStore::new(Arc::new(InMemorySink::new()))
    }

    #[tokio::test]
    async fn create_seeds_system_message() {
        let store = memory_store();
        let id = store.create_task("code", "/work", "You are helpful.").await.unwrap();
        let messages = store.get_messages(&id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].role, Role::System);
        assert_eq!(messages[0].content, "You are helpful.");
    }

    #[tokio::test]
    async fn appends_keep_order() {
        let store = memory_store();
        let id = store.create_task("code", "/work", "sys").await.unwrap();
        store.add_user_message(&id, "list files").await.unwrap();
        store.add_assistant_message(&id, "<list_files>...</list_files>").await.unwrap();
        store.add_tool_message(&id, "a.txt").await.unwrap();

        let roles: Vec<Role> = store
            .get_messages(&id)
            .await
            .unwrap()
            .into_iter()
            .map(|m| m.role)
            .collect();
        assert_eq!(roles, vec![Role::System, Role::User, Role::Assistant, Role::Tool]);

        let task = store.require_task(&id).await.unwrap();
        assert!(task.updated_at >= task.created_at);
    }

    #[tokio::test]
    async fn unknown_task_is_not_found() {
        let store = memory_store();
        let id = TaskId::from("missing");
        assert!(store.get_task(&id).await.unwrap().is_none());
        assert!(matches!(
            store.require_task(&id).await,
            Err(StoreError::TaskNotFound(_))
        ));
        assert!(matches!(
            store.add_user_message(&id, "hi").await,
            Err(StoreError::TaskNotFound(_))
        ));
    }

    #[tokio::test]
    async fn survives_reopen_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = TaskStore::new(Arc::new(JsonFileSink::new(dir.path())));
            let id = store.create_task("ask", "/work", "sys").await.unwrap();
            store.add_user_message(&id, "question").await.unwrap();
            id
        };

        let reopened = TaskStore::new(Arc::new(JsonFileSink::new(dir.path())));
        let task = reopened.require_task(&id).await.unwrap();
        assert_eq!(task.mode, "ask");
        assert_eq!(task.messages.len(), 2);
    }

    #[tokio::test]
    async fn update_system_prompt_replaces_seed() {
        let store = memory_store();
        let id = store.create_task("code", "/work", "old").await.unwrap();
        store.add_user_message(&id, "hi").await.unwrap();
        store.update_system_prompt(&id, "ask", "new").await.unwrap();

        let task = store.require_task(&id).await.unwrap();
        assert_eq!(task.messages.len(), 2);
        assert_eq!(task.messages[0].content, "new");
        assert_eq!(task.mode, "ask");
    }

    #[tokio::test]
    async fn update_system_prompt_refreshes_updated_at() {
        let store = memory_store();
        let id = store.create_task("code", "/work", "old").await.unwrap();
        let before = store.require_task(&id).await.unwrap().updated_at;

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        store.update_system_prompt(&id, "ask", "new").await.unwrap();

        let task = store.require_task(&id).await.unwrap();
        assert!(task.updated_at > before);
        assert!(task.updated_at >= task.created_at);
    }

    struct BrokenSink;

    #[async_trait]
    impl TaskSink for BrokenSink {
        fn name(&self) -> &str {
            "broken"
        }
        async fn load(&self, _id: &TaskId) -> Result<Option<Task>, StoreError> {
            Ok(None)
        }
        async fn save(&self, _task: &Task) -> Result<(), StoreError> {
            Err(StoreError::Storage("disk full".into()))
        }
    }

    #[tokio::test]
    async fn failed_write_propagates() {
        let store = TaskStore::new(Arc::new(BrokenSink));
        let err = store.create_task("code", "/", "sys").await.unwrap_err();
        assert!(err.to_string().contains("disk full"));
    }
}

//! Task Store — the authoritative in-memory registry of tasks.
//!
//! Each task is guarded by its own lock; the store-level map and the session
//! index each have their own. The store lock is always acquired first and is
//! never held across an await on a per-task lock acquisition in the opposite
//! order. Every read hands out a defensive copy.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};

use a2a_mesh::{
    Artifact, Message, PushNotificationConfig, Task, TaskStatus,
};

use crate::error::{CoreError, CoreResult};

/// In-memory task registry with a session index.
#[derive(Default)]
pub struct TaskStore {
    tasks: RwLock<HashMap<String, Arc<Mutex<Task>>>>,
    sessions: RwLock<HashMap<String, Vec<String>>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a task. Fails with `AlreadyExists` when the id is taken.
    pub async fn create(
        &self,
        id: &str,
        session_id: Option<String>,
        parent_id: Option<String>,
        initial_message: Message,
    ) -> CoreResult<Task> {
        let session_id =
            session_id.unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        let task = {
            let mut tasks = self.tasks.write().await;
            if tasks.contains_key(id) {
                return Err(CoreError::AlreadyExists(id.to_string()));
            }
            let mut task = Task::new(id, session_id.clone());
            task.parent_id = parent_id;
            task.history.push(initial_message);
            tasks.insert(id.to_string(), Arc::new(Mutex::new(task.clone())));
            task
        };

        // Sessions are created implicitly on first reference.
        let mut sessions = self.sessions.write().await;
        sessions
            .entry(session_id)
            .or_default()
            .push(id.to_string());

        tracing::debug!(task_id = %id, session_id = %task.session_id, "Created task");
        Ok(task)
    }

    /// Whether a task with this id exists.
    pub async fn exists(&self, id: &str) -> bool {
        self.tasks.read().await.contains_key(id)
    }

    /// Get a defensive copy of a task, optionally truncating history to the
    /// most recent `history_length` messages. Zero yields an empty history.
    pub async fn get(&self, id: &str, history_length: Option<i64>) -> CoreResult<Task> {
        let handle = self.handle(id).await?;
        let task = handle.lock().await;
        let mut snapshot = task.clone();
        drop(task);
        truncate_history(&mut snapshot, history_length)?;
        Ok(snapshot)
    }

    /// Append a message to the task history.
    pub async fn append_message(&self, id: &str, message: Message) -> CoreResult<Task> {
        let handle = self.handle(id).await?;
        let mut task = handle.lock().await;
        if task.is_terminal() {
            return Err(CoreError::Terminal(id.to_string()));
        }
        task.history.push(message);
        Ok(task.clone())
    }

    /// Append or merge an artifact.
    ///
    /// Chunks with `append = true` extend the parts of the artifact at the
    /// same `index`; otherwise the chunk replaces it. A chunk addressing an
    /// index with no existing artifact creates it either way.
    pub async fn append_artifact(&self, id: &str, artifact: Artifact) -> CoreResult<Task> {
        let handle = self.handle(id).await?;
        let mut task = handle.lock().await;
        if task.is_terminal() {
            return Err(CoreError::Terminal(id.to_string()));
        }

        let position = task.artifacts.iter().position(|a| a.index == artifact.index);
        match position {
            Some(pos) if artifact.append.unwrap_or(false) => {
                let existing = &mut task.artifacts[pos];
                existing.parts.extend(artifact.parts);
                existing.last_chunk = artifact.last_chunk.or(existing.last_chunk);
            }
            Some(pos) => task.artifacts[pos] = artifact,
            None => task.artifacts.push(artifact),
        }
        Ok(task.clone())
    }

    /// Apply a status transition, enforcing the lifecycle graph.
    ///
    /// A status message rides along into the history so the transcript stays
    /// complete (terminal messages included).
    pub async fn update_status(&self, id: &str, status: TaskStatus) -> CoreResult<Task> {
        let handle = self.handle(id).await?;
        let mut task = handle.lock().await;

        let current = task.status.state;
        if current.is_terminal() {
            return Err(CoreError::Terminal(id.to_string()));
        }
        if !current.can_transition(status.state) {
            return Err(CoreError::IllegalTransition {
                id: id.to_string(),
                from: current,
                to: status.state,
            });
        }

        if let Some(ref message) = status.message {
            task.history.push(message.clone());
        }
        task.status = status;
        tracing::debug!(task_id = %id, state = %task.status.state, "Task transitioned");
        Ok(task.clone())
    }

    /// Store the push notification config for a task.
    pub async fn set_push(
        &self,
        id: &str,
        config: PushNotificationConfig,
    ) -> CoreResult<PushNotificationConfig> {
        let handle = self.handle(id).await?;
        let mut task = handle.lock().await;
        task.push_notification = Some(config.clone());
        Ok(config)
    }

    /// Retrieve the push notification config for a task.
    pub async fn get_push(&self, id: &str) -> CoreResult<Option<PushNotificationConfig>> {
        let handle = self.handle(id).await?;
        let task = handle.lock().await;
        Ok(task.push_notification.clone())
    }

    /// Snapshots of all tasks in a session, in creation order.
    pub async fn list_by_session(&self, session_id: &str) -> Vec<Task> {
        let ids = {
            let sessions = self.sessions.read().await;
            sessions.get(session_id).cloned().unwrap_or_default()
        };
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Ok(task) = self.get(&id, None).await {
                out.push(task);
            }
        }
        out
    }

    /// Resolve the per-task handle. The store lock is released before the
    /// caller awaits the task lock.
    async fn handle(&self, id: &str) -> CoreResult<Arc<Mutex<Task>>> {
        let tasks = self.tasks.read().await;
        tasks
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound(id.to_string()))
    }
}

fn truncate_history(task: &mut Task, history_length: Option<i64>) -> CoreResult<()> {
    match history_length {
        None => Ok(()),
        Some(n) if n < 0 => Err(CoreError::InvalidParams(
            "historyLength must be non-negative".into(),
        )),
        Some(0) => {
            task.history.clear();
            Ok(())
        }
        Some(n) => {
            let n = n as usize;
            if task.history.len() > n {
                task.history = task.history.split_off(task.history.len() - n);
            }
            Ok(())
        }
    }
}

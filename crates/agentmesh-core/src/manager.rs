//! Task Manager — orchestrates the task lifecycle.
//!
//! Every mutation of a task flows through here: sends create or resume
//! tasks, executor events are applied to the store and fanned out through
//! the broker in a single serialized order per task, terminal transitions
//! trigger push delivery, and cancellation signals the executor without
//! waiting for it to acknowledge.
//!
//! The at-most-one-active-execution invariant is enforced with a claim map:
//! a send that finds a live claim for the task id is rejected before it
//! touches the task record.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, BoxStream, StreamExt};
use tokio::sync::{broadcast, mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use a2a_mesh::{
    Message, Task, TaskPushConfigParams, TaskQueryParams, TaskSendParams, TaskState, TaskStatus,
    TaskUpdate,
};
use agentmesh_memory::UnifiedMemory;

use crate::broker::{update_stream, EventBroker};
use crate::error::{CoreError, CoreResult};
use crate::executor::{EventSink, ExecutionContext, ExecutorEvent, TaskExecutor};
use crate::push::PushSender;
use crate::store::TaskStore;

/// Capacity of the executor → drive-loop event channel.
const EXECUTOR_CHANNEL: usize = 32;

/// Orchestrates task lifecycle across store, broker, executor, and push.
pub struct TaskManager {
    store: Arc<TaskStore>,
    broker: Arc<EventBroker>,
    push: Arc<PushSender>,
    executor: Arc<dyn TaskExecutor>,
    memory: Option<Arc<UnifiedMemory>>,
    running: Mutex<HashMap<String, CancellationToken>>,
}

impl TaskManager {
    pub fn new(
        store: Arc<TaskStore>,
        broker: Arc<EventBroker>,
        push: Arc<PushSender>,
        executor: Arc<dyn TaskExecutor>,
    ) -> Self {
        Self {
            store,
            broker,
            push,
            executor,
            memory: None,
            running: Mutex::new(HashMap::new()),
        }
    }

    /// Attach a unified memory: retrieved context is injected into the task
    /// view each execution sees, and completed tasks have their final
    /// message extracted as durable memory.
    pub fn with_memory(mut self, memory: Arc<UnifiedMemory>) -> Self {
        self.memory = Some(memory);
        self
    }

    pub fn store(&self) -> &Arc<TaskStore> {
        &self.store
    }

    pub fn broker(&self) -> &Arc<EventBroker> {
        &self.broker
    }

    pub fn push_sender(&self) -> &Arc<PushSender> {
        &self.push
    }

    // ── tasks/send ───────────────────────────────────────────

    /// Create or resume a task and drive execution to its reply point
    /// (terminal or input-required), then return the task snapshot.
    pub async fn send(self: &Arc<Self>, params: TaskSendParams) -> CoreResult<Task> {
        validate_history_length(params.history_length)?;
        let rx = self.start_execution(&params).await?;
        self.wait_for_reply(&params.id, rx).await?;
        self.store.get(&params.id, params.history_length).await
    }

    /// Like [`send`](Self::send), but the response channel is a live stream
    /// of status and artifact updates.
    pub async fn send_subscribe(
        self: &Arc<Self>,
        params: TaskSendParams,
    ) -> CoreResult<BoxStream<'static, TaskUpdate>> {
        let rx = self.start_execution(&params).await?;
        Ok(update_stream(rx).boxed())
    }

    /// Validate, claim, create-or-resume, store push config, subscribe, and
    /// spawn the executor. The returned receiver was subscribed before the
    /// executor could publish anything.
    async fn start_execution(
        self: &Arc<Self>,
        params: &TaskSendParams,
    ) -> CoreResult<broadcast::Receiver<TaskUpdate>> {
        params
            .message
            .validate()
            .map_err(|e| CoreError::InvalidParams(e.to_string()))?;

        // Claim the execution slot up front. A task with a live execution
        // rejects further sends outright.
        let token = CancellationToken::new();
        {
            let mut running = self.running.lock().await;
            if running.contains_key(&params.id) {
                return Err(CoreError::IllegalTransition {
                    id: params.id.clone(),
                    from: TaskState::Working,
                    to: TaskState::Working,
                });
            }
            running.insert(params.id.clone(), token.clone());
        }

        match self.setup_task(params).await {
            Ok(rx) => {
                self.spawn_execution(&params.id, params.message.clone(), token)
                    .await;
                Ok(rx)
            }
            Err(e) => {
                self.running.lock().await.remove(&params.id);
                Err(e)
            }
        }
    }

    /// Create the task, or validate that an existing one is resumable.
    async fn setup_task(
        &self,
        params: &TaskSendParams,
    ) -> CoreResult<broadcast::Receiver<TaskUpdate>> {
        if self.store.exists(&params.id).await {
            let snapshot = self.store.get(&params.id, None).await?;
            match snapshot.status.state {
                state if state.is_terminal() => {
                    return Err(CoreError::Terminal(params.id.clone()))
                }
                TaskState::InputRequired => {
                    self.store
                        .append_message(&params.id, params.message.clone())
                        .await?;
                }
                from => {
                    return Err(CoreError::IllegalTransition {
                        id: params.id.clone(),
                        from,
                        to: TaskState::Working,
                    })
                }
            }
        } else {
            self.store
                .create(
                    &params.id,
                    params.session_id.clone(),
                    params.parent_id.clone(),
                    params.message.clone(),
                )
                .await?;
        }

        if let Some(ref config) = params.push_notification {
            self.store.set_push(&params.id, config.clone()).await?;
        }

        Ok(self.broker.subscribe(&params.id).await)
    }

    /// Spawn the executor and its drive loop.
    async fn spawn_execution(
        self: &Arc<Self>,
        id: &str,
        message: Message,
        token: CancellationToken,
    ) {
        let mut snapshot = match self.store.get(id, None).await {
            Ok(task) => task,
            Err(e) => {
                tracing::error!(task_id = %id, error = %e, "Task vanished before execution");
                self.running.lock().await.remove(id);
                return;
            }
        };

        // Retrieved context goes into the task view this execution sees,
        // not into the stored history.
        if let Some(ref memory) = self.memory {
            memory.inject_memories(&mut snapshot).await;
        }

        let (tx, rx) = mpsc::channel(EXECUTOR_CHANNEL);
        let sink = EventSink::new(tx.clone());
        let failure_sink = EventSink::new(tx);
        let ctx = ExecutionContext {
            task: snapshot,
            message,
            cancel: token,
        };

        let executor = Arc::clone(&self.executor);
        let exec_id = id.to_string();
        tokio::spawn(async move {
            if let Err(e) = executor.execute(ctx, sink).await {
                tracing::error!(task_id = %exec_id, error = %e, "Executor failed");
                failure_sink
                    .status(
                        TaskState::Failed,
                        Some(Message::agent_text(e.class_description())),
                    )
                    .await;
            }
        });

        let manager = Arc::clone(self);
        let drive_id = id.to_string();
        tokio::spawn(async move {
            manager.drive(drive_id, rx).await;
        });
    }

    /// Apply executor events to the store and fan them out, in order.
    async fn drive(self: Arc<Self>, id: String, mut rx: mpsc::Receiver<ExecutorEvent>) {
        while let Some(event) = rx.recv().await {
            match event {
                ExecutorEvent::Status { state, message } => {
                    let status = TaskStatus {
                        state,
                        message,
                        timestamp: Utc::now(),
                    };
                    match self.store.update_status(&id, status.clone()).await {
                        Ok(task) => {
                            let is_final = state.is_terminal();
                            let update = TaskUpdate::status(&id, status, is_final);
                            if is_final || state == TaskState::InputRequired {
                                // Release the claim and publish under the
                                // claim lock: a follow-up send can neither be
                                // spuriously rejected nor have its events
                                // ordered ahead of this reply point.
                                let mut running = self.running.lock().await;
                                running.remove(&id);
                                self.broker.publish(update).await;
                            } else {
                                self.broker.publish(update).await;
                            }
                            if is_final {
                                self.finish(&id, &task).await;
                                return;
                            }
                            if state == TaskState::InputRequired {
                                return;
                            }
                        }
                        Err(CoreError::Terminal(_)) => {
                            tracing::debug!(task_id = %id, "Discarding executor event after terminal state");
                        }
                        Err(e) => {
                            tracing::warn!(task_id = %id, error = %e, "Dropped executor status update");
                        }
                    }
                }
                ExecutorEvent::Artifact(artifact) => {
                    match self.store.append_artifact(&id, artifact.clone()).await {
                        Ok(_) => {
                            self.broker
                                .publish(TaskUpdate::artifact(&id, artifact))
                                .await;
                        }
                        Err(e) => {
                            tracing::debug!(task_id = %id, error = %e, "Dropped executor artifact");
                        }
                    }
                }
                ExecutorEvent::Message(message) => {
                    if let Err(e) = self.store.append_message(&id, message).await {
                        tracing::debug!(task_id = %id, error = %e, "Dropped executor message");
                    }
                }
            }
        }

        // The executor went away without reaching a reply point.
        if let Ok(task) = self.store.get(&id, Some(0)).await {
            if matches!(
                task.status.state,
                TaskState::Submitted | TaskState::Working
            ) {
                let status = TaskStatus::with_message(
                    TaskState::Failed,
                    Message::agent_text("the agent stopped unexpectedly"),
                );
                if let Ok(task) = self.store.update_status(&id, status.clone()).await {
                    self.broker
                        .publish(TaskUpdate::status(&id, status, true))
                        .await;
                    self.finish(&id, &task).await;
                    return;
                }
            }
        }
        self.running.lock().await.remove(&id);
    }

    /// Terminal housekeeping: release the claim, fire push delivery,
    /// extract memory from completed tasks, close the event channel.
    async fn finish(&self, id: &str, task: &Task) {
        self.running.lock().await.remove(id);
        if let Some(config) = task.push_notification.clone() {
            let push = Arc::clone(&self.push);
            let snapshot = task.clone();
            tokio::spawn(async move {
                push.deliver(&snapshot, &config).await;
            });
        }
        if task.status.state == TaskState::Completed {
            if let Some(memory) = self.memory.clone() {
                let snapshot = task.clone();
                tokio::spawn(async move {
                    memory.extract_memories(&snapshot).await;
                });
            }
        }
        self.broker.close(id).await;
    }

    /// Wait until the task reaches terminal or input-required.
    async fn wait_for_reply(
        &self,
        id: &str,
        mut rx: broadcast::Receiver<TaskUpdate>,
    ) -> CoreResult<()> {
        loop {
            match rx.recv().await {
                Ok(TaskUpdate::Status(event))
                    if event.status.state.is_terminal()
                        || event.status.state == TaskState::InputRequired =>
                {
                    return Ok(())
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Closed) => return Ok(()),
                Err(broadcast::error::RecvError::Lagged(_)) => {
                    // Our queue overflowed; reconcile against the store.
                    let state = self.store.get(id, Some(0)).await?.status.state;
                    if state.is_terminal() || state == TaskState::InputRequired {
                        return Ok(());
                    }
                }
            }
        }
    }

    // ── tasks/get ────────────────────────────────────────────

    pub async fn get(&self, params: TaskQueryParams) -> CoreResult<Task> {
        validate_history_length(params.history_length)?;
        self.store.get(&params.id, params.history_length).await
    }

    // ── tasks/cancel ─────────────────────────────────────────

    /// Record the cancellation, signal the executor, and publish the final
    /// event. Idempotent: canceling a terminal task returns its snapshot.
    pub async fn cancel(&self, id: &str) -> CoreResult<Task> {
        let snapshot = self.store.get(id, None).await?;
        if snapshot.is_terminal() {
            return Ok(snapshot);
        }

        let status = TaskStatus::new(TaskState::Canceled);
        match self.store.update_status(id, status.clone()).await {
            Ok(task) => {
                if let Some(token) = self.running.lock().await.remove(id) {
                    token.cancel();
                }
                self.broker
                    .publish(TaskUpdate::status(id, status, true))
                    .await;
                self.finish(id, &task).await;
                Ok(task)
            }
            // Lost the race against the executor's own terminal transition.
            Err(CoreError::Terminal(_)) => self.store.get(id, None).await,
            Err(e) => Err(e),
        }
    }

    // ── tasks/resubscribe ────────────────────────────────────

    /// Re-attach to a task's stream. The first event is a synthesized status
    /// update carrying the current status so subscribers can reconcile.
    pub async fn resubscribe(&self, id: &str) -> CoreResult<BoxStream<'static, TaskUpdate>> {
        let snapshot = self.store.get(id, Some(0)).await?;
        let is_terminal = snapshot.is_terminal();
        let first = TaskUpdate::status(id, snapshot.status.clone(), is_terminal);

        let live: BoxStream<'static, TaskUpdate> = if is_terminal {
            stream::empty().boxed()
        } else {
            update_stream(self.broker.subscribe(id).await).boxed()
        };

        Ok(stream::once(async move { first }).chain(live).boxed())
    }

    // ── tasks/pushNotification ───────────────────────────────

    pub async fn set_push(&self, params: TaskPushConfigParams) -> CoreResult<TaskPushConfigParams> {
        let stored = self
            .store
            .set_push(&params.id, params.push_notification_config)
            .await?;
        Ok(TaskPushConfigParams {
            id: params.id,
            push_notification_config: stored,
        })
    }

    pub async fn get_push(&self, id: &str) -> CoreResult<Option<TaskPushConfigParams>> {
        let config = self.store.get_push(id).await?;
        Ok(config.map(|push_notification_config| TaskPushConfigParams {
            id: id.to_string(),
            push_notification_config,
        }))
    }
}

fn validate_history_length(history_length: Option<i64>) -> CoreResult<()> {
    match history_length {
        Some(n) if n < 0 => Err(CoreError::InvalidParams(
            "historyLength must be non-negative".into(),
        )),
        _ => Ok(()),
    }
}

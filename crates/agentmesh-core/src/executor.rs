//! Task executor plug — the seam where agent logic attaches to the engine.
//!
//! The Task Manager depends on the [`TaskExecutor`] capability, not on any
//! concrete agent. An executor receives the triggering message plus a
//! cancellation token, and reports progress through an [`EventSink`]. It is
//! expected to end at a reply point: a terminal status or `input-required`.
//! Cancellation is cooperative — the executor honors the token at its next
//! suspension point; anything it emits after the task went terminal is
//! discarded by the engine.

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use a2a_mesh::{Artifact, FormPayload, Message, Task, TaskState};

/// What the executor sees when it starts.
#[derive(Clone)]
pub struct ExecutionContext {
    /// Snapshot of the task at spawn time.
    pub task: Task,

    /// The message that triggered this execution.
    pub message: Message,

    /// Cooperative cancellation signal.
    pub cancel: CancellationToken,
}

/// Progress reported by an executor, applied to the task in emission order.
#[derive(Debug, Clone)]
pub enum ExecutorEvent {
    /// Transition the task state, optionally attaching a message.
    Status {
        state: TaskState,
        message: Option<Message>,
    },

    /// Emit or extend an artifact.
    Artifact(Artifact),

    /// Append a message to the history without a state change.
    Message(Message),
}

/// Handle the executor uses to report progress.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<ExecutorEvent>,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<ExecutorEvent>) -> Self {
        Self { tx }
    }

    async fn emit(&self, event: ExecutorEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Report a state transition. Returns false when the engine is gone.
    pub async fn status(&self, state: TaskState, message: Option<Message>) -> bool {
        self.emit(ExecutorEvent::Status { state, message }).await
    }

    /// Report the task as actively working.
    pub async fn working(&self) -> bool {
        self.status(TaskState::Working, None).await
    }

    /// Finish successfully, optionally attaching a closing message.
    pub async fn completed(&self, message: Option<Message>) -> bool {
        self.status(TaskState::Completed, message).await
    }

    /// Suspend, waiting for further input from the caller.
    pub async fn input_required(&self, message: Message) -> bool {
        self.status(TaskState::InputRequired, Some(message)).await
    }

    /// Emit an artifact.
    pub async fn artifact(&self, artifact: Artifact) -> bool {
        self.emit(ExecutorEvent::Artifact(artifact)).await
    }

    /// Append a history message.
    pub async fn message(&self, message: Message) -> bool {
        self.emit(ExecutorEvent::Message(message)).await
    }
}

/// Failure classes an executor may report.
///
/// Only the class reaches the caller; the detail stays in the logs so raw
/// text from untrusted components is never echoed.
#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("execution was canceled")]
    Canceled,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream dependency failed: {0}")]
    Upstream(String),

    #[error("internal executor failure: {0}")]
    Internal(String),
}

impl ExecutorError {
    /// Sanitized, class-only description for the task's status message.
    pub fn class_description(&self) -> &'static str {
        match self {
            ExecutorError::Canceled => "execution was canceled",
            ExecutorError::InvalidInput(_) => "the request input was invalid",
            ExecutorError::Upstream(_) => "an upstream dependency failed",
            ExecutorError::Internal(_) => "the agent encountered an internal error",
        }
    }
}

/// The capability the Task Manager drives.
#[async_trait]
pub trait TaskExecutor: Send + Sync {
    async fn execute(&self, ctx: ExecutionContext, sink: EventSink)
        -> Result<(), ExecutorError>;
}

/// Reference executor: echoes the incoming text back as an artifact.
pub struct EchoExecutor;

#[async_trait]
impl TaskExecutor for EchoExecutor {
    async fn execute(
        &self,
        ctx: ExecutionContext,
        sink: EventSink,
    ) -> Result<(), ExecutorError> {
        sink.working().await;
        let text = ctx.message.text_content();
        sink.artifact(Artifact::text(text.clone())).await;
        sink.completed(Some(Message::agent_text(text))).await;
        Ok(())
    }
}

/// Reference executor for the input-required round trip: the first send is
/// answered with a form request; a send carrying the filled form completes.
pub struct FormExecutor {
    form: serde_json::Value,
    instructions: String,
}

impl FormExecutor {
    pub fn new(form: serde_json::Value, instructions: impl Into<String>) -> Self {
        Self {
            form,
            instructions: instructions.into(),
        }
    }
}

impl Default for FormExecutor {
    fn default() -> Self {
        Self::new(
            serde_json::json!({
                "type": "object",
                "properties": { "value": { "type": "string" } },
                "required": ["value"]
            }),
            "Please provide the missing value",
        )
    }
}

#[async_trait]
impl TaskExecutor for FormExecutor {
    async fn execute(
        &self,
        ctx: ExecutionContext,
        sink: EventSink,
    ) -> Result<(), ExecutorError> {
        sink.working().await;

        let filled = ctx.message.parts.iter().find_map(FormPayload::from_part);
        match filled {
            Some(payload) => {
                sink.artifact(Artifact::data(payload.form_data.clone())).await;
                sink.completed(Some(Message::agent_text("form received"))).await;
            }
            None => {
                let request =
                    FormPayload::new(self.form.clone(), serde_json::json!({}), &self.instructions);
                sink.input_required(Message::agent(vec![request.into_part()]))
                    .await;
            }
        }
        Ok(())
    }
}

//! SSE (Server-Sent Events) transport for A2A streaming.
//!
//! Used for task update delivery via `tasks/sendSubscribe` and
//! `tasks/resubscribe`. The client side feeds the HTTP byte stream through
//! an SSE decoder so frames split across chunks reassemble correctly.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;

use crate::error::MeshError;
use crate::event::TaskUpdate;

/// A stream of task updates received via SSE.
///
/// Terminates when the server sends a `final: true` status update or the
/// connection drops. A subscriber that observes a gap (events were dropped
/// for it under backpressure) reconciles by calling `tasks/resubscribe`.
pub struct TaskUpdateStream {
    inner: Pin<Box<dyn Stream<Item = Result<TaskUpdate, MeshError>> + Send>>,
}

impl TaskUpdateStream {
    /// Wrap an event stream.
    pub fn new(inner: Pin<Box<dyn Stream<Item = Result<TaskUpdate, MeshError>> + Send>>) -> Self {
        Self { inner }
    }
}

impl Stream for TaskUpdateStream {
    type Item = Result<TaskUpdate, MeshError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// Parse one SSE `data:` payload into a task update.
pub fn parse_update(data: &str) -> Result<TaskUpdate, MeshError> {
    serde_json::from_str(data)
        .map_err(|e| MeshError::Streaming(format!("failed to parse SSE event: {e}")))
}

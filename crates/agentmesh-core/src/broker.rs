//! SSE Broker — fans out per-task events to any number of subscribers.
//!
//! Each task gets its own broadcast channel with a small bounded buffer.
//! Publishing never blocks: a subscriber that falls behind loses its oldest
//! undelivered events (that subscriber only) and is expected to reconcile
//! via `tasks/resubscribe`. Closing a task's channel ends every live
//! subscriber stream.

use std::collections::HashMap;

use futures::{Stream, StreamExt};
use tokio::sync::{broadcast, RwLock};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;

use a2a_mesh::TaskUpdate;

/// Bounded per-subscriber queue. Overflow drops the oldest undelivered
/// events for the lagging subscriber only.
const SUBSCRIBER_QUEUE: usize = 8;

/// Buffer for the cross-task firehose serving `/events`.
const FIREHOSE_QUEUE: usize = 64;

/// Per-task event fan-out.
pub struct EventBroker {
    channels: RwLock<HashMap<String, broadcast::Sender<TaskUpdate>>>,
    firehose: broadcast::Sender<TaskUpdate>,
}

impl Default for EventBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroker {
    pub fn new() -> Self {
        let (firehose, _) = broadcast::channel(FIREHOSE_QUEUE);
        Self {
            channels: RwLock::new(HashMap::new()),
            firehose,
        }
    }

    /// Subscribe to a task's events. The channel is created on demand, so a
    /// subscription obtained before the next publish is guaranteed to
    /// observe that publish.
    pub async fn subscribe(&self, id: &str) -> broadcast::Receiver<TaskUpdate> {
        let mut channels = self.channels.write().await;
        channels
            .entry(id.to_string())
            .or_insert_with(|| broadcast::channel(SUBSCRIBER_QUEUE).0)
            .subscribe()
    }

    /// Publish an event to the task's subscribers and the firehose.
    /// Never blocks; events published to a closed or absent channel are
    /// dropped.
    pub async fn publish(&self, update: TaskUpdate) {
        {
            let channels = self.channels.read().await;
            if let Some(sender) = channels.get(update.task_id()) {
                // Send only fails when there are no receivers; that's fine.
                let _ = sender.send(update.clone());
            }
        }
        let _ = self.firehose.send(update);
    }

    /// Terminate all current subscribers to a task.
    pub async fn close(&self, id: &str) {
        let mut channels = self.channels.write().await;
        channels.remove(id);
    }

    /// Subscribe to every task's events (the `/events` firehose).
    pub fn subscribe_all(&self) -> broadcast::Receiver<TaskUpdate> {
        self.firehose.subscribe()
    }
}

/// Turn a broadcast receiver into an event stream. Lag gaps are skipped:
/// the subscriber observes a hole and recovers by resubscribing.
pub fn update_stream(
    rx: broadcast::Receiver<TaskUpdate>,
) -> impl Stream<Item = TaskUpdate> + Send {
    BroadcastStream::new(rx).filter_map(|item| async move {
        match item {
            Ok(update) => Some(update),
            Err(BroadcastStreamRecvError::Lagged(missed)) => {
                tracing::warn!(missed, "Subscriber lagged; dropped oldest events");
                None
            }
        }
    })
}

//! Fire-and-forget progress events for live status pages.

use chrono::{DateTime, Utc};
use serde::Serialize;
use showrunner_core::{ActionKind, ShowId, TaskState};
use tokio::sync::broadcast;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize)]
pub struct ProgressEvent {
    pub task_id: Uuid,
    pub show: ShowId,
    pub kind: ActionKind,
    pub state: TaskState,
    pub message: String,
    pub at: DateTime<Utc>,
}

#[derive(Clone)]
pub struct ProgressChannel {
    tx: broadcast::Sender<ProgressEvent>,
}

impl ProgressChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ProgressEvent> {
        self.tx.subscribe()
    }

    /// Publish to whoever is listening. Events are dropped when nobody is.
    pub fn publish(&self, event: ProgressEvent) {
        let _ = self.tx.send(event);
    }
}

impl Default for ProgressChannel {
    fn default() -> Self {
        Self::new(256)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showrunner_core::IndexerKind;

    fn event(message: &str) -> ProgressEvent {
        ProgressEvent {
            task_id: Uuid::new_v4(),
            show: ShowId::new(IndexerKind::Tmdb, 1396),
            kind: ActionKind::Refresh,
            state: TaskState::Running,
            message: message.into(),
            at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn publish_without_listeners_is_a_no_op() {
        let channel = ProgressChannel::new(4);
        channel.publish(event("nobody hears this"));

        let mut rx = channel.subscribe();
        channel.publish(event("Scanning folder"));
        let received = rx.recv().await.unwrap();
        assert_eq!(received.message, "Scanning folder");
        assert_eq!(received.show.to_string(), "tmdb:1396");
    }
}

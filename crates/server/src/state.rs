use chrono::{DateTime, Utc};
use showrunner_queue::{ProgressChannel, ProgressEvent, ShowQueue};
use sqlx::SqlitePool;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

/// Server-sent event types.
#[derive(Debug, Clone, serde::Serialize)]
#[serde(tag = "type", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "task_progress")]
    TaskProgress(ProgressEvent),
    #[serde(rename = "heartbeat")]
    Heartbeat { seq: u64, at: DateTime<Utc> },
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            Self::TaskProgress(_) => "task_progress",
            Self::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub queue: ShowQueue,
    pub events: broadcast::Sender<ServerEvent>,
}

impl AppState {
    /// Wire the queue's progress channel into the server event stream.
    pub fn new(db: SqlitePool, queue: ShowQueue, events: broadcast::Sender<ServerEvent>) -> Self {
        forward_progress(&queue.services().progress, events.clone());
        Self { db, queue, events }
    }
}

fn forward_progress(progress: &ProgressChannel, events: broadcast::Sender<ServerEvent>) -> JoinHandle<()> {
    let mut rx = progress.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => {
                    let _ = events.send(ServerEvent::TaskProgress(event));
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    debug!(skipped = n, "progress forwarder lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

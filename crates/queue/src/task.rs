//! Per-task bookkeeping shared by every queue item.

use std::fmt;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use showrunner_core::TaskState;
use tokio::sync::watch;
use uuid::Uuid;

use crate::priority::Priority;

#[derive(Debug)]
struct TaskStatus {
    state: TaskState,
    success: bool,
    is_loading: bool,
    progress: Vec<String>,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    error: Option<String>,
}

/// Identity, priority and mutable status of one queued task.
///
/// `K` is the action kind and `I` identifies the target the task acts on.
/// The target identifier is known up front even when the target entity itself
/// does not exist yet; `is_loading` stays true until the workflow has one.
pub struct TaskInfo<K, I> {
    id: Uuid,
    kind: K,
    target: I,
    priority: Priority,
    created_at: DateTime<Utc>,
    status: RwLock<TaskStatus>,
    state_tx: watch::Sender<TaskState>,
}

impl<K: Copy, I: Copy> TaskInfo<K, I> {
    pub fn new(kind: K, target: I, priority: Priority, is_loading: bool) -> Self {
        let (state_tx, _) = watch::channel(TaskState::Pending);
        Self {
            id: Uuid::new_v4(),
            kind,
            target,
            priority,
            created_at: Utc::now(),
            status: RwLock::new(TaskStatus {
                state: TaskState::Pending,
                success: false,
                is_loading,
                progress: Vec::new(),
                started_at: None,
                finished_at: None,
                error: None,
            }),
            state_tx,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn kind(&self) -> K {
        self.kind
    }

    pub fn target(&self) -> I {
        self.target
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> TaskState {
        self.status.read().state
    }

    pub fn success(&self) -> bool {
        self.status.read().success
    }

    pub fn is_loading(&self) -> bool {
        self.status.read().is_loading
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.status.read().started_at
    }

    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.status.read().finished_at
    }

    pub fn error(&self) -> Option<String> {
        self.status.read().error.clone()
    }

    pub fn progress(&self) -> Vec<String> {
        self.status.read().progress.clone()
    }

    pub fn last_step(&self) -> Option<String> {
        self.status.read().progress.last().cloned()
    }

    pub fn set_loading(&self, loading: bool) {
        self.status.write().is_loading = loading;
    }

    pub fn log_step(&self, message: impl Into<String>) {
        self.status.write().progress.push(message.into());
    }

    pub(crate) fn mark_running(&self) {
        {
            let mut status = self.status.write();
            status.state = TaskState::Running;
            status.started_at = Some(Utc::now());
        }
        self.state_tx.send_replace(TaskState::Running);
    }

    /// Move to a terminal state. A task that is already terminal is left alone.
    pub(crate) fn finish(&self, state: TaskState, error: Option<String>) -> bool {
        {
            let mut status = self.status.write();
            if status.state.is_terminal() {
                return false;
            }
            status.state = state;
            status.success = state == TaskState::Succeeded;
            status.finished_at = Some(Utc::now());
            status.error = error;
        }
        self.state_tx.send_replace(state);
        true
    }

    /// Resolve once the task reaches a terminal state.
    pub async fn wait(&self) -> TaskState {
        let mut rx = self.state_tx.subscribe();
        match rx.wait_for(|state| state.is_terminal()).await {
            Ok(state) => *state,
            // The sender lives in `self`, so it cannot be dropped while we borrow it
            Err(_) => self.state(),
        }
    }

    pub fn snapshot(&self) -> TaskSnapshot<K, I> {
        let status = self.status.read();
        TaskSnapshot {
            id: self.id,
            kind: self.kind,
            target: self.target,
            priority: self.priority,
            state: status.state,
            success: status.success,
            is_loading: status.is_loading,
            progress: status.progress.clone(),
            created_at: self.created_at,
            started_at: status.started_at,
            finished_at: status.finished_at,
            error: status.error.clone(),
        }
    }
}

impl<K: fmt::Debug, I: fmt::Debug> fmt::Debug for TaskInfo<K, I> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskInfo")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("target", &self.target)
            .field("priority", &self.priority)
            .field("state", &self.status.read().state)
            .finish()
    }
}

/// Point-in-time copy of a task, for status pages.
#[derive(Debug, Clone, Serialize)]
pub struct TaskSnapshot<K, I> {
    pub id: Uuid,
    pub kind: K,
    pub target: I,
    pub priority: Priority,
    pub state: TaskState,
    pub success: bool,
    pub is_loading: bool,
    pub progress: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub error: Option<String>,
}

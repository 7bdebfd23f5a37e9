//! Generic single-worker priority queue.
//!
//! Pending items are kept sorted by priority, FIFO within a priority band.
//! One background worker pops the head, runs it to completion and moves on,
//! so at most one item per queue is ever running. Admission decisions that
//! need to look at the queue and then enqueue take [`GenericQueue::lock`] so
//! both happen under the same mutex.

use std::collections::VecDeque;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use parking_lot::{Mutex, MutexGuard};
use showrunner_core::TaskState;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::task::TaskInfo;

/// How a task's workflow ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Completed,
    Failed(String),
    /// The task could not act, e.g. its target was deleted first. Ends `Cancelled`.
    Abandoned(String),
}

/// A unit of work the queue can schedule.
#[async_trait::async_trait]
pub trait QueueItem: Send + Sync + 'static {
    type Kind: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync;
    type Target: Copy + Eq + fmt::Debug + fmt::Display + Send + Sync;
    type Context: Send + Sync + 'static;

    fn info(&self) -> &TaskInfo<Self::Kind, Self::Target>;

    async fn run(&self, ctx: &Self::Context) -> TaskOutcome;

    /// Called by the worker after every state change it makes.
    fn on_state_change(&self, _ctx: &Self::Context, _state: TaskState) {}
}

struct QueueState<T> {
    pending: VecDeque<Arc<T>>,
    current: Option<Arc<T>>,
    paused: bool,
    /// Set by `shutdown`; later enqueues are cancelled on arrival.
    closed: bool,
}

pub struct GenericQueue<T: QueueItem> {
    name: &'static str,
    state: Mutex<QueueState<T>>,
    wake: Notify,
    shutdown: CancellationToken,
}

impl<T: QueueItem> GenericQueue<T> {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            state: Mutex::new(QueueState {
                pending: VecDeque::new(),
                current: None,
                paused: false,
                closed: false,
            }),
            wake: Notify::new(),
            shutdown: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Hold the queue mutex for a check-then-enqueue sequence.
    pub fn lock(&self) -> QueueGuard<'_, T> {
        QueueGuard {
            state: self.state.lock(),
            wake: &self.wake,
            woke: false,
        }
    }

    pub fn enqueue(&self, item: Arc<T>) -> Arc<T> {
        self.lock().enqueue(item)
    }

    pub fn is_queued(&self, target: T::Target, kinds: &[T::Kind]) -> bool {
        self.lock().is_queued(target, kinds)
    }

    pub fn is_running(&self, target: T::Target, kinds: &[T::Kind]) -> bool {
        self.lock().is_running(target, kinds)
    }

    pub fn cancel(&self, predicate: impl Fn(&T) -> bool) -> Vec<Arc<T>> {
        self.lock().cancel(predicate)
    }

    pub fn current(&self) -> Option<Arc<T>> {
        self.state.lock().current.clone()
    }

    /// Current item plus pending items in dispatch order.
    pub fn snapshot(&self) -> (Option<Arc<T>>, Vec<Arc<T>>) {
        let state = self.state.lock();
        (state.current.clone(), state.pending.iter().cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Stop dispatching. The running item, if any, is not interrupted.
    pub fn pause(&self) {
        self.state.lock().paused = true;
        info!(queue = self.name, "queue paused");
    }

    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.wake.notify_one();
        info!(queue = self.name, "queue resumed");
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Stop the worker after its current item. Pending items are cancelled,
    /// and so is anything enqueued afterwards.
    pub fn shutdown(&self) {
        self.state.lock().closed = true;
        self.shutdown.cancel();
        self.wake.notify_one();
    }

    pub fn spawn_worker(self: &Arc<Self>, ctx: Arc<T::Context>) -> JoinHandle<()> {
        let queue = Arc::clone(self);
        tokio::spawn(async move { queue.worker_loop(ctx).await })
    }

    async fn worker_loop(self: Arc<Self>, ctx: Arc<T::Context>) {
        debug!(queue = self.name, "queue worker started");
        loop {
            if self.shutdown.is_cancelled() {
                break;
            }
            let Some(item) = self.next_item() else {
                tokio::select! {
                    _ = self.shutdown.cancelled() => break,
                    _ = self.wake.notified() => continue,
                }
            };
            self.execute(item, &ctx).await;
        }

        let dropped = self.cancel(|_| true);
        for item in &dropped {
            item.on_state_change(&ctx, TaskState::Cancelled);
        }
        info!(
            queue = self.name,
            discarded = dropped.len(),
            "queue worker stopped"
        );
    }

    /// Pop the head into the current slot and mark it running, under one lock.
    fn next_item(&self) -> Option<Arc<T>> {
        let mut state = self.state.lock();
        if state.paused || state.current.is_some() {
            return None;
        }
        let item = state.pending.pop_front()?;
        item.info().mark_running();
        state.current = Some(Arc::clone(&item));
        Some(item)
    }

    async fn execute(&self, item: Arc<T>, ctx: &T::Context) {
        let info = item.info();
        info!(
            queue = self.name,
            task_id = %info.id(),
            kind = %info.kind(),
            target = %info.target(),
            priority = %info.priority(),
            "task started"
        );
        item.on_state_change(ctx, TaskState::Running);

        let result = AssertUnwindSafe(item.run(ctx)).catch_unwind().await;
        let (state, error) = match result {
            Ok(TaskOutcome::Completed) => (TaskState::Succeeded, None),
            Ok(TaskOutcome::Failed(message)) => (TaskState::Failed, Some(message)),
            Ok(TaskOutcome::Abandoned(message)) => (TaskState::Cancelled, Some(message)),
            Err(panic) => (TaskState::Failed, Some(panic_message(panic.as_ref()))),
        };

        {
            let mut queue_state = self.state.lock();
            queue_state.current = None;
            info.finish(state, error.clone());
        }

        match state {
            TaskState::Succeeded => info!(
                queue = self.name,
                task_id = %info.id(),
                kind = %info.kind(),
                target = %info.target(),
                "task succeeded"
            ),
            TaskState::Cancelled => warn!(
                queue = self.name,
                task_id = %info.id(),
                kind = %info.kind(),
                target = %info.target(),
                reason = error.as_deref().unwrap_or_default(),
                "task abandoned"
            ),
            _ => error!(
                queue = self.name,
                task_id = %info.id(),
                kind = %info.kind(),
                target = %info.target(),
                error = error.as_deref().unwrap_or_default(),
                "task failed"
            ),
        }
        item.on_state_change(ctx, state);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("task panicked: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("task panicked: {s}")
    } else {
        "task panicked".to_string()
    }
}

/// Exclusive access to the queue for admission checks.
///
/// Dropping the guard wakes the worker if anything was enqueued.
pub struct QueueGuard<'a, T: QueueItem> {
    state: MutexGuard<'a, QueueState<T>>,
    wake: &'a Notify,
    woke: bool,
}

impl<T: QueueItem> QueueGuard<'_, T> {
    /// Insert before the first pending item of strictly lower priority.
    pub fn enqueue(&mut self, item: Arc<T>) -> Arc<T> {
        if self.state.closed {
            let info = item.info();
            info.finish(TaskState::Cancelled, Some("queue is shut down".into()));
            warn!(task_id = %info.id(), kind = %info.kind(), target = %info.target(), "task refused after shutdown");
            return item;
        }
        let priority = item.info().priority();
        let position = self
            .state
            .pending
            .iter()
            .position(|queued| queued.info().priority() < priority)
            .unwrap_or(self.state.pending.len());
        self.state.pending.insert(position, Arc::clone(&item));
        self.woke = true;
        debug!(
            task_id = %item.info().id(),
            kind = %item.info().kind(),
            target = %item.info().target(),
            position,
            "task enqueued"
        );
        item
    }

    pub fn is_queued(&self, target: T::Target, kinds: &[T::Kind]) -> bool {
        self.state
            .pending
            .iter()
            .any(|queued| matches(queued.info(), target, kinds))
    }

    pub fn is_running(&self, target: T::Target, kinds: &[T::Kind]) -> bool {
        self.state
            .current
            .as_ref()
            .is_some_and(|current| matches(current.info(), target, kinds))
    }

    pub fn is_queued_or_running(&self, target: T::Target, kinds: &[T::Kind]) -> bool {
        self.is_queued(target, kinds) || self.is_running(target, kinds)
    }

    /// Remove matching pending items and mark them cancelled. The caller
    /// reports the returned items through [`QueueItem::on_state_change`].
    pub fn cancel(&mut self, predicate: impl Fn(&T) -> bool) -> Vec<Arc<T>> {
        let mut cancelled = Vec::new();
        self.state.pending.retain(|queued| {
            if predicate(queued) {
                cancelled.push(Arc::clone(queued));
                false
            } else {
                true
            }
        });
        for item in &cancelled {
            let info = item.info();
            info.finish(TaskState::Cancelled, Some("cancelled before it started".into()));
            debug!(task_id = %info.id(), kind = %info.kind(), target = %info.target(), "task cancelled");
        }
        cancelled
    }

    pub fn pending(&self) -> impl Iterator<Item = &Arc<T>> {
        self.state.pending.iter()
    }

    pub fn current(&self) -> Option<&Arc<T>> {
        self.state.current.as_ref()
    }
}

impl<T: QueueItem> Drop for QueueGuard<'_, T> {
    fn drop(&mut self) {
        if self.woke {
            self.wake.notify_one();
        }
    }
}

fn matches<K: Eq, I: Eq>(info: &TaskInfo<K, I>, target: I, kinds: &[K]) -> bool
where
    K: Copy,
    I: Copy,
{
    info.target() == target && kinds.contains(&info.kind())
}

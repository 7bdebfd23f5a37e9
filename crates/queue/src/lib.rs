//! Show-operation queue: a single-worker priority scheduler and the show
//! workflows it runs (add, update, refresh, rename, subtitles, remove,
//! change source).

pub mod artwork;
pub mod config;
pub mod engine;
pub mod integrations;
pub mod library;
pub mod priority;
pub mod progress;
pub mod show_queue;
pub mod task;
pub mod tasks;

pub use config::LibraryConfig;
pub use engine::{GenericQueue, QueueItem, TaskOutcome};
pub use library::ShowLibrary;
pub use priority::Priority;
pub use progress::{ProgressChannel, ProgressEvent};
pub use show_queue::{ShowQueue, ShowServices, ShowStatus};
pub use tasks::{AddRequest, ShowOperation, ShowTask};

use showrunner_core::ShowId;

/// Admission errors, raised before a task is queued.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    InvalidTarget(String),
    #[error("show {0} not found")]
    NotFound(ShowId),
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error(transparent)]
    Db(#[from] showrunner_db::DbError),
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Why a workflow stopped early.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    /// The show disappeared before or while the task ran.
    #[error("show {0} was deleted")]
    TargetDeleted(ShowId),
    #[error("{step}: {message}")]
    Step { step: &'static str, message: String },
}

impl WorkflowError {
    pub fn step(step: &'static str, err: impl std::fmt::Display) -> Self {
        Self::Step {
            step,
            message: err.to_string(),
        }
    }
}

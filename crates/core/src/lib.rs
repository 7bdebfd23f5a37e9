pub mod error;
pub mod show;
pub mod types;

pub use show::{Episode, EpisodeKey, Show, ShowData, ShowOptions};
pub use types::{ActionKind, EpisodeStatus, IndexerKind, ShowId, TaskState};

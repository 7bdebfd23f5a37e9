//! Optional collaborators. A missing one means the matching workflow step is skipped.

use std::path::Path;

use showrunner_core::{EpisodeKey, ShowId};

#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("{0} is unavailable")]
    Unavailable(String),
    #[error("{0}")]
    Failed(String),
}

/// External watch list that mirrors the library, e.g. a Trakt collection.
#[async_trait::async_trait]
pub trait WatchList: Send + Sync {
    fn name(&self) -> &str;
    async fn remove_show(&self, show: ShowId, title: &str) -> Result<(), IntegrationError>;
}

/// Scene to indexer episode numbering cache.
#[async_trait::async_trait]
pub trait SceneNumbering: Send + Sync {
    /// Rebuild the mapping for a show, returning how many episodes it covers.
    async fn rebuild(&self, show: ShowId, episodes: &[EpisodeKey]) -> Result<usize, IntegrationError>;
}

/// Fetches subtitle files next to an episode's media file.
#[async_trait::async_trait]
pub trait SubtitleSource: Send + Sync {
    /// Download the given languages, returning the ones actually fetched.
    async fn download(
        &self,
        show: ShowId,
        episode: EpisodeKey,
        media: &Path,
        languages: &[String],
    ) -> Result<Vec<String>, IntegrationError>;
}

/// Provider search for wanted episodes.
#[async_trait::async_trait]
pub trait BacklogSearch: Send + Sync {
    /// Queue searches for the episodes, returning how many were queued.
    async fn search(&self, show: ShowId, episodes: &[EpisodeKey]) -> Result<usize, IntegrationError>;
}

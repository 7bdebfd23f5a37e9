//! The show entity shared between the queue, the store and the HTTP layer.
//!
//! A [`Show`] is handed around as `Arc<Show>`. Its fields sit behind a
//! per-instance lock that is only reachable through closures, so a guard can
//! never be held across an `.await`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::types::{EpisodeStatus, ShowId};

/// Season/episode pair, ordered by season first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EpisodeKey {
    pub season: u32,
    pub episode: u32,
}

impl EpisodeKey {
    pub fn new(season: u32, episode: u32) -> Self {
        Self { season, episode }
    }
}

impl std::fmt::Display for EpisodeKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "S{:02}E{:02}", self.season, self.episode)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Episode {
    pub season: u32,
    pub episode: u32,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub airdate: Option<NaiveDate>,
    pub status: EpisodeStatus,
    pub location: Option<PathBuf>,
    pub file_size: u64,
    pub subtitles: Vec<String>,
}

impl Episode {
    pub fn new(key: EpisodeKey) -> Self {
        Self {
            season: key.season,
            episode: key.episode,
            title: None,
            overview: None,
            airdate: None,
            status: EpisodeStatus::Unaired,
            location: None,
            file_size: 0,
            subtitles: Vec::new(),
        }
    }

    pub fn key(&self) -> EpisodeKey {
        EpisodeKey::new(self.season, self.episode)
    }

    /// An episode with no airdate, or one in the future, has not aired yet.
    pub fn has_aired(&self, today: NaiveDate) -> bool {
        self.airdate.is_some_and(|d| d <= today)
    }
}

/// User-controlled options applied when a show is added.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShowOptions {
    /// Status given to already-aired episodes when they are first seen.
    pub default_status: EpisodeStatus,
    pub season_folders: bool,
    pub subtitles: bool,
    pub anime: bool,
    pub scene: bool,
    pub paused: bool,
    pub language: String,
}

impl Default for ShowOptions {
    fn default() -> Self {
        Self {
            default_status: EpisodeStatus::Skipped,
            season_folders: true,
            subtitles: false,
            anime: false,
            scene: false,
            paused: false,
            language: "en".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShowData {
    pub name: String,
    pub location: PathBuf,
    pub overview: Option<String>,
    pub network: Option<String>,
    pub genres: Vec<String>,
    /// Airing status reported by the indexer, e.g. "Returning Series" or "Ended".
    pub status: Option<String>,
    pub first_aired: Option<NaiveDate>,
    pub imdb_id: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub options: ShowOptions,
    pub episodes: BTreeMap<EpisodeKey, Episode>,
}

impl ShowData {
    pub fn seasons(&self) -> Vec<u32> {
        let mut seasons: Vec<u32> = self.episodes.keys().map(|k| k.season).collect();
        seasons.dedup();
        seasons
    }

    pub fn episodes_with_status(&self, status: EpisodeStatus) -> Vec<EpisodeKey> {
        self.episodes
            .values()
            .filter(|ep| ep.status == status)
            .map(Episode::key)
            .collect()
    }
}

/// A tracked TV show. Identity is immutable; everything else lives behind the lock.
#[derive(Debug)]
pub struct Show {
    id: ShowId,
    data: RwLock<ShowData>,
}

impl Show {
    pub fn new(id: ShowId, data: ShowData) -> Self {
        Self {
            id,
            data: RwLock::new(data),
        }
    }

    pub fn id(&self) -> ShowId {
        self.id
    }

    /// Read fields under the show's lock.
    pub fn read<R>(&self, f: impl FnOnce(&ShowData) -> R) -> R {
        f(&self.data.read())
    }

    /// Mutate fields under the show's exclusive lock.
    pub fn modify<R>(&self, f: impl FnOnce(&mut ShowData) -> R) -> R {
        f(&mut self.data.write())
    }

    /// Consistent copy of all fields, e.g. for persisting.
    pub fn snapshot(&self) -> ShowData {
        self.data.read().clone()
    }

    pub fn name(&self) -> String {
        self.data.read().name.clone()
    }

    pub fn location(&self) -> PathBuf {
        self.data.read().location.clone()
    }
}

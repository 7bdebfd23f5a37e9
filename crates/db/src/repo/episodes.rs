use std::collections::BTreeMap;
use std::path::PathBuf;

use chrono::NaiveDate;
use showrunner_core::{Episode, EpisodeKey, EpisodeStatus, ShowId};
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;
use crate::repo::series_id;

#[derive(Debug, Clone)]
pub struct EpisodeRow {
    pub season: i64,
    pub episode: i64,
    pub title: Option<String>,
    pub overview: Option<String>,
    pub airdate: Option<String>,
    pub status: String,
    pub location: Option<String>,
    pub file_size: i64,
    pub subtitles: String,
}

type EpisodeTuple = (
    i64,
    i64,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    i64,
    String,
);

impl EpisodeRow {
    pub fn into_episode(self) -> Result<Episode, DbError> {
        let status = EpisodeStatus::parse(&self.status)
            .ok_or_else(|| DbError::Corrupt(format!("unknown episode status {:?}", self.status)))?;
        Ok(Episode {
            season: self.season as u32,
            episode: self.episode as u32,
            title: self.title,
            overview: self.overview,
            airdate: self
                .airdate
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            status,
            location: self.location.map(PathBuf::from),
            file_size: self.file_size.max(0) as u64,
            subtitles: self
                .subtitles
                .split(',')
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect(),
        })
    }
}

/// All stored episodes for a show, ordered by season then episode.
pub async fn list_episodes(pool: &SqlitePool, show: ShowId) -> Result<Vec<EpisodeRow>, DbError> {
    let series = series_id(show)?;
    let rows: Vec<EpisodeTuple> = sqlx::query_as(
        "SELECT season, episode, title, overview, airdate, status, location, file_size, subtitles \
         FROM tv_episode WHERE indexer = ? AND indexer_id = ? \
         ORDER BY season, episode",
    )
    .bind(show.indexer.as_str())
    .bind(series)
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .map(|r| EpisodeRow {
            season: r.0,
            episode: r.1,
            title: r.2,
            overview: r.3,
            airdate: r.4,
            status: r.5,
            location: r.6,
            file_size: r.7,
            subtitles: r.8,
        })
        .collect())
}

/// Make the stored episode set match `episodes` exactly: upsert every entry and
/// delete rows for keys no longer present. The caller owns the transaction.
pub(crate) async fn sync_episodes(
    conn: &mut SqliteConnection,
    show: ShowId,
    episodes: &BTreeMap<EpisodeKey, Episode>,
) -> Result<SyncResult, DbError> {
    let series = series_id(show)?;

    let stored: Vec<(i64, i64)> = sqlx::query_as(
        "SELECT season, episode FROM tv_episode WHERE indexer = ? AND indexer_id = ?",
    )
    .bind(show.indexer.as_str())
    .bind(series)
    .fetch_all(&mut *conn)
    .await?;

    let mut result = SyncResult::default();
    for (season, episode) in stored {
        let key = EpisodeKey::new(season as u32, episode as u32);
        if episodes.contains_key(&key) {
            continue;
        }
        sqlx::query(
            "DELETE FROM tv_episode WHERE indexer = ? AND indexer_id = ? AND season = ? AND episode = ?",
        )
        .bind(show.indexer.as_str())
        .bind(series)
        .bind(season)
        .bind(episode)
        .execute(&mut *conn)
        .await?;
        result.deleted += 1;
    }

    for ep in episodes.values() {
        sqlx::query(
            "INSERT INTO tv_episode (indexer, indexer_id, season, episode, title, overview, airdate, \
             status, location, file_size, subtitles) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             ON CONFLICT(indexer, indexer_id, season, episode) DO UPDATE SET \
             title = excluded.title, overview = excluded.overview, airdate = excluded.airdate, \
             status = excluded.status, location = excluded.location, \
             file_size = excluded.file_size, subtitles = excluded.subtitles",
        )
        .bind(show.indexer.as_str())
        .bind(series)
        .bind(ep.season as i64)
        .bind(ep.episode as i64)
        .bind(ep.title.as_deref())
        .bind(ep.overview.as_deref())
        .bind(ep.airdate.map(|d| d.format("%Y-%m-%d").to_string()))
        .bind(ep.status.as_str())
        .bind(ep.location.as_ref().map(|p| p.to_string_lossy().into_owned()))
        .bind(i64::try_from(ep.file_size).unwrap_or(i64::MAX))
        .bind(ep.subtitles.join(","))
        .execute(&mut *conn)
        .await?;
        result.written += 1;
    }

    Ok(result)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub written: usize,
    pub deleted: usize,
}

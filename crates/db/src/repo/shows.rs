use std::path::PathBuf;

use chrono::NaiveDate;
use showrunner_core::{IndexerKind, ShowData, ShowId, ShowOptions};
use sqlx::{SqliteConnection, SqlitePool};

use crate::DbError;
use crate::repo::episodes::{self, EpisodeRow, SyncResult};
use crate::repo::series_id;

#[derive(Debug, Clone)]
pub struct ShowRow {
    pub indexer: String,
    pub indexer_id: i64,
    pub name: String,
    pub location: String,
    pub overview: Option<String>,
    pub network: Option<String>,
    pub genres_json: String,
    pub status: Option<String>,
    pub first_aired: Option<String>,
    pub imdb_id: Option<String>,
    pub poster_url: Option<String>,
    pub backdrop_url: Option<String>,
    pub options_json: String,
    pub created_ts: i64,
    pub updated_ts: i64,
}

type ShowTuple = (
    String,
    i64,
    String,
    String,
    Option<String>,
    Option<String>,
    String,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    Option<String>,
    String,
    i64,
    i64,
);

const SHOW_COLUMNS: &str = "indexer, indexer_id, name, location, overview, network, genres_json, \
     status, first_aired, imdb_id, poster_url, backdrop_url, options_json, created_ts, updated_ts";

impl ShowRow {
    pub fn show_id(&self) -> Result<ShowId, DbError> {
        let indexer = IndexerKind::parse(&self.indexer)
            .ok_or_else(|| DbError::Corrupt(format!("unknown indexer {:?}", self.indexer)))?;
        let id = u64::try_from(self.indexer_id)
            .map_err(|_| DbError::Corrupt(format!("negative series id {}", self.indexer_id)))?;
        Ok(ShowId::new(indexer, id))
    }

    /// Assemble the in-memory show from this row and its episode rows.
    pub fn into_data(self, episode_rows: Vec<EpisodeRow>) -> Result<ShowData, DbError> {
        let genres: Vec<String> = serde_json::from_str(&self.genres_json)
            .map_err(|e| DbError::Corrupt(format!("genres_json: {e}")))?;
        let options: ShowOptions = serde_json::from_str(&self.options_json)
            .map_err(|e| DbError::Corrupt(format!("options_json: {e}")))?;

        let mut episodes = std::collections::BTreeMap::new();
        for row in episode_rows {
            let ep = row.into_episode()?;
            episodes.insert(ep.key(), ep);
        }

        Ok(ShowData {
            name: self.name,
            location: PathBuf::from(self.location),
            overview: self.overview,
            network: self.network,
            genres,
            status: self.status,
            first_aired: self
                .first_aired
                .as_deref()
                .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok()),
            imdb_id: self.imdb_id,
            poster_url: self.poster_url,
            backdrop_url: self.backdrop_url,
            options,
            episodes,
        })
    }
}

/// Store the show row and make its episode rows match `data.episodes`, all in
/// one transaction.
pub async fn save_show(pool: &SqlitePool, id: ShowId, data: &ShowData) -> Result<SyncResult, DbError> {
    let mut tx = pool.begin().await?;
    upsert_show(&mut *tx, id, data).await?;
    let synced = episodes::sync_episodes(&mut *tx, id, &data.episodes).await?;
    tx.commit().await?;
    Ok(synced)
}

async fn upsert_show(conn: &mut SqliteConnection, id: ShowId, data: &ShowData) -> Result<(), DbError> {
    let series = series_id(id)?;
    let now = chrono::Utc::now().timestamp();
    let genres_json =
        serde_json::to_string(&data.genres).map_err(|e| DbError::Corrupt(e.to_string()))?;
    let options_json =
        serde_json::to_string(&data.options).map_err(|e| DbError::Corrupt(e.to_string()))?;

    sqlx::query(
        "INSERT INTO tv_show (indexer, indexer_id, name, location, overview, network, genres_json, \
         status, first_aired, imdb_id, poster_url, backdrop_url, options_json, created_ts, updated_ts) \
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
         ON CONFLICT(indexer, indexer_id) DO UPDATE SET \
         name = excluded.name, location = excluded.location, overview = excluded.overview, \
         network = excluded.network, genres_json = excluded.genres_json, status = excluded.status, \
         first_aired = excluded.first_aired, imdb_id = excluded.imdb_id, \
         poster_url = excluded.poster_url, backdrop_url = excluded.backdrop_url, \
         options_json = excluded.options_json, updated_ts = excluded.updated_ts",
    )
    .bind(id.indexer.as_str())
    .bind(series)
    .bind(&data.name)
    .bind(data.location.to_string_lossy().into_owned())
    .bind(data.overview.as_deref())
    .bind(data.network.as_deref())
    .bind(genres_json)
    .bind(data.status.as_deref())
    .bind(data.first_aired.map(|d| d.format("%Y-%m-%d").to_string()))
    .bind(data.imdb_id.as_deref())
    .bind(data.poster_url.as_deref())
    .bind(data.backdrop_url.as_deref())
    .bind(options_json)
    .bind(now)
    .bind(now)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

pub async fn get_show(pool: &SqlitePool, id: ShowId) -> Result<Option<ShowRow>, DbError> {
    let series = series_id(id)?;
    let row: Option<ShowTuple> = sqlx::query_as(&format!(
        "SELECT {SHOW_COLUMNS} FROM tv_show WHERE indexer = ? AND indexer_id = ?"
    ))
    .bind(id.indexer.as_str())
    .bind(series)
    .fetch_optional(pool)
    .await?;

    Ok(row.map(row_to_show))
}

pub async fn list_shows(pool: &SqlitePool) -> Result<Vec<ShowRow>, sqlx::Error> {
    let rows: Vec<ShowTuple> =
        sqlx::query_as(&format!("SELECT {SHOW_COLUMNS} FROM tv_show ORDER BY name"))
            .fetch_all(pool)
            .await?;

    Ok(rows.into_iter().map(row_to_show).collect())
}

/// Load every stored show together with its episodes.
pub async fn load_all(pool: &SqlitePool) -> Result<Vec<(ShowId, ShowData)>, DbError> {
    let mut shows = Vec::new();
    for row in list_shows(pool).await? {
        let id = row.show_id()?;
        let episode_rows = episodes::list_episodes(pool, id).await?;
        shows.push((id, row.into_data(episode_rows)?));
    }
    Ok(shows)
}

/// Delete a show and all of its episodes. Returns whether a show row existed.
pub async fn delete_show(pool: &SqlitePool, id: ShowId) -> Result<bool, DbError> {
    let series = series_id(id)?;
    let mut tx = pool.begin().await?;
    sqlx::query("DELETE FROM tv_episode WHERE indexer = ? AND indexer_id = ?")
        .bind(id.indexer.as_str())
        .bind(series)
        .execute(&mut *tx)
        .await?;
    let result = sqlx::query("DELETE FROM tv_show WHERE indexer = ? AND indexer_id = ?")
        .bind(id.indexer.as_str())
        .bind(series)
        .execute(&mut *tx)
        .await?;
    tx.commit().await?;
    Ok(result.rows_affected() > 0)
}

fn row_to_show(r: ShowTuple) -> ShowRow {
    ShowRow {
        indexer: r.0,
        indexer_id: r.1,
        name: r.2,
        location: r.3,
        overview: r.4,
        network: r.5,
        genres_json: r.6,
        status: r.7,
        first_aired: r.8,
        imdb_id: r.9,
        poster_url: r.10,
        backdrop_url: r.11,
        options_json: r.12,
        created_ts: r.13,
        updated_ts: r.14,
    }
}

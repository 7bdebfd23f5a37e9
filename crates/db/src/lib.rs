pub mod migrate;
pub mod repo;

use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("series id of {0} does not fit in a database row")]
    IdOutOfRange(showrunner_core::ShowId),
    #[error("cannot create database folder: {0}")]
    Io(#[from] std::io::Error),
}

pub const IN_MEMORY: &str = ":memory:";

/// Largest series id a row can hold.
pub const MAX_SERIES_ID: u64 = i64::MAX as u64;

/// Open the show store. [`IN_MEMORY`] gives a private database that lives as
/// long as the pool, which the tests use.
pub async fn connect(db_path: &str) -> Result<SqlitePool, DbError> {
    let opts = SqliteConnectOptions::from_str(db_path)?.foreign_keys(true);

    let pool = if db_path == IN_MEMORY {
        // One connection that never expires; the database dies with it
        SqlitePoolOptions::new()
            .max_connections(1)
            .min_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(opts)
            .await?
    } else {
        if let Some(parent) = Path::new(db_path).parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let opts = opts
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5));
        SqlitePoolOptions::new()
            .max_connections(5)
            .connect_with(opts)
            .await?
    };

    Ok(pool)
}

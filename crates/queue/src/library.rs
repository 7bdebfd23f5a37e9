//! In-memory show registry backed by the SQLite store.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use parking_lot::RwLock;
use showrunner_core::{Show, ShowData, ShowId};
use showrunner_db::repo::shows;
use sqlx::SqlitePool;
use tracing::{debug, info, warn};

use crate::LibraryError;

pub struct ShowLibrary {
    pool: SqlitePool,
    shows: RwLock<HashMap<ShowId, Arc<Show>>>,
}

impl ShowLibrary {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            pool,
            shows: RwLock::new(HashMap::new()),
        }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Populate the registry from storage. Returns how many shows were loaded.
    pub async fn load_all(&self) -> Result<usize, LibraryError> {
        let stored = shows::load_all(&self.pool).await?;
        let count = stored.len();
        let mut registry = self.shows.write();
        for (id, data) in stored {
            registry.insert(id, Arc::new(Show::new(id, data)));
        }
        info!(shows = count, "show library loaded");
        Ok(count)
    }

    pub fn find(&self, id: ShowId) -> Option<Arc<Show>> {
        self.shows.read().get(&id).cloned()
    }

    pub fn contains(&self, id: ShowId) -> bool {
        self.shows.read().contains_key(&id)
    }

    /// A fresh, unregistered show. It joins the registry on its first [`save`](Self::save).
    pub fn create(&self, id: ShowId, location: PathBuf) -> Arc<Show> {
        Arc::new(Show::new(
            id,
            ShowData {
                location,
                ..Default::default()
            },
        ))
    }

    /// Persist the show and its episodes, then register it.
    pub async fn save(&self, show: &Arc<Show>) -> Result<(), LibraryError> {
        let id = show.id();
        let data = show.snapshot();
        let synced = shows::save_show(&self.pool, id, &data).await?;
        debug!(
            show = %id,
            written = synced.written,
            deleted = synced.deleted,
            "show saved"
        );

        self.shows
            .write()
            .entry(id)
            .or_insert_with(|| Arc::clone(show));
        Ok(())
    }

    /// Delete the show from storage and the registry, optionally removing its folder.
    /// Returns whether the show had been stored.
    pub async fn delete(&self, show: &Show, purge_files: bool) -> Result<bool, LibraryError> {
        let id = show.id();
        let existed = shows::delete_show(&self.pool, id).await?;
        self.shows.write().remove(&id);

        if purge_files {
            let location = show.location();
            match tokio::fs::remove_dir_all(&location).await {
                Ok(()) => info!(show = %id, path = %location.display(), "show folder deleted"),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    warn!(show = %id, path = %location.display(), "show folder already gone");
                }
                Err(e) => return Err(LibraryError::Io(e)),
            }
        }
        info!(show = %id, existed, "show deleted");
        Ok(existed)
    }

    /// Registered shows, sorted by name.
    pub fn list(&self) -> Vec<Arc<Show>> {
        let mut shows: Vec<Arc<Show>> = self.shows.read().values().cloned().collect();
        shows.sort_by_cached_key(|show| show.name().to_lowercase());
        shows
    }
}

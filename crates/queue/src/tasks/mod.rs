//! Show tasks and the workflows they run.

mod add;
mod change_source;
mod refresh;
mod remove;
mod rename;
mod subtitle;
mod update;

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use showrunner_core::{ActionKind, Episode, EpisodeKey, Show, ShowId, ShowOptions, TaskState};
use showrunner_metadata::{EpisodeInfo, SeriesMetadata};
use tracing::{info, warn};

use crate::engine::{QueueItem, TaskOutcome};
use crate::priority::Priority;
use crate::progress::ProgressEvent;
use crate::show_queue::ShowQueue;
use crate::task::TaskInfo;
use crate::WorkflowError;

/// What the caller asked for when adding a show.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AddRequest {
    pub id: ShowId,
    /// Show folder. Defaults to the library root joined with the show name.
    #[serde(default)]
    pub location: Option<PathBuf>,
    #[serde(default)]
    pub options: ShowOptions,
    /// Scan the folder for existing episode files once the show is loaded.
    #[serde(default = "default_scan_disk")]
    pub scan_disk: bool,
}

fn default_scan_disk() -> bool {
    true
}

impl AddRequest {
    pub fn new(id: ShowId) -> Self {
        Self {
            id,
            location: None,
            options: ShowOptions::default(),
            scan_disk: true,
        }
    }
}

#[derive(Debug, Clone)]
pub enum ShowOperation {
    Add(AddRequest),
    Update,
    SeasonUpdate { seasons: Vec<u32> },
    Refresh { force: bool },
    Rename,
    Subtitle,
    Remove { purge_files: bool },
    ChangeSource { new_id: ShowId },
}

impl ShowOperation {
    pub fn kind(&self) -> ActionKind {
        match self {
            Self::Add(_) => ActionKind::Add,
            Self::Update => ActionKind::Update,
            Self::SeasonUpdate { .. } => ActionKind::SeasonUpdate,
            Self::Refresh { .. } => ActionKind::Refresh,
            Self::Rename => ActionKind::Rename,
            Self::Subtitle => ActionKind::Subtitle,
            Self::Remove { .. } => ActionKind::Remove,
            Self::ChangeSource { .. } => ActionKind::ChangeSource,
        }
    }

    /// Removal outranks everything so it wins races against newly queued work.
    pub fn priority(&self) -> Priority {
        match self.kind() {
            ActionKind::Remove => Priority::HIGH + Priority::HIGH,
            ActionKind::Add
            | ActionKind::Update
            | ActionKind::SeasonUpdate
            | ActionKind::ChangeSource => Priority::HIGH,
            ActionKind::Refresh | ActionKind::Rename | ActionKind::Subtitle => Priority::NORMAL,
        }
    }
}

pub struct ShowTask {
    info: TaskInfo<ActionKind, ShowId>,
    show: RwLock<Option<Arc<Show>>>,
    operation: ShowOperation,
}

impl ShowTask {
    pub(crate) fn new(target: ShowId, show: Option<Arc<Show>>, operation: ShowOperation) -> Self {
        Self {
            info: TaskInfo::new(
                operation.kind(),
                target,
                operation.priority(),
                show.is_none(),
            ),
            show: RwLock::new(show),
            operation,
        }
    }

    pub fn operation(&self) -> &ShowOperation {
        &self.operation
    }

    /// The show being worked on. `None` while an add has not loaded it yet.
    pub fn show(&self) -> Option<Arc<Show>> {
        self.show.read().clone()
    }

    pub(crate) fn set_show(&self, show: Arc<Show>) {
        *self.show.write() = Some(show);
        self.info.set_loading(false);
    }

    /// The registered show this task targets, or `TargetDeleted` if it is gone.
    pub(crate) fn require_show(&self, queue: &ShowQueue) -> Result<Arc<Show>, WorkflowError> {
        let id = self.info.target();
        queue
            .library()
            .find(id)
            .ok_or(WorkflowError::TargetDeleted(id))
    }

    pub(crate) fn step(&self, queue: &ShowQueue, message: impl Into<String>) {
        let message = message.into();
        info!(
            task_id = %self.info.id(),
            show = %self.info.target(),
            kind = %self.info.kind(),
            "{message}"
        );
        self.record(queue, message);
    }

    /// A step that failed without stopping the workflow.
    pub(crate) fn warn_step(&self, queue: &ShowQueue, what: &str, err: impl fmt::Display) {
        warn!(
            task_id = %self.info.id(),
            show = %self.info.target(),
            kind = %self.info.kind(),
            error = %err,
            "{what} failed"
        );
        self.record(queue, format!("{what} failed: {err}"));
    }

    fn record(&self, queue: &ShowQueue, message: String) {
        self.info.log_step(message.clone());
        queue.services().progress.publish(self.event(self.info.state(), message));
    }

    fn event(&self, state: TaskState, message: String) -> ProgressEvent {
        ProgressEvent {
            task_id: self.info.id(),
            show: self.info.target(),
            kind: self.info.kind(),
            state,
            message,
            at: Utc::now(),
        }
    }
}

#[async_trait::async_trait]
impl QueueItem for ShowTask {
    type Kind = ActionKind;
    type Target = ShowId;
    type Context = ShowQueue;

    fn info(&self) -> &TaskInfo<ActionKind, ShowId> {
        &self.info
    }

    async fn run(&self, queue: &ShowQueue) -> TaskOutcome {
        let result = match &self.operation {
            ShowOperation::Add(request) => add::run(self, queue, request).await,
            ShowOperation::Update => update::run(self, queue, None).await,
            ShowOperation::SeasonUpdate { seasons } => update::run(self, queue, Some(seasons.as_slice())).await,
            ShowOperation::Refresh { .. } => refresh::run(self, queue).await,
            ShowOperation::Rename => rename::run(self, queue).await,
            ShowOperation::Subtitle => subtitle::run(self, queue).await,
            ShowOperation::Remove { purge_files } => remove::run(self, queue, *purge_files).await,
            ShowOperation::ChangeSource { new_id } => {
                change_source::run(self, queue, *new_id).await
            }
        };

        match result {
            Ok(()) => TaskOutcome::Completed,
            Err(WorkflowError::TargetDeleted(id)) => {
                let reason = format!("show {id} was deleted before the {} could run", self.info.kind().label());
                self.step(queue, reason.clone());
                TaskOutcome::Abandoned(reason)
            }
            Err(e) => {
                self.record(queue, format!("{} failed: {e}", self.info.kind().label()));
                TaskOutcome::Failed(e.to_string())
            }
        }
    }

    fn on_state_change(&self, queue: &ShowQueue, state: TaskState) {
        let message = match state {
            TaskState::Running => format!("{} started", self.info.kind().label()),
            TaskState::Succeeded => format!("{} finished", self.info.kind().label()),
            _ => self
                .info
                .error()
                .unwrap_or_else(|| format!("{} {state}", self.info.kind().label())),
        };
        queue.services().progress.publish(self.event(state, message));
    }
}

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Copy indexer series fields onto the show.
fn apply_series(show: &Show, series: &SeriesMetadata) {
    show.modify(|d| {
        d.name = series.name.clone();
        d.overview = series.overview.clone();
        d.network = series.network.clone();
        d.genres = series.genres.clone();
        d.status = series.status.clone();
        d.first_aired = series.first_aired;
        d.poster_url = series.poster_url.clone();
        d.backdrop_url = series.backdrop_url.clone();
        if series.imdb_id.is_some() {
            d.imdb_id = series.imdb_id.clone();
        }
    });
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct EpisodeChanges {
    added: usize,
    updated: usize,
    removed: usize,
}

/// Reconcile local episodes with the indexer's list. With `seasons` set, only
/// those seasons are touched. Local episodes the indexer no longer lists are dropped.
fn merge_episodes(
    show: &Show,
    infos: &[EpisodeInfo],
    seasons: Option<&[u32]>,
    today: NaiveDate,
) -> EpisodeChanges {
    let in_scope = |season: u32| seasons.is_none_or(|s| s.contains(&season));

    show.modify(|data| {
        let default_status = data.options.default_status;
        let mut changes = EpisodeChanges::default();
        let mut listed = BTreeSet::new();

        for info in infos.iter().filter(|i| in_scope(i.season_number)) {
            let key = EpisodeKey::new(info.season_number, info.episode_number);
            listed.insert(key);
            match data.episodes.get_mut(&key) {
                Some(ep) => {
                    let before = ep.clone();
                    ep.title = info.title.clone();
                    ep.overview = info.overview.clone();
                    ep.airdate = info.air_date;
                    if ep.status == showrunner_core::EpisodeStatus::Unaired && ep.has_aired(today) {
                        ep.status = default_status;
                    }
                    if *ep != before {
                        changes.updated += 1;
                    }
                }
                None => {
                    let mut ep = Episode::new(key);
                    ep.title = info.title.clone();
                    ep.overview = info.overview.clone();
                    ep.airdate = info.air_date;
                    if ep.has_aired(today) {
                        ep.status = default_status;
                    }
                    data.episodes.insert(key, ep);
                    changes.added += 1;
                }
            }
        }

        let before = data.episodes.len();
        data.episodes
            .retain(|key, _| !in_scope(key.season) || listed.contains(key));
        changes.removed = before - data.episodes.len();
        changes
    })
}

/// Load cross-reference ids. Failures are logged and skipped.
async fn load_cross_reference(
    task: &ShowTask,
    queue: &ShowQueue,
    show: &Show,
    series: &SeriesMetadata,
) {
    let Some(xref) = &queue.services().cross_reference else {
        return;
    };
    task.step(queue, format!("Loading cross-reference info from {}", xref.name()));
    match xref.lookup(show.id(), series).await {
        Ok(found) => {
            if let Some(imdb) = found.imdb_id {
                show.modify(|d| d.imdb_id = Some(imdb));
            }
        }
        Err(e) => task.warn_step(queue, "Cross-reference lookup", e),
    }
}

async fn refresh_artwork(task: &ShowTask, queue: &ShowQueue, show: &Show) {
    let Some(artwork) = &queue.services().artwork else {
        return;
    };
    match artwork.refresh(show).await {
        Ok(0) => {}
        Ok(n) => task.step(queue, format!("Cached {n} artwork images")),
        Err(e) => task.warn_step(queue, "Artwork download", e),
    }
}

async fn write_nfo(task: &ShowTask, queue: &ShowQueue, show: &Show) {
    if !queue.services().config.write_nfo {
        return;
    }
    match crate::artwork::write_show_nfo(show).await {
        Ok(path) => task.step(queue, format!("Wrote {}", path.display())),
        Err(e) => task.warn_step(queue, "Writing tvshow.nfo", e),
    }
}

async fn rebuild_scene_numbering(task: &ShowTask, queue: &ShowQueue, show: &Show) {
    let Some(scene) = &queue.services().scene_numbering else {
        return;
    };
    let (enabled, keys) = show.read(|d| (d.options.scene, d.episodes.keys().copied().collect::<Vec<_>>()));
    if !enabled {
        return;
    }
    task.step(queue, "Rebuilding scene numbering");
    match scene.rebuild(show.id(), &keys).await {
        Ok(mapped) => task.step(queue, format!("Scene numbering covers {mapped} episodes")),
        Err(e) => task.warn_step(queue, "Scene numbering", e),
    }
}

//! The show-operation queue: admission rules on top of [`GenericQueue`].

use std::sync::Arc;

use serde::Serialize;
use showrunner_core::{ActionKind, Show, ShowId, TaskState};
use showrunner_metadata::provider::{CrossReference, Indexers};
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::artwork::ArtworkCache;
use crate::config::LibraryConfig;
use crate::engine::{GenericQueue, QueueItem};
use crate::integrations::{BacklogSearch, SceneNumbering, SubtitleSource, WatchList};
use crate::library::ShowLibrary;
use crate::progress::ProgressChannel;
use crate::task::TaskSnapshot;
use crate::tasks::{AddRequest, ShowOperation, ShowTask};
use crate::QueueError;

const UPDATES: &[ActionKind] = &[ActionKind::Update, ActionKind::SeasonUpdate];

/// Everything a show workflow can reach.
pub struct ShowServices {
    pub library: Arc<ShowLibrary>,
    pub indexers: Indexers,
    pub cross_reference: Option<Arc<dyn CrossReference>>,
    pub watch_list: Option<Arc<dyn WatchList>>,
    pub scene_numbering: Option<Arc<dyn SceneNumbering>>,
    pub subtitles: Option<Arc<dyn SubtitleSource>>,
    pub backlog: Option<Arc<dyn BacklogSearch>>,
    pub artwork: Option<Arc<ArtworkCache>>,
    pub progress: ProgressChannel,
    pub config: LibraryConfig,
}

impl ShowServices {
    pub fn new(library: Arc<ShowLibrary>, indexers: Indexers) -> Self {
        Self {
            library,
            indexers,
            cross_reference: None,
            watch_list: None,
            scene_numbering: None,
            subtitles: None,
            backlog: None,
            artwork: None,
            progress: ProgressChannel::default(),
            config: LibraryConfig::default(),
        }
    }

    pub fn with_config(mut self, config: LibraryConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_cross_reference(mut self, xref: Arc<dyn CrossReference>) -> Self {
        self.cross_reference = Some(xref);
        self
    }

    pub fn with_watch_list(mut self, watch_list: Arc<dyn WatchList>) -> Self {
        self.watch_list = Some(watch_list);
        self
    }

    pub fn with_scene_numbering(mut self, scene: Arc<dyn SceneNumbering>) -> Self {
        self.scene_numbering = Some(scene);
        self
    }

    pub fn with_subtitles(mut self, source: Arc<dyn SubtitleSource>) -> Self {
        self.subtitles = Some(source);
        self
    }

    pub fn with_backlog(mut self, backlog: Arc<dyn BacklogSearch>) -> Self {
        self.backlog = Some(backlog);
        self
    }

    pub fn with_artwork(mut self, artwork: Arc<ArtworkCache>) -> Self {
        self.artwork = Some(artwork);
        self
    }

    pub fn with_progress(mut self, progress: ProgressChannel) -> Self {
        self.progress = progress;
        self
    }
}

/// What the queue is doing with a show, for the status chip next to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct ShowStatus {
    pub kind: Option<ActionKind>,
    pub message: Option<&'static str>,
}

pub type ShowTaskSnapshot = TaskSnapshot<ActionKind, ShowId>;

#[derive(Debug, Clone, Serialize)]
pub struct QueueSnapshot {
    pub paused: bool,
    pub current: Option<ShowTaskSnapshot>,
    pub pending: Vec<ShowTaskSnapshot>,
}

struct Inner {
    queue: Arc<GenericQueue<ShowTask>>,
    services: ShowServices,
}

#[derive(Clone)]
pub struct ShowQueue {
    inner: Arc<Inner>,
}

impl ShowQueue {
    pub fn new(services: ShowServices) -> Self {
        Self {
            inner: Arc::new(Inner {
                queue: Arc::new(GenericQueue::new("show")),
                services,
            }),
        }
    }

    /// Spawn the worker. Call once.
    pub fn start(&self) -> JoinHandle<()> {
        self.inner.queue.spawn_worker(Arc::new(self.clone()))
    }

    pub fn services(&self) -> &ShowServices {
        &self.inner.services
    }

    pub fn library(&self) -> &ShowLibrary {
        &self.inner.services.library
    }

    pub fn queue(&self) -> &GenericQueue<ShowTask> {
        &self.inner.queue
    }

    fn find(&self, id: ShowId) -> Result<Arc<Show>, QueueError> {
        self.library().find(id).ok_or(QueueError::NotFound(id))
    }

    pub fn add_show(&self, request: AddRequest) -> Result<Arc<ShowTask>, QueueError> {
        let id = request.id;
        storable(id)?;
        if self.library().contains(id) {
            return Err(QueueError::InvalidTarget(format!(
                "show {id} is already in the library"
            )));
        }
        let task = ShowTask::new(id, None, ShowOperation::Add(request));
        Ok(self.queue().enqueue(Arc::new(task)))
    }

    pub fn update_show(&self, id: ShowId) -> Result<Arc<ShowTask>, QueueError> {
        self.enqueue_update(id, ShowOperation::Update)
    }

    pub fn update_seasons(&self, id: ShowId, seasons: Vec<u32>) -> Result<Arc<ShowTask>, QueueError> {
        if seasons.is_empty() {
            return Err(QueueError::InvalidTarget("no seasons given".into()));
        }
        self.enqueue_update(id, ShowOperation::SeasonUpdate { seasons })
    }

    fn enqueue_update(&self, id: ShowId, op: ShowOperation) -> Result<Arc<ShowTask>, QueueError> {
        let show = self.find(id)?;
        let mut queue = self.queue().lock();
        if queue.is_queued_or_running(id, &[ActionKind::Add]) {
            return Err(QueueError::Conflict(format!(
                "{} is still being added, wait until it is finished before updating",
                show.name()
            )));
        }
        if queue.is_queued_or_running(id, UPDATES) {
            return Err(QueueError::Conflict(format!(
                "{} is already queued for an update",
                show.name()
            )));
        }
        Ok(queue.enqueue(Arc::new(ShowTask::new(id, Some(show), op))))
    }

    /// Queue a rescan of the show folder. Returns `None` when the refresh is
    /// skipped because one is running or an update, which ends with a refresh,
    /// is pending or running. `force` bypasses both checks.
    pub fn refresh_show(&self, id: ShowId, force: bool) -> Result<Option<Arc<ShowTask>>, QueueError> {
        let show = self.find(id)?;
        let mut queue = self.queue().lock();
        if !force {
            if queue.is_running(id, &[ActionKind::Refresh]) {
                debug!(show = %id, "refresh skipped, already being refreshed");
                return Ok(None);
            }
            if queue.is_queued_or_running(id, UPDATES) {
                debug!(show = %id, "refresh skipped, an update will refresh it");
                return Ok(None);
            }
        }
        let task = ShowTask::new(id, Some(show), ShowOperation::Refresh { force });
        Ok(Some(queue.enqueue(Arc::new(task))))
    }

    pub fn rename_episodes(&self, id: ShowId) -> Result<Arc<ShowTask>, QueueError> {
        let show = self.find(id)?;
        let task = ShowTask::new(id, Some(show), ShowOperation::Rename);
        Ok(self.queue().enqueue(Arc::new(task)))
    }

    pub fn download_subtitles(&self, id: ShowId) -> Result<Arc<ShowTask>, QueueError> {
        let show = self.find(id)?;
        let task = ShowTask::new(id, Some(show), ShowOperation::Subtitle);
        Ok(self.queue().enqueue(Arc::new(task)))
    }

    pub fn remove_show(&self, id: ShowId, purge_files: bool) -> Result<Arc<ShowTask>, QueueError> {
        let show = self.find(id)?;
        self.enqueue_remove(show, purge_files)
    }

    /// Cancel every pending task for the show, then queue its removal ahead of everything else.
    /// Also used to clean up after a failed add, when the show may not be registered.
    pub(crate) fn enqueue_remove(
        &self,
        show: Arc<Show>,
        purge_files: bool,
    ) -> Result<Arc<ShowTask>, QueueError> {
        let id = show.id();
        let mut queue = self.queue().lock();
        if queue.is_queued_or_running(id, &[ActionKind::Remove]) {
            return Err(QueueError::Conflict(format!(
                "{} is already queued to be removed",
                show.name()
            )));
        }
        let cancelled = queue.cancel(|task| task.info().target() == id);
        for task in &cancelled {
            task.on_state_change(self, TaskState::Cancelled);
        }
        if !cancelled.is_empty() {
            info!(show = %id, cancelled = cancelled.len(), "pending tasks cancelled for removal");
        }
        let task = ShowTask::new(id, Some(show), ShowOperation::Remove { purge_files });
        Ok(queue.enqueue(Arc::new(task)))
    }

    pub fn change_source(&self, id: ShowId, new_id: ShowId) -> Result<Arc<ShowTask>, QueueError> {
        let show = self.find(id)?;
        if new_id == id {
            return Err(QueueError::InvalidTarget(format!(
                "{} already uses {id}",
                show.name()
            )));
        }
        storable(new_id)?;
        if self.library().contains(new_id) {
            return Err(QueueError::InvalidTarget(format!(
                "show {new_id} is already in the library"
            )));
        }
        let task = ShowTask::new(id, Some(show), ShowOperation::ChangeSource { new_id });
        Ok(self.queue().enqueue(Arc::new(task)))
    }

    pub fn is_queued(&self, id: ShowId, kinds: &[ActionKind]) -> bool {
        self.queue().is_queued(id, kinds)
    }

    pub fn is_running(&self, id: ShowId, kinds: &[ActionKind]) -> bool {
        self.queue().is_running(id, kinds)
    }

    pub fn is_being_added(&self, id: ShowId) -> bool {
        self.is_running(id, &[ActionKind::Add])
    }

    pub fn is_being_updated(&self, id: ShowId) -> bool {
        self.is_running(id, UPDATES)
    }

    pub fn is_being_refreshed(&self, id: ShowId) -> bool {
        self.is_running(id, &[ActionKind::Refresh])
    }

    pub fn is_being_renamed(&self, id: ShowId) -> bool {
        self.is_running(id, &[ActionKind::Rename])
    }

    pub fn is_being_subtitled(&self, id: ShowId) -> bool {
        self.is_running(id, &[ActionKind::Subtitle])
    }

    pub fn is_being_removed(&self, id: ShowId) -> bool {
        self.is_running(id, &[ActionKind::Remove])
    }

    pub fn is_queued_for_update(&self, id: ShowId) -> bool {
        self.is_queued(id, UPDATES)
    }

    pub fn is_queued_for_refresh(&self, id: ShowId) -> bool {
        self.is_queued(id, &[ActionKind::Refresh])
    }

    pub fn is_queued_for_rename(&self, id: ShowId) -> bool {
        self.is_queued(id, &[ActionKind::Rename])
    }

    pub fn is_queued_for_subtitle(&self, id: ShowId) -> bool {
        self.is_queued(id, &[ActionKind::Subtitle])
    }

    pub fn is_queued_for_remove(&self, id: ShowId) -> bool {
        self.is_queued(id, &[ActionKind::Remove])
    }

    /// The running task for the show wins over its first pending one.
    pub fn status_of(&self, id: ShowId) -> ShowStatus {
        let queue = self.queue().lock();
        if let Some(current) = queue.current().filter(|t| t.info().target() == id) {
            let kind = current.info().kind();
            return ShowStatus {
                kind: Some(kind),
                message: Some(running_message(kind)),
            };
        }
        match queue.pending().find(|t| t.info().target() == id) {
            Some(pending) => {
                let kind = pending.info().kind();
                ShowStatus {
                    kind: Some(kind),
                    message: Some(queued_message(kind)),
                }
            }
            None => ShowStatus::default(),
        }
    }

    pub fn snapshot(&self) -> QueueSnapshot {
        let (current, pending) = self.queue().snapshot();
        QueueSnapshot {
            paused: self.queue().is_paused(),
            current: current.map(|t| t.info().snapshot()),
            pending: pending.iter().map(|t| t.info().snapshot()).collect(),
        }
    }

    pub fn pause(&self) {
        self.queue().pause();
    }

    pub fn resume(&self) {
        self.queue().resume();
    }

    pub fn is_paused(&self) -> bool {
        self.queue().is_paused()
    }

    pub fn shutdown(&self) {
        self.queue().shutdown();
    }
}

fn running_message(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Add => "This show is being added, the information below is incomplete",
        ActionKind::Update => "The information on this page is being updated",
        ActionKind::SeasonUpdate => "Some seasons of this show are being updated",
        ActionKind::Refresh => "The episodes below are being refreshed from disk",
        ActionKind::Rename => "Episode files are being renamed",
        ActionKind::Subtitle => "Subtitles are being downloaded",
        ActionKind::Remove => "This show is being removed",
        ActionKind::ChangeSource => "This show is switching to a different indexer",
    }
}

fn queued_message(kind: ActionKind) -> &'static str {
    match kind {
        ActionKind::Add => "This show is queued to be added",
        ActionKind::Update | ActionKind::SeasonUpdate => {
            "This show is queued to be updated"
        }
        ActionKind::Refresh => "This show is queued to be refreshed",
        ActionKind::Rename => "This show is queued for episode renaming",
        ActionKind::Subtitle => "This show is queued for a subtitle download",
        ActionKind::Remove => "This show is queued to be removed",
        ActionKind::ChangeSource => "This show is queued to switch indexer",
    }
}

fn storable(id: ShowId) -> Result<(), QueueError> {
    if id.id > showrunner_db::MAX_SERIES_ID {
        return Err(QueueError::InvalidTarget(format!(
            "series id {} is too large",
            id.id
        )));
    }
    Ok(())
}

use std::path::{Path, PathBuf};
use std::sync::Arc;

use showrunner_core::{EpisodeStatus, Show};
use showrunner_scanner::parser::sanitize_file_name;
use tracing::warn;

use super::{
    AddRequest, ShowTask, apply_series, load_cross_reference, merge_episodes, rebuild_scene_numbering,
    refresh, refresh_artwork, today, write_nfo,
};
use crate::config::LibraryConfig;
use crate::engine::QueueItem;
use crate::show_queue::ShowQueue;
use crate::WorkflowError;

pub(super) async fn run(
    task: &ShowTask,
    queue: &ShowQueue,
    request: &AddRequest,
) -> Result<(), WorkflowError> {
    add_show(task, queue, request).await.map(|_| ())
}

/// Create, load and persist a new show. A failure once the show object exists
/// queues its removal before returning the error.
pub(super) async fn add_show(
    task: &ShowTask,
    queue: &ShowQueue,
    request: &AddRequest,
) -> Result<Arc<Show>, WorkflowError> {
    let library = &queue.services().library;
    let id = request.id;

    task.step(queue, format!("Adding show {id}"));
    if library.contains(id) {
        return Err(WorkflowError::step(
            "resolve show",
            format!("show {id} is already in the library"),
        ));
    }
    let show = library.create(id, request.location.clone().unwrap_or_default());

    if let Err(e) = load_show(task, queue, request, &show).await {
        compensate(task, queue, &show);
        return Err(e);
    }

    write_nfo(task, queue, &show).await;
    refresh_artwork(task, queue, &show).await;
    rebuild_scene_numbering(task, queue, &show).await;

    if request.scan_disk {
        refresh::scan_and_save(task, queue, &show).await;
    }

    if request.options.default_status == EpisodeStatus::Wanted {
        search_backlog(task, queue, &show).await;
    }

    task.step(queue, format!("Finished adding {}", show.name()));
    Ok(show)
}

/// The fatal part of adding: metadata, options, persistence and the episode list.
async fn load_show(
    task: &ShowTask,
    queue: &ShowQueue,
    request: &AddRequest,
    show: &Arc<Show>,
) -> Result<(), WorkflowError> {
    let services = queue.services();
    let id = show.id();
    let language = request.options.language.as_str();

    let indexer = services
        .indexers
        .get(id.indexer)
        .map_err(|e| WorkflowError::step("load show info", e))?;

    task.step(queue, format!("Loading show info from {}", indexer.name()));
    let series = indexer
        .get_series(id.id, language)
        .await
        .map_err(|e| WorkflowError::step("load show info", e))?;
    apply_series(show, &series);
    task.set_show(Arc::clone(show));
    task.step(queue, format!("Loaded {}", series.name));

    load_cross_reference(task, queue, show, &series).await;

    task.step(queue, "Applying show options");
    let location = resolve_location(&services.config, request, &series.name)?;
    ensure_folder(&services.config, &location).await?;
    show.modify(|d| {
        d.location = location;
        d.options = request.options.clone();
    });

    task.step(queue, "Saving show");
    services
        .library
        .save(show)
        .await
        .map_err(|e| WorkflowError::step("save show", e))?;

    task.step(queue, format!("Loading episode list from {}", indexer.name()));
    let episodes = indexer
        .get_episodes(id.id, language)
        .await
        .map_err(|e| WorkflowError::step("load episodes", e))?;
    let changes = merge_episodes(show, &episodes, None, today());
    services
        .library
        .save(show)
        .await
        .map_err(|e| WorkflowError::step("save episodes", e))?;
    task.step(queue, format!("Loaded {} episodes", changes.added));
    Ok(())
}

fn resolve_location(
    config: &LibraryConfig,
    request: &AddRequest,
    name: &str,
) -> Result<PathBuf, WorkflowError> {
    if let Some(location) = request.location.as_ref().filter(|p| !p.as_os_str().is_empty()) {
        return Ok(location.clone());
    }
    match &config.root_dir {
        Some(root) => Ok(root.join(sanitize_file_name(name))),
        None => Err(WorkflowError::step(
            "apply options",
            "no show folder given and no library root configured",
        )),
    }
}

async fn ensure_folder(config: &LibraryConfig, location: &Path) -> Result<(), WorkflowError> {
    match tokio::fs::metadata(location).await {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(WorkflowError::step(
            "apply options",
            format!("{} is not a folder", location.display()),
        )),
        Err(_) if config.create_show_dirs => tokio::fs::create_dir_all(location)
            .await
            .map_err(|e| WorkflowError::step("create show folder", e)),
        Err(_) => Err(WorkflowError::step(
            "apply options",
            format!("show folder {} does not exist", location.display()),
        )),
    }
}

/// Undo a partial add by queueing removal of whatever was created. Files stay on disk.
fn compensate(task: &ShowTask, queue: &ShowQueue, show: &Arc<Show>) {
    match queue.enqueue_remove(Arc::clone(show), false) {
        Ok(remove) => task.step(
            queue,
            format!("Queued removal of the partially added show (task {})", remove.info().id()),
        ),
        Err(e) => warn!(show = %show.id(), error = %e, "could not queue cleanup of failed add"),
    }
}

async fn search_backlog(task: &ShowTask, queue: &ShowQueue, show: &Show) {
    let Some(backlog) = &queue.services().backlog else {
        return;
    };
    let wanted = show.read(|d| d.episodes_with_status(EpisodeStatus::Wanted));
    if wanted.is_empty() {
        return;
    }
    task.step(queue, format!("Searching for {} wanted episodes", wanted.len()));
    match backlog.search(show.id(), &wanted).await {
        Ok(queued) => task.step(queue, format!("Queued {queued} episode searches")),
        Err(e) => task.warn_step(queue, "Backlog search", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use showrunner_core::{IndexerKind, ShowId};

    #[test]
    fn location_falls_back_to_library_root() {
        let request = AddRequest::new(ShowId::new(IndexerKind::Tmdb, 1));
        let config = LibraryConfig {
            root_dir: Some("/tv".into()),
            ..Default::default()
        };
        assert_eq!(
            resolve_location(&config, &request, "Marvel's Agents: S.H.I.E.L.D.").unwrap(),
            PathBuf::from("/tv/Marvel's Agents S.H.I.E.L.D")
        );

        let explicit = AddRequest {
            location: Some("/media/shows/Agents".into()),
            ..request.clone()
        };
        assert_eq!(
            resolve_location(&config, &explicit, "ignored").unwrap(),
            PathBuf::from("/media/shows/Agents")
        );

        let no_root = LibraryConfig::default();
        assert!(resolve_location(&no_root, &request, "Anything").is_err());
    }
}

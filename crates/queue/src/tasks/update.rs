use super::{
    ShowTask, apply_series, load_cross_reference, merge_episodes, refresh_artwork, today,
};
use crate::show_queue::ShowQueue;
use crate::WorkflowError;

/// Reload show info and episodes from the indexer, then queue a forced refresh.
/// With `seasons` set only those seasons' episodes are reconciled.
pub(super) async fn run(
    task: &ShowTask,
    queue: &ShowQueue,
    seasons: Option<&[u32]>,
) -> Result<(), WorkflowError> {
    let show = task.require_show(queue)?;
    let services = queue.services();
    let id = show.id();
    let language = show.read(|d| d.options.language.clone());

    let indexer = services
        .indexers
        .get(id.indexer)
        .map_err(|e| WorkflowError::step("load show info", e))?;

    task.step(queue, format!("Updating show info from {}", indexer.name()));
    let series = indexer
        .get_series(id.id, &language)
        .await
        .map_err(|e| WorkflowError::step("load show info", e))?;
    apply_series(&show, &series);

    load_cross_reference(task, queue, &show, &series).await;

    task.step(queue, "Saving show");
    services
        .library
        .save(&show)
        .await
        .map_err(|e| WorkflowError::step("save show", e))?;

    match seasons {
        Some(seasons) => task.step(queue, format!("Loading episodes for seasons {seasons:?}")),
        None => task.step(queue, "Loading episode list"),
    }
    let episodes = indexer
        .get_episodes(id.id, &language)
        .await
        .map_err(|e| WorkflowError::step("load episodes", e))?;
    // An empty list would wipe every local episode
    if episodes.is_empty() {
        return Err(WorkflowError::step(
            "load episodes",
            format!("{} returned no episodes", indexer.name()),
        ));
    }

    let changes = merge_episodes(&show, &episodes, seasons, today());
    task.step(
        queue,
        format!(
            "{} new, {} changed and {} removed episodes",
            changes.added, changes.updated, changes.removed
        ),
    );
    services
        .library
        .save(&show)
        .await
        .map_err(|e| WorkflowError::step("save episodes", e))?;

    refresh_artwork(task, queue, &show).await;

    match queue.refresh_show(id, true) {
        Ok(Some(_)) => task.step(queue, "Queued a refresh from disk"),
        Ok(None) => {}
        Err(e) => task.warn_step(queue, "Queueing refresh", e),
    }
    Ok(())
}

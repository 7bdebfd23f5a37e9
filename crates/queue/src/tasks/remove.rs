use super::ShowTask;
use crate::engine::QueueItem;
use crate::show_queue::ShowQueue;
use crate::WorkflowError;

pub(super) async fn run(
    task: &ShowTask,
    queue: &ShowQueue,
    purge_files: bool,
) -> Result<(), WorkflowError> {
    let services = queue.services();
    let show = task
        .show()
        .ok_or(WorkflowError::TargetDeleted(task.info().target()))?;
    let id = show.id();
    let name = show.name();

    task.step(queue, format!("Removing {name}"));

    if let Some(watch_list) = &services.watch_list {
        match watch_list.remove_show(id, &name).await {
            Ok(()) => task.step(queue, format!("Removed from the {} watch list", watch_list.name())),
            Err(e) => task.warn_step(queue, "Watch list cleanup", e),
        }
    }

    let existed = services
        .library
        .delete(&show, purge_files)
        .await
        .map_err(|e| WorkflowError::step("delete show", e))?;
    if purge_files {
        task.step(queue, format!("Deleted {}", show.location().display()));
    }

    if let Some(artwork) = &services.artwork {
        if let Err(e) = artwork.purge(id).await {
            task.warn_step(queue, "Artwork cleanup", e);
        }
    }

    if existed {
        task.step(queue, format!("{name} removed from the library"));
    } else {
        task.step(queue, format!("{name} was never stored, nothing left to remove"));
    }
    Ok(())
}

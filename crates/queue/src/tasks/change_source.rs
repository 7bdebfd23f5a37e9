use showrunner_core::ShowId;
use showrunner_db::repo::shows;

use super::{AddRequest, ShowTask, add};
use crate::show_queue::ShowQueue;
use crate::WorkflowError;

/// Remove the show under its old id and add it again under `new_id`, keeping
/// its folder and options.
pub(super) async fn run(
    task: &ShowTask,
    queue: &ShowQueue,
    new_id: ShowId,
) -> Result<(), WorkflowError> {
    let old = task.require_show(queue)?;
    let services = queue.services();
    let old_id = old.id();

    if services.library.contains(new_id) {
        return Err(WorkflowError::step(
            "change source",
            format!("show {new_id} is already in the library"),
        ));
    }

    let (name, location, options) = old.read(|d| (d.name.clone(), d.location.clone(), d.options.clone()));
    task.step(queue, format!("Switching {name} from {old_id} to {new_id}"));

    services
        .library
        .delete(&old, false)
        .await
        .map_err(|e| WorkflowError::step("remove old show", e))?;

    let still_stored = shows::get_show(services.library.pool(), old_id)
        .await
        .map_err(|e| WorkflowError::step("verify removal", e))?
        .is_some();
    if still_stored || services.library.contains(old_id) {
        return Err(WorkflowError::step(
            "verify removal",
            format!("show {old_id} is still in the library"),
        ));
    }
    if let Some(artwork) = &services.artwork {
        if let Err(e) = artwork.purge(old_id).await {
            task.warn_step(queue, "Artwork cleanup", e);
        }
    }
    task.step(queue, format!("Removed {old_id}"));

    let request = AddRequest {
        id: new_id,
        location: Some(location),
        options,
        scan_disk: true,
    };
    add::add_show(task, queue, &request).await?;
    Ok(())
}

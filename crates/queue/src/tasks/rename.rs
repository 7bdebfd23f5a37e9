use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use showrunner_core::{EpisodeKey, ShowData};
use showrunner_scanner::ScanError;
use showrunner_scanner::rename::{self, NamingPattern, RenameOutcome};

use super::ShowTask;
use crate::show_queue::ShowQueue;
use crate::WorkflowError;

/// One media file and every episode it holds, lowest episode first.
#[derive(Debug, Clone, PartialEq)]
struct RenamePlan {
    episodes: Vec<EpisodeKey>,
    current: PathBuf,
    target: PathBuf,
}

pub(super) async fn run(task: &ShowTask, queue: &ShowQueue) -> Result<(), WorkflowError> {
    let show = task.require_show(queue)?;
    let services = queue.services();
    let (name, location) = show.read(|d| (d.name.clone(), d.location.clone()));

    if !tokio::fs::metadata(&location).await.is_ok_and(|m| m.is_dir()) {
        return Err(WorkflowError::step(
            "rename",
            format!("show folder {} does not exist", location.display()),
        ));
    }

    task.step(queue, format!("Renaming episode files for {name}"));
    let pattern = services.config.naming.clone();
    let plans = show.read(|d| plan_renames(d, &pattern));

    let results = tokio::task::spawn_blocking(move || {
        plans
            .into_iter()
            .map(|plan| {
                let outcome = rename::rename_with_sidecars(&plan.current, &plan.target);
                (plan, outcome)
            })
            .collect::<Vec<(RenamePlan, Result<RenameOutcome, ScanError>)>>()
    })
    .await
    .map_err(|e| WorkflowError::step("rename", e))?;

    let (mut renamed, mut unchanged, mut failed) = (0, 0, 0);
    for (plan, outcome) in &results {
        match outcome {
            Ok(RenameOutcome::Renamed { .. }) => {
                renamed += 1;
                show.modify(|d| {
                    for key in &plan.episodes {
                        if let Some(ep) = d.episodes.get_mut(key) {
                            ep.location = Some(plan.target.clone());
                        }
                    }
                });
            }
            Ok(RenameOutcome::Unchanged) => unchanged += 1,
            Err(e) => {
                failed += 1;
                task.warn_step(queue, &format!("Renaming {}", plan.current.display()), e);
            }
        }
    }
    task.step(
        queue,
        format!("Renamed {renamed} files, {unchanged} already named, {failed} failed"),
    );

    services
        .library
        .save(&show)
        .await
        .map_err(|e| WorkflowError::step("save show", e))?;
    Ok(())
}

fn plan_renames(data: &ShowData, pattern: &NamingPattern) -> Vec<RenamePlan> {
    let mut by_file: BTreeMap<&Path, Vec<EpisodeKey>> = BTreeMap::new();
    for ep in data.episodes.values() {
        if let Some(location) = ep.location.as_deref() {
            by_file.entry(location).or_default().push(ep.key());
        }
    }

    by_file
        .into_iter()
        .filter_map(|(current, episodes)| {
            let first = *episodes.first()?;
            let title = data.episodes.get(&first).and_then(|ep| ep.title.as_deref());
            let extension = current.extension().and_then(|e| e.to_str()).unwrap_or("");
            let target = rename::episode_path(
                &data.location,
                data.options.season_folders,
                pattern,
                &data.name,
                first,
                title,
                extension,
            );
            Some(RenamePlan {
                episodes,
                current: current.to_path_buf(),
                target,
            })
        })
        .collect()
}

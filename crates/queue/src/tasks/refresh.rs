use std::collections::HashSet;
use std::path::PathBuf;

use showrunner_core::{Episode, EpisodeKey, EpisodeStatus, Show, ShowData};
use showrunner_scanner::subtitles;
use showrunner_scanner::walk::{self, ShowScan};

use super::{ShowTask, rebuild_scene_numbering, refresh_artwork, write_nfo};
use crate::show_queue::ShowQueue;
use crate::WorkflowError;

/// Rescan the show folder and refresh local metadata. Nothing here is fatal.
pub(super) async fn run(task: &ShowTask, queue: &ShowQueue) -> Result<(), WorkflowError> {
    let show = task.require_show(queue)?;

    scan_and_save(task, queue, &show).await;
    write_nfo(task, queue, &show).await;
    refresh_artwork(task, queue, &show).await;
    rebuild_scene_numbering(task, queue, &show).await;
    Ok(())
}

/// Attach files found on disk to episodes, detach missing ones, record
/// subtitles and save. Failures are logged as steps.
pub(super) async fn scan_and_save(task: &ShowTask, queue: &ShowQueue, show: &Show) {
    let location = show.location();
    task.step(queue, format!("Scanning {}", location.display()));

    let scan = match tokio::task::spawn_blocking(move || walk::scan_show_dir(&location)).await {
        Ok(Ok(scan)) => scan,
        Ok(Err(e)) => return task.warn_step(queue, "Scanning show folder", e),
        Err(e) => return task.warn_step(queue, "Scanning show folder", e),
    };

    let deleted_status = queue.services().config.deleted_status;
    let summary = show.modify(|d| apply_scan(d, &scan, deleted_status));
    task.step(
        queue,
        format!(
            "Found {} episode files: {} changed, {} new episodes, {} missing, {} unrecognised",
            scan.files.len(),
            summary.attached,
            summary.created,
            summary.missing,
            summary.unparsed
        ),
    );

    match record_subtitles(show).await {
        Ok(count) if count > 0 => task.step(queue, format!("{count} episodes have subtitles")),
        Ok(_) => {}
        Err(e) => task.warn_step(queue, "Subtitle scan", e),
    }

    let Some(registered) = queue.services().library.find(show.id()) else {
        // Deleted while scanning; saving would bring it back
        return;
    };
    if let Err(e) = queue.services().library.save(&registered).await {
        task.warn_step(queue, "Saving scan results", e);
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
struct ScanSummary {
    attached: usize,
    created: usize,
    missing: usize,
    unparsed: usize,
}

fn apply_scan(data: &mut ShowData, scan: &ShowScan, deleted_status: EpisodeStatus) -> ScanSummary {
    let mut summary = ScanSummary {
        unparsed: scan.unparsed.len(),
        ..Default::default()
    };
    let mut on_disk = HashSet::new();

    for file in &scan.files {
        for &number in &file.parsed.episodes {
            let key = EpisodeKey::new(file.parsed.season, number);
            on_disk.insert(key);
            let ep = data.episodes.entry(key).or_insert_with(|| {
                summary.created += 1;
                Episode::new(key)
            });
            if ep.location.as_deref() != Some(file.path.as_path()) || ep.file_size != file.size_bytes {
                summary.attached += 1;
            }
            ep.location = Some(file.path.clone());
            ep.file_size = file.size_bytes;
            if ep.status != EpisodeStatus::Archived {
                ep.status = EpisodeStatus::Downloaded;
            }
        }
    }

    for (key, ep) in data.episodes.iter_mut() {
        if on_disk.contains(key) || ep.location.is_none() {
            continue;
        }
        ep.location = None;
        ep.file_size = 0;
        ep.subtitles.clear();
        if ep.status == EpisodeStatus::Downloaded {
            ep.status = deleted_status;
        }
        summary.missing += 1;
    }
    summary
}

/// Record sidecar subtitle languages for every episode with a file.
/// Returns how many episodes have at least one.
pub(super) async fn record_subtitles(show: &Show) -> Result<usize, tokio::task::JoinError> {
    let files: Vec<(EpisodeKey, PathBuf)> = show.read(|d| {
        d.episodes
            .values()
            .filter_map(|ep| ep.location.clone().map(|path| (ep.key(), path)))
            .collect()
    });
    let found = tokio::task::spawn_blocking(move || {
        files
            .into_iter()
            .map(|(key, path)| (key, subtitles::sidecar_languages(&path)))
            .collect::<Vec<_>>()
    })
    .await?;

    Ok(show.modify(|d| {
        let mut with_subtitles = 0;
        for (key, languages) in found {
            if let Some(ep) = d.episodes.get_mut(&key) {
                if !languages.is_empty() {
                    with_subtitles += 1;
                }
                ep.subtitles = languages;
            }
        }
        with_subtitles
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use showrunner_scanner::parser::ParsedEpisode;
    use showrunner_scanner::walk::EpisodeFile;

    fn file(path: &str, season: u32, episodes: Vec<u32>) -> EpisodeFile {
        EpisodeFile {
            path: path.into(),
            size_bytes: 100,
            parsed: ParsedEpisode {
                series_title: "Show".into(),
                season,
                episodes,
                episode_title: None,
            },
        }
    }

    #[test]
    fn scan_attaches_files_and_detaches_missing_ones() {
        let mut data = ShowData::default();
        let mut gone = Episode::new(EpisodeKey::new(1, 3));
        gone.status = EpisodeStatus::Downloaded;
        gone.location = Some("/tv/Show/Show.S01E03.mkv".into());
        gone.subtitles = vec!["en".into()];
        data.episodes.insert(gone.key(), gone);
        let mut wanted = Episode::new(EpisodeKey::new(1, 1));
        wanted.status = EpisodeStatus::Wanted;
        data.episodes.insert(wanted.key(), wanted);

        let scan = ShowScan {
            files: vec![
                file("/tv/Show/Show.S01E01.mkv", 1, vec![1]),
                file("/tv/Show/Show.S02E01E02.mkv", 2, vec![1, 2]),
            ],
            unparsed: vec!["/tv/Show/extras.mkv".into()],
        };

        let summary = apply_scan(&mut data, &scan, EpisodeStatus::Archived);
        assert_eq!(
            summary,
            ScanSummary {
                attached: 3,
                created: 2,
                missing: 1,
                unparsed: 1
            }
        );

        let s01e01 = &data.episodes[&EpisodeKey::new(1, 1)];
        assert_eq!(s01e01.status, EpisodeStatus::Downloaded);
        assert_eq!(s01e01.file_size, 100);
        assert_eq!(
            data.episodes[&EpisodeKey::new(2, 2)].location,
            data.episodes[&EpisodeKey::new(2, 1)].location
        );

        let s01e03 = &data.episodes[&EpisodeKey::new(1, 3)];
        assert_eq!(s01e03.status, EpisodeStatus::Archived);
        assert!(s01e03.location.is_none());
        assert!(s01e03.subtitles.is_empty());

        // A second pass over the same files changes nothing
        let again = apply_scan(&mut data, &scan, EpisodeStatus::Archived);
        assert_eq!(again.attached, 0);
        assert_eq!(again.created, 0);
        assert_eq!(again.missing, 0);
    }
}

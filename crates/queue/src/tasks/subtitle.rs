use std::path::PathBuf;

use showrunner_core::EpisodeKey;

use super::{ShowTask, refresh};
use crate::show_queue::ShowQueue;
use crate::WorkflowError;

pub(super) async fn run(task: &ShowTask, queue: &ShowQueue) -> Result<(), WorkflowError> {
    let show = task.require_show(queue)?;
    let services = queue.services();

    if !show.read(|d| d.options.subtitles) {
        task.step(queue, "Subtitles are disabled for this show");
        return Ok(());
    }

    if let Some(source) = &services.subtitles {
        let wanted = &services.config.subtitle_languages;
        let missing = show.read(|d| missing_languages(d, wanted));
        task.step(
            queue,
            format!("Downloading subtitles for {} episodes", missing.len()),
        );

        let mut fetched = 0;
        for (key, media, languages) in missing {
            match source.download(show.id(), key, &media, &languages).await {
                Ok(got) => fetched += got.len(),
                Err(e) => task.warn_step(queue, &format!("Subtitles for {key}"), e),
            }
        }
        task.step(queue, format!("Downloaded {fetched} subtitle files"));
    }

    let with_subtitles = refresh::record_subtitles(&show)
        .await
        .map_err(|e| WorkflowError::step("scan subtitles", e))?;
    task.step(queue, format!("{with_subtitles} episodes have subtitles"));

    services
        .library
        .save(&show)
        .await
        .map_err(|e| WorkflowError::step("save show", e))?;
    Ok(())
}

/// Episodes with a media file that lack some of the wanted languages.
fn missing_languages(
    data: &showrunner_core::ShowData,
    wanted: &[String],
) -> Vec<(EpisodeKey, PathBuf, Vec<String>)> {
    data.episodes
        .values()
        .filter_map(|ep| {
            let media = ep.location.clone()?;
            let missing: Vec<String> = wanted
                .iter()
                .filter(|lang| !ep.subtitles.contains(lang))
                .cloned()
                .collect();
            (!missing.is_empty()).then(|| (ep.key(), media, missing))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use showrunner_core::{Episode, ShowData};

    #[test]
    fn only_episodes_with_files_and_gaps_are_fetched() {
        let mut data = ShowData::default();
        let mut complete = Episode::new(EpisodeKey::new(1, 1));
        complete.location = Some("/tv/a.mkv".into());
        complete.subtitles = vec!["en".into(), "de".into()];
        let mut partial = Episode::new(EpisodeKey::new(1, 2));
        partial.location = Some("/tv/b.mkv".into());
        partial.subtitles = vec!["en".into()];
        let no_file = Episode::new(EpisodeKey::new(1, 3));
        for ep in [complete, partial, no_file] {
            data.episodes.insert(ep.key(), ep);
        }

        let wanted = vec!["en".to_string(), "de".to_string()];
        assert_eq!(
            missing_languages(&data, &wanted),
            vec![(EpisodeKey::new(1, 2), PathBuf::from("/tv/b.mkv"), vec!["de".to_string()])]
        );
    }
}

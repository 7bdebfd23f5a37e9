//! Episode file naming.
//!
//! Patterns use brace tokens: `{show}`, `{season}`, `{season:02}`,
//! `{episode}`, `{episode:02}`, `{title}`.

use std::path::{Path, PathBuf};

use showrunner_core::EpisodeKey;
use tracing::{debug, warn};

use crate::ScanError;
use crate::parser::sanitize_file_name;
use crate::subtitles;

pub const DEFAULT_PATTERN: &str = "{show} - S{season:02}E{episode:02} - {title}";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamingPattern(String);

impl Default for NamingPattern {
    fn default() -> Self {
        Self(DEFAULT_PATTERN.to_string())
    }
}

impl NamingPattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    /// A pattern that can name distinct files: it must carry season and episode tokens.
    pub fn parse(pattern: &str) -> Result<Self, String> {
        let has = |tokens: [&str; 2]| tokens.iter().any(|t| pattern.contains(t));
        if !has(["{season}", "{season:02}"]) || !has(["{episode}", "{episode:02}"]) {
            return Err(format!("{pattern:?} needs both a season and an episode token"));
        }
        Ok(Self(pattern.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Render a file stem (no extension) for one episode.
    pub fn render(&self, show: &str, key: EpisodeKey, title: Option<&str>) -> String {
        let rendered = self
            .0
            .replace("{show}", show)
            .replace("{season:02}", &format!("{:02}", key.season))
            .replace("{season}", &key.season.to_string())
            .replace("{episode:02}", &format!("{:02}", key.episode))
            .replace("{episode}", &key.episode.to_string())
            .replace("{title}", title.unwrap_or(""));
        // A missing title leaves a dangling separator behind
        let trimmed = rendered.trim_end_matches([' ', '-', '.', '_']);
        sanitize_file_name(trimmed)
    }
}

/// Folder a season's files belong in when season folders are enabled.
pub fn season_folder_name(season: u32) -> String {
    if season == 0 {
        "Specials".to_string()
    } else {
        format!("Season {season:02}")
    }
}

/// Full destination path for an episode file, keeping its extension.
pub fn episode_path(
    show_dir: &Path,
    season_folders: bool,
    pattern: &NamingPattern,
    show_name: &str,
    key: EpisodeKey,
    title: Option<&str>,
    extension: &str,
) -> PathBuf {
    let dir = if season_folders {
        show_dir.join(season_folder_name(key.season))
    } else {
        show_dir.to_path_buf()
    };
    let stem = pattern.render(show_name, key, title);
    if extension.is_empty() {
        dir.join(stem)
    } else {
        dir.join(format!("{stem}.{extension}"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenameOutcome {
    Unchanged,
    Renamed { sidecars: usize },
}

/// Move a media file to `target`, carrying its sidecar subtitles along.
pub fn rename_with_sidecars(current: &Path, target: &Path) -> Result<RenameOutcome, ScanError> {
    if current == target {
        return Ok(RenameOutcome::Unchanged);
    }
    if target.exists() {
        return Err(ScanError::TargetExists(target.to_path_buf()));
    }
    if let Some(parent) = target.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let sidecars = subtitles::discover_sidecars(current);
    std::fs::rename(current, target)?;
    debug!(from = %current.display(), to = %target.display(), "renamed episode file");

    let mut moved = 0;
    for sub in &sidecars {
        let Some(dest) = subtitles::sidecar_target(sub, target) else {
            continue;
        };
        if dest.exists() {
            warn!(path = %dest.display(), "subtitle already exists at destination, leaving original");
            continue;
        }
        match std::fs::rename(&sub.path, &dest) {
            Ok(()) => moved += 1,
            Err(e) => warn!(path = %sub.path.display(), error = %e, "failed to move subtitle"),
        }
    }

    Ok(RenameOutcome::Renamed { sidecars: moved })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn render_default_pattern() {
        let p = NamingPattern::default();
        assert_eq!(
            p.render("Breaking Bad", EpisodeKey::new(2, 5), Some("Breakage")),
            "Breaking Bad - S02E05 - Breakage"
        );
        assert_eq!(
            p.render("Breaking Bad", EpisodeKey::new(2, 5), None),
            "Breaking Bad - S02E05"
        );
    }

    #[test]
    fn render_custom_pattern_sanitizes() {
        let p = NamingPattern::new("{show} {season}x{episode:02} {title}");
        assert_eq!(
            p.render("Who?", EpisodeKey::new(1, 3), Some("A/B")),
            "Who 1x03 A B"
        );
    }

    #[test]
    fn parse_requires_season_and_episode() {
        assert!(NamingPattern::parse("{show} {season}x{episode:02}").is_ok());
        assert!(NamingPattern::parse("{show} - {title}").is_err());
        assert!(NamingPattern::parse("S{season:02}").is_err());
    }

    #[test]
    fn episode_path_uses_season_folders() {
        let p = NamingPattern::default();
        let path = episode_path(
            Path::new("/tv/Show"),
            true,
            &p,
            "Show",
            EpisodeKey::new(0, 1),
            Some("Special"),
            "mkv",
        );
        assert_eq!(path, PathBuf::from("/tv/Show/Specials/Show - S00E01 - Special.mkv"));

        let flat = episode_path(Path::new("/tv/Show"), false, &p, "Show", EpisodeKey::new(3, 1), None, "mp4");
        assert_eq!(flat, PathBuf::from("/tv/Show/Show - S03E01.mp4"));
    }

    #[test]
    fn rename_moves_subtitles_and_refuses_overwrite() {
        let tmp = std::env::temp_dir().join(format!("sr_rename_test_{}", std::process::id()));
        fs::create_dir_all(&tmp).unwrap();
        let original = tmp.join("show.s01e01.mkv");
        fs::write(&original, "video").unwrap();
        fs::write(tmp.join("show.s01e01.en.srt"), "subs").unwrap();

        let target = tmp.join("Season 01/Show - S01E01 - Pilot.mkv");
        let outcome = rename_with_sidecars(&original, &target).unwrap();
        assert_eq!(outcome, RenameOutcome::Renamed { sidecars: 1 });
        assert!(target.exists());
        assert!(tmp.join("Season 01/Show - S01E01 - Pilot.en.srt").exists());
        assert!(!original.exists());

        assert_eq!(rename_with_sidecars(&target, &target).unwrap(), RenameOutcome::Unchanged);

        fs::write(&original, "another copy").unwrap();
        assert!(matches!(
            rename_with_sidecars(&original, &target),
            Err(ScanError::TargetExists(_))
        ));

        fs::remove_dir_all(&tmp).ok();
    }
}

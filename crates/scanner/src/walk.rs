use std::path::{Path, PathBuf};
use tracing::debug;

use crate::ScanError;
use crate::parser::{self, ParsedEpisode};

/// A video file found under a show folder whose name parsed as an episode.
#[derive(Debug, Clone)]
pub struct EpisodeFile {
    pub path: PathBuf,
    pub size_bytes: u64,
    pub parsed: ParsedEpisode,
}

/// Everything found in one pass over a show folder.
#[derive(Debug, Clone, Default)]
pub struct ShowScan {
    pub files: Vec<EpisodeFile>,
    /// Video files whose names carry no recognisable episode number.
    pub unparsed: Vec<PathBuf>,
}

/// Walk a show folder recursively and collect its episode files.
pub fn scan_show_dir(root: &Path) -> Result<ShowScan, ScanError> {
    if !root.is_dir() {
        return Err(ScanError::MissingDirectory(root.to_path_buf()));
    }
    let mut scan = ShowScan::default();
    walk_recursive(root, &mut scan);
    scan.files.sort_by(|a, b| a.path.cmp(&b.path));
    Ok(scan)
}

fn walk_recursive(dir: &Path, scan: &mut ShowScan) {
    let read_dir = match std::fs::read_dir(dir) {
        Ok(rd) => rd,
        Err(e) => {
            tracing::warn!(path = %dir.display(), error = %e, "cannot read directory");
            return;
        }
    };

    for entry in read_dir.flatten() {
        let path = entry.path();
        let file_name = entry.file_name();
        let name = file_name.to_string_lossy();

        // Skip hidden files/dirs and ignored patterns
        if name.starts_with('.') || parser::should_ignore(&name) {
            debug!(path = %path.display(), "skipping ignored entry");
            continue;
        }

        if path.is_dir() {
            if name == "@eaDir" || name == "#recycle" || name == ".Trash" {
                continue;
            }
            walk_recursive(&path, scan);
        } else if parser::is_video_file(&name) {
            match parser::parse_episode_filename(&name) {
                Some(parsed) => {
                    let size_bytes = std::fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
                    scan.files.push(EpisodeFile {
                        path,
                        size_bytes,
                        parsed,
                    });
                }
                None => scan.unparsed.push(path),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn scan_finds_episode_files_in_season_folders() {
        let tmp = std::env::temp_dir().join(format!("sr_walk_test_{}", std::process::id()));
        fs::create_dir_all(tmp.join("Season 01")).unwrap();
        fs::create_dir_all(tmp.join("Season 02")).unwrap();
        fs::create_dir_all(tmp.join("@eaDir")).unwrap();

        fs::write(tmp.join("Season 01/Show.S01E01.mkv"), "fake video").unwrap();
        fs::write(tmp.join("Season 01/Show.S01E02.mkv"), "x").unwrap();
        fs::write(tmp.join("Season 02/Show.2x01.mp4"), "x").unwrap();
        fs::write(tmp.join("Season 01/Show.S01E01.en.srt"), "subs").unwrap();
        fs::write(tmp.join("@eaDir/Show.S09E09.mkv"), "thumb junk").unwrap();
        fs::write(tmp.join("behind the scenes.mkv"), "extra").unwrap();

        let scan = scan_show_dir(&tmp).unwrap();
        let found: Vec<(u32, Vec<u32>)> = scan
            .files
            .iter()
            .map(|f| (f.parsed.season, f.parsed.episodes.clone()))
            .collect();
        assert_eq!(found, vec![(1, vec![1]), (1, vec![2]), (2, vec![1])]);
        assert_eq!(scan.files[0].size_bytes, "fake video".len() as u64);
        assert_eq!(scan.unparsed.len(), 1);

        fs::remove_dir_all(&tmp).ok();
    }

    #[test]
    fn missing_folder_is_an_error() {
        let missing = std::env::temp_dir().join("sr_walk_definitely_missing");
        assert!(matches!(
            scan_show_dir(&missing),
            Err(ScanError::MissingDirectory(_))
        ));
    }
}

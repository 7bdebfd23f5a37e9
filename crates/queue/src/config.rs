use std::path::PathBuf;

use showrunner_core::EpisodeStatus;
use showrunner_scanner::rename::NamingPattern;

/// Library-wide behaviour shared by every show task.
#[derive(Debug, Clone)]
pub struct LibraryConfig {
    /// Parent folder new shows are placed in when no location is given.
    pub root_dir: Option<PathBuf>,
    /// Create a missing show folder on add instead of failing.
    pub create_show_dirs: bool,
    pub naming: NamingPattern,
    pub subtitle_languages: Vec<String>,
    /// Status given to a downloaded episode whose file disappeared from disk.
    pub deleted_status: EpisodeStatus,
    /// Write `tvshow.nfo` into the show folder on add and refresh.
    pub write_nfo: bool,
}

impl Default for LibraryConfig {
    fn default() -> Self {
        Self {
            root_dir: None,
            create_show_dirs: true,
            naming: NamingPattern::default(),
            subtitle_languages: vec!["en".to_string()],
            deleted_status: EpisodeStatus::Archived,
            write_nfo: true,
        }
    }
}

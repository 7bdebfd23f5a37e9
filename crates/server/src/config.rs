//! Process configuration read from `SHOWRUNNER_*` environment variables.

use std::path::PathBuf;

use showrunner_core::EpisodeStatus;
use showrunner_queue::LibraryConfig;
use showrunner_scanner::rename::NamingPattern;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{var} is not valid: {reason}")]
    Invalid { var: &'static str, reason: String },
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub db_path: String,
    pub bind_addr: String,
    pub cache_dir: PathBuf,
    pub tmdb_api_key: Option<String>,
    pub library: LibraryConfig,
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|var| std::env::var(var).ok())
    }

    /// Build from any variable source. Unset variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut library = LibraryConfig {
            root_dir: lookup("SHOWRUNNER_LIBRARY_ROOT").map(PathBuf::from),
            ..Default::default()
        };
        if let Some(raw) = lookup("SHOWRUNNER_CREATE_SHOW_DIRS") {
            library.create_show_dirs = parse_bool("SHOWRUNNER_CREATE_SHOW_DIRS", &raw)?;
        }
        if let Some(raw) = lookup("SHOWRUNNER_WRITE_NFO") {
            library.write_nfo = parse_bool("SHOWRUNNER_WRITE_NFO", &raw)?;
        }
        if let Some(pattern) = lookup("SHOWRUNNER_NAMING_PATTERN") {
            library.naming = NamingPattern::parse(&pattern).map_err(|reason| ConfigError::Invalid {
                var: "SHOWRUNNER_NAMING_PATTERN",
                reason,
            })?;
        }
        if let Some(raw) = lookup("SHOWRUNNER_SUBTITLE_LANGUAGES") {
            library.subtitle_languages = raw
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
        if let Some(raw) = lookup("SHOWRUNNER_DELETED_STATUS") {
            library.deleted_status =
                EpisodeStatus::parse(&raw).ok_or_else(|| ConfigError::Invalid {
                    var: "SHOWRUNNER_DELETED_STATUS",
                    reason: format!("unknown episode status {raw:?}"),
                })?;
        }

        Ok(Self {
            db_path: lookup("SHOWRUNNER_DB").unwrap_or_else(|| "showrunner.db".to_string()),
            bind_addr: lookup("SHOWRUNNER_BIND").unwrap_or_else(|| "0.0.0.0:8081".to_string()),
            cache_dir: lookup("SHOWRUNNER_CACHE_DIR")
                .unwrap_or_else(|| "/tmp/showrunner_cache".to_string())
                .into(),
            tmdb_api_key: lookup("SHOWRUNNER_TMDB_API_KEY").filter(|k| !k.is_empty()),
            library,
        })
    }
}

fn parse_bool(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ConfigError::Invalid {
            var,
            reason: format!("expected a boolean, got {other:?}"),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_nothing_is_set() {
        let config = ServerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.db_path, "showrunner.db");
        assert!(config.tmdb_api_key.is_none());
        assert!(config.library.root_dir.is_none());
        assert_eq!(config.library.deleted_status, EpisodeStatus::Archived);
    }

    #[test]
    fn library_settings_are_read() {
        let config = ServerConfig::from_lookup(lookup(&[
            ("SHOWRUNNER_LIBRARY_ROOT", "/tv"),
            ("SHOWRUNNER_WRITE_NFO", "no"),
            ("SHOWRUNNER_SUBTITLE_LANGUAGES", "en, de,,fr"),
            ("SHOWRUNNER_DELETED_STATUS", "wanted"),
        ]))
        .unwrap();
        assert_eq!(config.library.root_dir, Some(PathBuf::from("/tv")));
        assert!(!config.library.write_nfo);
        assert_eq!(config.library.subtitle_languages, vec!["en", "de", "fr"]);
        assert_eq!(config.library.deleted_status, EpisodeStatus::Wanted);
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(ServerConfig::from_lookup(lookup(&[("SHOWRUNNER_WRITE_NFO", "maybe")])).is_err());
        assert!(
            ServerConfig::from_lookup(lookup(&[("SHOWRUNNER_NAMING_PATTERN", "{title}")])).is_err()
        );
    }
}

//! Sidecar subtitle file discovery.
//!
//! Naming conventions:
//! - `Show - S01E01.en.srt`          → language "en"
//! - `Show - S01E01.en.forced.srt`   → language "en", forced
//! - `Show - S01E01.srt`             → unknown language
//! - `Show - S01E01.en.hi.srt`       → language "en", hearing impaired
//!
//! Supported extensions: .srt, .sub, .ass, .ssa, .vtt, .sup, .idx

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// A discovered sidecar subtitle file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SidecarSubtitle {
    pub path: PathBuf,
    pub format: SubtitleFormat,
    pub language: Option<String>,
    pub forced: bool,
    pub sdh: bool,
    /// Everything between the media stem and the extension, e.g. `.en.forced`.
    pub suffix: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubtitleFormat {
    Srt,
    Sub,
    Ass,
    Ssa,
    Vtt,
    Sup, // PGS bitmap
    Idx, // VobSub index
}

impl SubtitleFormat {
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "srt" => Some(Self::Srt),
            "sub" => Some(Self::Sub),
            "ass" => Some(Self::Ass),
            "ssa" => Some(Self::Ssa),
            "vtt" => Some(Self::Vtt),
            "sup" => Some(Self::Sup),
            "idx" => Some(Self::Idx),
            _ => None,
        }
    }
}

/// ISO 639-1 two-letter language codes (common subset for validation).
const LANG_CODES: &[&str] = &[
    "ar", "bg", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "es", "et", "eu", "fa", "fi",
    "fr", "ga", "gl", "he", "hi", "hr", "hu", "hy", "id", "is", "it", "ja", "ka", "kk", "ko",
    "lt", "lv", "mk", "ms", "nb", "nl", "nn", "no", "pl", "pt", "ro", "ru", "sk", "sl", "sq",
    "sr", "sv", "ta", "th", "tr", "uk", "ur", "vi", "zh",
];

fn is_lang_code(s: &str) -> bool {
    let lower = s.to_ascii_lowercase();
    LANG_CODES.contains(&lower.as_str())
        || (lower.len() == 3 && lower.chars().all(|c| c.is_ascii_alphabetic())) // ISO 639-2
}

/// Parse language/forced/SDH markers from the part of a subtitle stem after the media stem.
fn parse_sub_markers(extra: &str) -> (Option<String>, bool, bool) {
    let mut language = None;
    let mut forced = false;
    let mut sdh = false;

    for part in extra.split('.').filter(|s| !s.is_empty()) {
        let lower = part.to_ascii_lowercase();
        if lower == "forced" {
            forced = true;
        } else if lower == "sdh" || lower == "cc" {
            sdh = true;
        } else if lower == "hi" && language.is_some() {
            // `hi` is Hindi in first position and hearing-impaired after a language.
            sdh = true;
        } else if is_lang_code(part) && language.is_none() {
            language = Some(lower);
        }
    }

    (language, forced, sdh)
}

/// Discover sidecar subtitle files for a given media file.
pub fn discover_sidecars(media_path: &Path) -> Vec<SidecarSubtitle> {
    let (Some(parent), Some(media_stem)) = (
        media_path.parent(),
        media_path.file_stem().and_then(|s| s.to_str()),
    ) else {
        return Vec::new();
    };

    let entries = match std::fs::read_dir(parent) {
        Ok(e) => e,
        Err(_) => return Vec::new(),
    };

    let mut results = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }

        let Some(format) = path
            .extension()
            .and_then(|e| e.to_str())
            .and_then(SubtitleFormat::from_extension)
        else {
            continue;
        };

        let Some(sub_stem) = path.file_stem().and_then(|s| s.to_str()) else {
            continue;
        };

        // Subtitle stem must be the media stem, optionally followed by `.markers`
        let Some(extra) = sub_stem.strip_prefix(media_stem) else {
            continue;
        };
        if !extra.is_empty() && !extra.starts_with('.') {
            continue;
        }

        let (language, forced, sdh) = parse_sub_markers(extra);
        results.push(SidecarSubtitle {
            suffix: extra.to_string(),
            path,
            format,
            language,
            forced,
            sdh,
        });
    }

    results.sort_by(|a, b| a.path.cmp(&b.path));
    results
}

/// Distinct languages among the sidecars of a media file, sorted.
pub fn sidecar_languages(media_path: &Path) -> Vec<String> {
    let mut langs: Vec<String> = discover_sidecars(media_path)
        .into_iter()
        .filter_map(|s| s.language)
        .collect();
    langs.sort();
    langs.dedup();
    langs
}

/// Where a sidecar should live once its media file is renamed to `new_media`.
pub fn sidecar_target(sub: &SidecarSubtitle, new_media: &Path) -> Option<PathBuf> {
    let new_stem = new_media.file_stem()?.to_str()?;
    let ext = sub.path.extension()?.to_str()?;
    Some(new_media.with_file_name(format!("{new_stem}{}.{ext}", sub.suffix)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn subtitle_format_detection() {
        assert_eq!(SubtitleFormat::from_extension("srt"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_extension("SRT"), Some(SubtitleFormat::Srt));
        assert_eq!(SubtitleFormat::from_extension("vtt"), Some(SubtitleFormat::Vtt));
        assert_eq!(SubtitleFormat::from_extension("mp4"), None);
    }

    #[test]
    fn parse_markers() {
        assert_eq!(parse_sub_markers(".en"), (Some("en".into()), false, false));
        assert_eq!(parse_sub_markers(".en.forced"), (Some("en".into()), true, false));
        assert_eq!(parse_sub_markers(".en.hi"), (Some("en".into()), false, true));
        assert_eq!(parse_sub_markers(".hi"), (Some("hi".into()), false, false));
        assert_eq!(parse_sub_markers(""), (None, false, false));
    }

    #[test]
    fn discover_sidecars_finds_subtitles() {
        let tmp = std::env::temp_dir().join(format!("sr_sub_test_{}", std::process::id()));
        fs::create_dir_all(&tmp).unwrap();

        let media = tmp.join("Show - S01E01.mkv");
        fs::write(&media, "fake video").unwrap();
        fs::write(tmp.join("Show - S01E01.en.srt"), "Hello").unwrap();
        fs::write(tmp.join("Show - S01E01.fr.forced.srt"), "Bonjour").unwrap();
        fs::write(tmp.join("Show - S01E01.srt"), "no lang").unwrap();
        // Same prefix, different episode
        fs::write(tmp.join("Show - S01E010.en.srt"), "not ours").unwrap();

        let subs = discover_sidecars(&media);
        assert_eq!(subs.len(), 3);
        assert!(subs.iter().any(|s| s.language.as_deref() == Some("fr") && s.forced));
        assert_eq!(sidecar_languages(&media), vec!["en", "fr"]);

        let en = subs.iter().find(|s| s.language.as_deref() == Some("en")).unwrap();
        let target = sidecar_target(en, &tmp.join("Show - S01E01 - Pilot.mkv")).unwrap();
        assert_eq!(target, tmp.join("Show - S01E01 - Pilot.en.srt"));

        fs::remove_dir_all(&tmp).ok();
    }
}

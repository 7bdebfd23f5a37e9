use regex::Regex;
use std::sync::LazyLock;

/// Parsed episode info from a filename. Multi-episode files list every number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedEpisode {
    pub series_title: String,
    pub season: u32,
    pub episodes: Vec<u32>,
    pub episode_title: Option<String>,
}

// Patterns to ignore
static IGNORE_NAMES: &[&str] = &[
    ".DS_Store",
    "Thumbs.db",
    "@eaDir",
    ".nfo",
    ".txt",
    ".jpg",
    ".jpeg",
    ".png",
    ".srt",
    ".sub",
    ".idx",
    ".ass",
    ".ssa",
    "sample",
];

static VIDEO_EXTENSIONS: &[&str] = &[
    "mkv", "mp4", "avi", "m4v", "mov", "wmv", "flv", "webm", "ts", "mpg", "mpeg", "3gp", "ogv",
    "m2ts", "mts", "vob", "mxf", "f4v", "3g2", "asf", "mpe", "mpv",
];

// S01E02, s1e3, S01E01E02, S01E01-E02
static RE_SXXEXX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)s(\d{1,2})((?:[ ._-]?e\d{1,3})+)").unwrap()
});

static RE_EPISODE_NUM: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"(?i)e(\d{1,3})").unwrap());

// 1x02
static RE_XEP: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:^|[ ._-])(\d{1,2})x(\d{2,3})(?:[ ._-]|$)").unwrap()
});

// "Season X Episode Y"
static RE_SEASON_EPISODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)Season\s+(\d+)\s+Episode\s+(\d+)").unwrap()
});

/// Characters that are not allowed in file or folder names on common filesystems.
static ILLEGAL_CHARS: &[char] = &['<', '>', ':', '"', '/', '\\', '|', '?', '*'];

/// Check if a filename should be ignored.
pub fn should_ignore(filename: &str) -> bool {
    let lower = filename.to_lowercase();
    IGNORE_NAMES.iter().any(|pat| {
        let pat = pat.to_lowercase();
        lower == pat || lower.ends_with(&pat) || (pat == "sample" && lower.contains(".sample."))
    })
}

/// Check if a file has a video extension.
pub fn is_video_file(filename: &str) -> bool {
    match filename.rsplit_once('.') {
        Some((_, ext)) => VIDEO_EXTENSIONS.contains(&ext.to_lowercase().as_str()),
        None => false,
    }
}

/// Clean up a title: replace dots/underscores with spaces, trim.
fn clean_title(raw: &str) -> String {
    raw.replace(['.', '_'], " ")
        .trim()
        .trim_end_matches(['-', ' '])
        .trim()
        .to_string()
}

/// Strip characters that cannot appear in a path component.
pub fn sanitize_file_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|c| if ILLEGAL_CHARS.contains(&c) { ' ' } else { c })
        .collect();
    cleaned
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .trim_end_matches('.')
        .to_string()
}

/// Parse a video filename into season/episode numbers.
pub fn parse_episode_filename(filename: &str) -> Option<ParsedEpisode> {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename);

    // Strip extension
    let stem = match base.rsplit_once('.') {
        Some((stem, ext)) if !ext.contains(' ') && ext.len() <= 4 => stem,
        _ => base,
    };

    if let Some(caps) = RE_SXXEXX.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episodes: Vec<u32> = RE_EPISODE_NUM
            .captures_iter(&caps[2])
            .filter_map(|c| c[1].parse().ok())
            .collect();
        if episodes.is_empty() {
            return None;
        }
        let whole = caps.get(0)?;
        let after = &stem[whole.end()..];
        let episode_title = {
            let t = clean_title(after.trim_start_matches(['-', '.', ' ', '_']));
            if t.is_empty() { None } else { Some(t) }
        };
        return Some(ParsedEpisode {
            series_title: clean_title(&stem[..whole.start()]),
            season,
            episodes,
            episode_title,
        });
    }

    if let Some(caps) = RE_XEP.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        return Some(ParsedEpisode {
            series_title: clean_title(&stem[..caps.get(0)?.start()]),
            season,
            episodes: vec![episode],
            episode_title: None,
        });
    }

    if let Some(caps) = RE_SEASON_EPISODE.captures(stem) {
        let season: u32 = caps[1].parse().ok()?;
        let episode: u32 = caps[2].parse().ok()?;
        return Some(ParsedEpisode {
            series_title: clean_title(&stem[..caps.get(0)?.start()]),
            season,
            episodes: vec![episode],
            episode_title: None,
        });
    }

    None
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sxxexx() {
        let r = parse_episode_filename("Breaking.Bad.S02E05.Episode.Title.mkv");
        assert_eq!(
            r,
            Some(ParsedEpisode {
                series_title: "Breaking Bad".into(),
                season: 2,
                episodes: vec![5],
                episode_title: Some("Episode Title".into()),
            })
        );
    }

    #[test]
    fn parse_sxxexx_lowercase() {
        let r = parse_episode_filename("the.office.s01e01.pilot.mp4").unwrap();
        assert_eq!(r.series_title, "the office");
        assert_eq!((r.season, r.episodes), (1, vec![1]));
        assert_eq!(r.episode_title.as_deref(), Some("pilot"));
    }

    #[test]
    fn parse_multi_episode() {
        let r = parse_episode_filename("Show.Name.S03E01E02.720p.mkv").unwrap();
        assert_eq!(r.season, 3);
        assert_eq!(r.episodes, vec![1, 2]);

        let r = parse_episode_filename("Show Name - S03E01-E02 - Double.mkv").unwrap();
        assert_eq!(r.episodes, vec![1, 2]);
        assert_eq!(r.series_title, "Show Name");
        assert_eq!(r.episode_title.as_deref(), Some("Double"));
    }

    #[test]
    fn parse_xep_format() {
        let r = parse_episode_filename("Seinfeld.3x12.avi").unwrap();
        assert_eq!(r.series_title, "Seinfeld");
        assert_eq!((r.season, r.episodes), (3, vec![12]));
    }

    #[test]
    fn parse_season_episode_format() {
        let r = parse_episode_filename("Friends Season 2 Episode 14.mkv").unwrap();
        assert_eq!(r.series_title, "Friends");
        assert_eq!((r.season, r.episodes), (2, vec![14]));
    }

    #[test]
    fn specials_season_zero() {
        let r = parse_episode_filename("Show.Name.S00E01.Special.mkv").unwrap();
        assert_eq!(r.season, 0);
        assert_eq!(r.episodes, vec![1]);
    }

    #[test]
    fn movie_names_do_not_parse() {
        assert_eq!(parse_episode_filename("Inception.2010.1080p.BluRay.mkv"), None);
        assert_eq!(parse_episode_filename("The Matrix (1999).mkv"), None);
    }

    #[test]
    fn ignore_patterns() {
        assert!(should_ignore(".DS_Store"));
        assert!(should_ignore("Thumbs.db"));
        assert!(should_ignore("tvshow.nfo"));
        assert!(should_ignore("poster.jpg"));
        assert!(should_ignore("show.s01e01.sample.mkv"));
        assert!(!should_ignore("show.s01e01.mkv"));
    }

    #[test]
    fn video_extension_check() {
        assert!(is_video_file("ep.mkv"));
        assert!(is_video_file("Ep.MP4"));
        assert!(!is_video_file("poster.jpg"));
        assert!(!is_video_file("subs.srt"));
        assert!(!is_video_file("noext"));
    }

    #[test]
    fn sanitize_strips_illegal_characters() {
        assert_eq!(sanitize_file_name("Marvel's Agents: S.H.I.E.L.D."), "Marvel's Agents S.H.I.E.L.D");
        assert_eq!(sanitize_file_name("What/If?"), "What If");
        assert_eq!(sanitize_file_name("Plain"), "Plain");
    }
}

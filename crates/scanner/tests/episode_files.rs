use std::fs;

use showrunner_scanner::parser::{is_video_file, parse_episode_filename};
use showrunner_scanner::walk::scan_show_dir;

#[test]
fn recognizes_episode_containers() {
    for name in ["a.mp4", "b.MKV", "c.m2ts", "d.webm", "e.avi", "f.ts", "g.m4v", "h.WMV"] {
        assert!(is_video_file(name), "should detect {name}");
    }
    for name in ["tvshow.nfo", "poster.jpg", "show.s01e01.en.srt", "season.zip", "README"] {
        assert!(!is_video_file(name), "should NOT detect {name}");
    }
}

#[test]
fn multi_episode_names_list_every_episode() {
    let parsed = parse_episode_filename("The.Office.S03E10E11.A.Benihana.Christmas.mkv").unwrap();
    assert_eq!(parsed.season, 3);
    assert_eq!(parsed.episodes, vec![10, 11]);
    assert_eq!(parsed.series_title, "The Office");

    let dashed = parse_episode_filename("Show - S01E01-E02.mp4").unwrap();
    assert_eq!(dashed.episodes, vec![1, 2]);
}

#[test]
fn show_folder_scan_splits_parsed_and_unparsed_files() {
    let root = std::env::temp_dir().join(format!("sr_scan_test_{}", std::process::id()));
    fs::create_dir_all(root.join("Season 01")).unwrap();
    fs::write(root.join("Season 01/Show.S01E01.mkv"), "video").unwrap();
    fs::write(root.join("Season 01/Show.S01E01.en.srt"), "subs").unwrap();
    fs::write(root.join("Show.2x03.avi"), "video").unwrap();
    fs::write(root.join("behind the scenes.mkv"), "extra").unwrap();
    fs::write(root.join("Show.S01E02.sample.mkv"), "sample").unwrap();

    let scan = scan_show_dir(&root).unwrap();
    let found: Vec<_> = scan
        .files
        .iter()
        .map(|f| (f.parsed.season, f.parsed.episodes.clone(), f.size_bytes))
        .collect();
    assert_eq!(found, vec![(1, vec![1], 5), (2, vec![3], 5)]);
    assert_eq!(scan.unparsed, vec![root.join("behind the scenes.mkv")]);

    assert!(scan_show_dir(&root.join("missing")).is_err());
    fs::remove_dir_all(&root).ok();
}

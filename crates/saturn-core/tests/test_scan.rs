mod common;

use saturn_core::error::SaturnError;
use saturn_core::scan::{scan_frames, ScanConfig};

use common::touch;

#[test]
fn test_scan_finds_frames_recursively_in_name_order() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("night2/b.fit"));
    touch(&root.join("night1/a.fits"));
    touch(&root.join("night1/deep/c.FTS"));
    touch(&root.join("night1/notes.txt"));

    let files = scan_frames(root, &ScanConfig::default()).unwrap();
    let rel: Vec<String> = files
        .iter()
        .map(|p| p.strip_prefix(root).unwrap().to_string_lossy().replace('\\', "/"))
        .collect();
    assert_eq!(rel, ["night1/a.fits", "night1/deep/c.FTS", "night2/b.fit"]);
}

#[test]
fn test_scan_prunes_prefixed_directories() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("keep/a.fit"));
    touch(&root.join("_trash/b.fit"));
    touch(&root.join("keep/_old/deeper/c.fit"));
    // files themselves are not pruned by prefix
    touch(&root.join("keep/_d.fit"));

    let files = scan_frames(root, &ScanConfig::default()).unwrap();
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["_d.fit", "a.fit"]);
}

#[test]
fn test_scan_custom_prefixes_and_extensions() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path();
    touch(&root.join("skip.me/a.fit"));
    touch(&root.join("data/b.xisf"));
    touch(&root.join("_data/c.xisf"));
    let config = ScanConfig {
        skip_prefixes: vec!["skip".into()],
        extensions: vec!["xisf".into()],
        follow_links: false,
    };
    let files = scan_frames(root, &config).unwrap();
    assert_eq!(files.len(), 2);
}

#[test]
fn test_scan_missing_root() {
    let dir = tempfile::tempdir().unwrap();
    let err = scan_frames(&dir.path().join("absent"), &ScanConfig::default()).unwrap_err();
    assert!(matches!(err, SaturnError::DirectoryMissing(_)));
}

#[test]
fn test_scan_root_with_prefix_is_still_entered() {
    let dir = tempfile::tempdir().unwrap();
    let root = dir.path().join("_lights");
    touch(&root.join("a.fit"));
    let files = scan_frames(&root, &ScanConfig::default()).unwrap();
    assert_eq!(files.len(), 1);
}

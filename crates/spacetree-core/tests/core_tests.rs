use spacetree_core::{Entry, EntryKind, EntryTree, ScanConfig, SessionId, TreeError};
use std::path::{Path, PathBuf};
use std::time::Duration;

fn dir(name: &str, path: &str, size: u64) -> Entry {
    Entry::directory(name, path, size, true)
}

/// /root
///   docs/          (300)
///     a.txt        (100)
///     nested/      (200)
///   music/         (1000)
///   readme.md      (5)
fn build_tree() -> EntryTree {
    let mut docs = dir("docs", "/root/docs", 300);
    docs.contents = Some(vec![
        Entry::file("a.txt", "/root/docs/a.txt", 100),
        dir("nested", "/root/docs/nested", 200),
    ]);

    EntryTree::new(
        PathBuf::from("/root"),
        SessionId::new(7),
        vec![
            docs,
            dir("music", "/root/music", 1000),
            Entry::file("readme.md", "/root/readme.md", 5),
        ],
        Duration::from_millis(3),
        Vec::new(),
    )
}

#[test]
fn test_lazy_expansion_sequence() {
    let mut tree = build_tree();

    // Grandchildren of an unexpanded node are unreachable.
    assert!(!tree.contains(Path::new("/root/music/song.mp3")));

    tree.attach(
        Path::new("/root/music"),
        vec![
            Entry::file("song.mp3", "/root/music/song.mp3", 900),
            dir("albums", "/root/music/albums", 100),
        ],
    )
    .unwrap();
    assert!(tree.contains(Path::new("/root/music/song.mp3")));

    tree.attach(
        Path::new("/root/music/albums"),
        vec![Entry::file("x.flac", "/root/music/albums/x.flac", 100)],
    )
    .unwrap();
    assert_eq!(
        tree.find(Path::new("/root/music/albums/x.flac")).map(|e| e.size),
        Some(100)
    );
}

#[test]
fn test_attach_cannot_skip_levels() {
    let mut tree = build_tree();
    let err = tree
        .attach(Path::new("/root/music/albums"), Vec::new())
        .unwrap_err();
    assert!(matches!(err, TreeError::NotFound { .. }));
}

#[test]
fn test_attach_expanded_empty_is_distinct() {
    let mut tree = build_tree();
    let nested = Path::new("/root/docs/nested");

    assert!(!tree.find(nested).unwrap().is_expanded());
    tree.attach(nested, Vec::new()).unwrap();

    let entry = tree.find(nested).unwrap();
    assert!(entry.is_expanded());
    assert_eq!(entry.contents.as_deref(), Some(&[][..]));
}

#[test]
fn test_attach_leaf_directory_rejected() {
    let mut tree = build_tree();
    tree.attach(
        Path::new("/root/docs/nested"),
        vec![Entry::directory("empty", "/root/docs/nested/empty", 0, false)],
    )
    .unwrap();

    let err = tree
        .attach(Path::new("/root/docs/nested/empty"), Vec::new())
        .unwrap_err();
    assert!(matches!(err, TreeError::NotExpandable { .. }));
}

#[test]
fn test_remove_subtree_completely() {
    let mut tree = build_tree();
    tree.attach(
        Path::new("/root/docs/nested"),
        vec![Entry::file("deep.bin", "/root/docs/nested/deep.bin", 200)],
    )
    .unwrap();

    let removed = tree.remove(Path::new("/root/docs")).unwrap();
    assert_eq!(removed.name.as_str(), "docs");

    for gone in [
        "/root/docs",
        "/root/docs/a.txt",
        "/root/docs/nested",
        "/root/docs/nested/deep.bin",
    ] {
        assert!(tree.find(Path::new(gone)).is_none(), "{gone} still present");
    }
    assert!(tree.iter().all(|e| !e.path.starts_with("/root/docs")));
    assert_eq!(tree.contents.len(), 2);
}

#[test]
fn test_remove_missing_is_noop() {
    let mut tree = build_tree();
    let before = tree.iter().count();
    assert!(tree.remove(Path::new("/root/nothing")).is_none());
    assert!(tree.remove(Path::new("/elsewhere/file")).is_none());
    assert_eq!(tree.iter().count(), before);
}

#[test]
fn test_remove_leaves_ancestors_stale() {
    let mut tree = build_tree();
    tree.remove(Path::new("/root/docs/a.txt")).unwrap();
    assert_eq!(tree.find(Path::new("/root/docs")).unwrap().size, 300);
}

#[test]
fn test_sort_by_size() {
    let mut tree = build_tree();
    tree.sort_by_size();
    let names: Vec<_> = tree.contents.iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["music", "docs", "readme.md"]);

    let docs = tree.find(Path::new("/root/docs")).unwrap();
    let nested: Vec<_> = docs
        .contents
        .as_ref()
        .unwrap()
        .iter()
        .map(|e| e.name.as_str())
        .collect();
    assert_eq!(nested, ["nested", "a.txt"]);
}

#[test]
fn test_entry_serialization() {
    let entry = Entry::symlink("link", "/root/link", "/target");
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["type"], "symlink");
    assert_eq!(json["target"], "/target");
    assert!(json.get("contents").is_none());

    let dir = Entry::inaccessible("locked", "/root/locked", EntryKind::Directory, "denied");
    let json = serde_json::to_string(&dir).unwrap();
    let back: Entry = serde_json::from_str(&json).unwrap();
    assert_eq!(back, dir);
}

#[test]
fn test_tree_serialization_keeps_materialization_state() {
    let tree = build_tree();
    let json = serde_json::to_string(&tree).unwrap();
    let back: EntryTree = serde_json::from_str(&json).unwrap();

    assert_eq!(back.session, SessionId::new(7));
    assert!(back.find(Path::new("/root/docs")).unwrap().is_expanded());
    assert!(!back.find(Path::new("/root/music")).unwrap().is_expanded());
}

#[test]
fn test_config_defaults() {
    let config = ScanConfig::default();
    assert_eq!(config.root, PathBuf::from("."));
    assert!(config.include_hidden);
    assert!(!config.follow_symlinks);
    assert!(config.cross_filesystems);
    assert_eq!(config.progress_interval, 50);
}

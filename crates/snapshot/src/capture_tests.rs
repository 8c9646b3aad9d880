use super::*;
use std::fs::{self, create_dir, write};

fn record_names(document: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_to_string(document)
        .expect("read document")
        .lines()
        .filter_map(|l| l.strip_prefix("Name: ").map(str::to_owned))
        .collect();
    names.sort();
    names
}

#[test]
fn capture_writes_one_document_per_directory() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path().join("d");
    let out = tmp.path().join("out");
    create_dir(&root).expect("create d");
    write(root.join("a.txt"), b"0123456789").expect("write a.txt");
    create_dir(root.join("sub")).expect("create sub");
    write(root.join("sub").join("b.txt"), b"").expect("write b.txt");

    let (tree, written) = capture(
        &root,
        &out,
        &TraverseOptions::default(),
        DocumentNaming::BaseName,
    )
    .expect("capture");

    assert_eq!(tree.dir_count(), 2);
    assert_eq!(written.len(), 2);
    assert_eq!(written[0].document, out.join("Snapshot_d.txt"));
    assert_eq!(written[0].records, 2);
    assert_eq!(written[1].document, out.join("Snapshot_sub.txt"));
    assert_eq!(written[1].records, 1);

    let root_str = root.display().to_string();
    assert_eq!(
        record_names(&out.join("Snapshot_d.txt")),
        vec![format!("{root_str}/a.txt"), format!("{root_str}/sub")]
    );
    assert_eq!(
        record_names(&out.join("Snapshot_sub.txt")),
        vec![format!("{root_str}/sub/b.txt")]
    );
}

#[test]
fn capture_twice_without_changes_is_stable() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path().join("d");
    create_dir(&root).expect("create d");
    for name in ["x", "y", "z"] {
        write(root.join(name), name.as_bytes()).expect("write");
    }

    let first_out = tmp.path().join("first");
    let second_out = tmp.path().join("second");
    let opts = TraverseOptions::default();
    capture(&root, &first_out, &opts, DocumentNaming::BaseName).expect("first capture");
    capture(&root, &second_out, &opts, DocumentNaming::BaseName).expect("second capture");

    let first = fs::read_to_string(first_out.join("Snapshot_d.txt")).expect("read first");
    let second = fs::read_to_string(second_out.join("Snapshot_d.txt")).expect("read second");

    // Enumeration order is not guaranteed, so compare record blocks as sets.
    let blocks = |doc: &str| {
        let mut b: Vec<String> = doc.split("\n\n").map(str::to_owned).collect();
        b.sort();
        b
    };
    assert_eq!(blocks(&first), blocks(&second));
}

#[test]
fn failed_traversal_writes_nothing() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let out = tmp.path().join("out");

    let err = capture(
        &tmp.path().join("missing"),
        &out,
        &TraverseOptions::default(),
        DocumentNaming::BaseName,
    )
    .expect_err("missing root");

    assert!(matches!(err, SnapshotError::Walk(_)));
    assert!(!out.exists());
}

#[test]
fn relative_path_naming_separates_same_named_subdirectories() {
    let tmp = tempfile::tempdir().expect("create temp dir");
    let root = tmp.path().join("d");
    let out = tmp.path().join("out");
    for sub in ["a/x", "b/x"] {
        fs::create_dir_all(root.join(sub)).expect("create subdir");
    }

    let (_, written) = capture(
        &root,
        &out,
        &TraverseOptions::default(),
        DocumentNaming::RelativePath,
    )
    .expect("capture");

    assert_eq!(written.len(), 5);
    assert!(out.join("Snapshot_d%2Fa%2Fx.txt").exists());
    assert!(out.join("Snapshot_d%2Fb%2Fx.txt").exists());
}

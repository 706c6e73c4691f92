use super::*;

fn write(path: &Path, content: &str) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

#[test]
fn test_paste_directory_copies_recursively() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    write(&a.join("file.txt"), "hello");
    write(&a.join("nested/deep.txt"), "deep");
    fs::create_dir(&b).unwrap();

    let report = paste(&[a.clone()], &b);

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.kind, FsOpKind::Paste);
    assert_eq!(report.target, b);
    assert_eq!(fs::read_to_string(b.join("a/file.txt")).unwrap(), "hello");
    assert_eq!(fs::read_to_string(b.join("a/nested/deep.txt")).unwrap(), "deep");
    assert_eq!(fs::read_to_string(a.join("file.txt")).unwrap(), "hello");
}

#[test]
fn test_paste_file_overwrites_existing() {
    let dir = tempfile::tempdir().unwrap();
    let src = dir.path().join("note.txt");
    let target = dir.path().join("out");
    write(&src, "new");
    write(&target.join("note.txt"), "old");

    let report = paste(&[src], &target);

    assert!(report.is_success());
    assert_eq!(report.completed, 1);
    assert_eq!(fs::read_to_string(target.join("note.txt")).unwrap(), "new");
}

#[test]
fn test_paste_missing_source_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let present = dir.path().join("present.txt");
    let missing = dir.path().join("missing.txt");
    let target = dir.path().join("out");
    write(&present, "x");
    fs::create_dir(&target).unwrap();

    let report = paste(&[missing.clone(), present], &target);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, missing);
    assert!(report.failures[0].error.is_not_found());
    assert!(target.join("present.txt").exists());
}

#[test]
fn test_paste_into_own_descendant_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    write(&a.join("sub/f.txt"), "f");

    let report = paste(&[a.clone()], &a.join("sub"));
    assert_eq!(report.failures.len(), 1);
    assert!(!a.join("sub/a").exists());

    let report = paste(&[a.clone()], &a);
    assert_eq!(report.failures.len(), 1);
    assert!(!a.join("a").exists());
}

#[cfg(unix)]
#[test]
fn test_paste_breaks_symlink_cycles() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    write(&a.join("f.txt"), "f");
    std::os::unix::fs::symlink(&a, a.join("loop")).unwrap();
    let target = dir.path().join("out");
    fs::create_dir(&target).unwrap();

    let report = paste(&[a], &target);

    assert!(report.is_success(), "{:?}", report.failures);
    assert!(target.join("a/f.txt").exists());
    assert!(!target.join("a/loop/f.txt").exists());
}

#[test]
fn test_delete_removes_tree() {
    let dir = tempfile::tempdir().unwrap();
    let victim = dir.path().join("victim");
    write(&victim.join("a.txt"), "a");
    write(&victim.join("sub/b.txt"), "b");
    fs::create_dir_all(victim.join("sub/empty")).unwrap();

    let report = delete_recursive(&victim);

    assert!(report.is_success(), "{:?}", report.failures);
    assert_eq!(report.kind, FsOpKind::Delete);
    assert_eq!(report.completed, 5);
    assert!(!victim.exists());
    assert!(dir.path().exists());
}

#[test]
fn test_delete_single_file() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("one.txt");
    write(&file, "1");

    let report = delete_recursive(&file);

    assert!(report.is_success());
    assert!(!file.exists());
}

#[test]
fn test_delete_missing_path_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let report = delete_recursive(&dir.path().join("nothing"));

    assert_eq!(report.failures.len(), 1);
    assert!(report.failures[0].error.is_not_found());
}

#[cfg(unix)]
#[test]
fn test_delete_does_not_follow_symlinks() {
    let dir = tempfile::tempdir().unwrap();
    let keep = dir.path().join("keep");
    write(&keep.join("precious.txt"), "p");
    let victim = dir.path().join("victim");
    fs::create_dir(&victim).unwrap();
    std::os::unix::fs::symlink(&keep, victim.join("link")).unwrap();

    let report = delete_recursive(&victim);

    assert!(report.is_success(), "{:?}", report.failures);
    assert!(!victim.exists());
    assert!(keep.join("precious.txt").exists());
}

#[test]
fn test_paste_file_into_own_directory_keeps_content() {
    let dir = tempfile::tempdir().unwrap();
    let file = dir.path().join("data.txt");
    write(&file, "precious");

    let report = paste(&[file.clone()], dir.path());

    assert_eq!(report.completed, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, file);
    assert_eq!(fs::read_to_string(&file).unwrap(), "precious");
}

#[test]
fn test_paste_directory_into_own_parent_keeps_content() {
    let dir = tempfile::tempdir().unwrap();
    let a = dir.path().join("a");
    write(&a.join("f.txt"), "precious");
    write(&a.join("nested/g.txt"), "also precious");

    let report = paste(&[a.clone()], dir.path());

    assert_eq!(report.completed, 0);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(fs::read_to_string(a.join("f.txt")).unwrap(), "precious");
    assert_eq!(
        fs::read_to_string(a.join("nested/g.txt")).unwrap(),
        "also precious"
    );
}

#[cfg(unix)]
#[test]
fn test_paste_through_hard_link_keeps_content() {
    let dir = tempfile::tempdir().unwrap();
    let original = dir.path().join("src/note.txt");
    let target = dir.path().join("out");
    write(&original, "precious");
    fs::create_dir(&target).unwrap();
    fs::hard_link(&original, target.join("note.txt")).unwrap();

    let report = paste(&[original.clone()], &target);

    assert_eq!(report.failures.len(), 1);
    assert_eq!(fs::read_to_string(&original).unwrap(), "precious");
}

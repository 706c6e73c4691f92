//! Paste and delete batches over explicit worklists.
//!
//! Per-item failures are collected into the report and the batch carries on.

use crate::kernel::services::ports::file::{FileError, FsOpKind, FsOpReport};
use rustc_hash::FxHashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Copies every source into `target`, overwriting existing files.
pub fn paste(sources: &[PathBuf], target: &Path) -> FsOpReport {
    let mut report = FsOpReport::new(FsOpKind::Paste, target.to_path_buf());
    for source in sources {
        copy_into(source, target, &mut report);
    }
    tracing::info!(
        target_dir = %target.display(),
        completed = report.completed,
        failed = report.failures.len(),
        "paste finished"
    );
    report
}

/// Copies `source` to `target/<name of source>`. Directories are copied
/// recursively; a directory is never copied into itself or a descendant.
pub fn copy_into(source: &Path, target: &Path, report: &mut FsOpReport) {
    let Some(name) = source.file_name() else {
        report.fail(source, invalid_input(source, "source has no file name"));
        return;
    };
    let metadata = match fs::metadata(source) {
        Ok(metadata) => metadata,
        Err(e) => {
            report.fail(source, FileError::from_io(source, e));
            return;
        }
    };
    let destination = target.join(name);
    if is_same_file(source, &destination) {
        report.fail(
            source,
            invalid_input(source, "source and destination are the same"),
        );
        return;
    }

    if !metadata.is_dir() {
        copy_file(source, &destination, report);
        return;
    }

    let source_canonical = match fs::canonicalize(source) {
        Ok(path) => path,
        Err(e) => {
            report.fail(source, FileError::from_io(source, e));
            return;
        }
    };
    let target_canonical = fs::canonicalize(target).unwrap_or_else(|_| target.to_path_buf());
    if target_canonical.starts_with(&source_canonical) {
        report.fail(
            source,
            invalid_input(source, "cannot copy a directory into itself"),
        );
        return;
    }

    copy_dir(source, &destination, report);
}

fn copy_dir(source: &Path, destination: &Path, report: &mut FsOpReport) {
    let mut visited: FxHashSet<PathBuf> = FxHashSet::default();
    let mut pending = vec![(source.to_path_buf(), destination.to_path_buf())];

    while let Some((src, dst)) = pending.pop() {
        match fs::canonicalize(&src) {
            Ok(canonical) => {
                if !visited.insert(canonical) {
                    tracing::debug!(path = %src.display(), "skipping directory cycle");
                    continue;
                }
            }
            Err(e) => {
                report.fail(&src, FileError::from_io(&src, e));
                continue;
            }
        }

        if let Err(e) = fs::create_dir_all(&dst) {
            report.fail(&src, FileError::from_io(&dst, e));
            continue;
        }
        report.completed += 1;

        let entries = match fs::read_dir(&src) {
            Ok(entries) => entries,
            Err(e) => {
                report.fail(&src, FileError::from_io(&src, e));
                continue;
            }
        };
        for entry in entries {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    report.fail(&src, FileError::from_io(&src, e));
                    continue;
                }
            };
            let child = entry.path();
            let child_dst = dst.join(entry.file_name());
            match fs::metadata(&child) {
                Ok(metadata) if metadata.is_dir() => pending.push((child, child_dst)),
                Ok(_) => copy_file(&child, &child_dst, report),
                Err(e) => report.fail(&child, FileError::from_io(&child, e)),
            }
        }
    }
}

/// Copies one file, refusing to copy it onto itself.
fn copy_file(source: &Path, destination: &Path, report: &mut FsOpReport) {
    if is_same_file(source, destination) {
        report.fail(
            source,
            invalid_input(source, "source and destination are the same"),
        );
        return;
    }
    match fs::copy(source, destination) {
        Ok(_) => report.completed += 1,
        Err(e) => report.fail(source, FileError::from_io(destination, e)),
    }
}

#[cfg(unix)]
fn is_same_file(a: &Path, b: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    match (fs::metadata(a), fs::metadata(b)) {
        (Ok(a), Ok(b)) => a.dev() == b.dev() && a.ino() == b.ino(),
        _ => false,
    }
}

#[cfg(not(unix))]
fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

enum Visit {
    Enter(PathBuf),
    Leave(PathBuf),
}

/// Deletes `path` and everything below it. Symbolic links are unlinked,
/// never followed.
pub fn delete_recursive(path: &Path) -> FsOpReport {
    let mut report = FsOpReport::new(FsOpKind::Delete, path.to_path_buf());
    let mut pending = vec![Visit::Enter(path.to_path_buf())];

    while let Some(visit) = pending.pop() {
        match visit {
            Visit::Enter(current) => {
                let metadata = match fs::symlink_metadata(&current) {
                    Ok(metadata) => metadata,
                    Err(e) => {
                        report.fail(&current, FileError::from_io(&current, e));
                        continue;
                    }
                };
                if !metadata.is_dir() {
                    match remove_entry(&current) {
                        Ok(()) => report.completed += 1,
                        Err(e) => report.fail(&current, FileError::from_io(&current, e)),
                    }
                    continue;
                }

                let entries = match fs::read_dir(&current) {
                    Ok(entries) => entries,
                    Err(e) => {
                        report.fail(&current, FileError::from_io(&current, e));
                        continue;
                    }
                };
                pending.push(Visit::Leave(current.clone()));
                for entry in entries {
                    match entry {
                        Ok(entry) => pending.push(Visit::Enter(entry.path())),
                        Err(e) => report.fail(&current, FileError::from_io(&current, e)),
                    }
                }
            }
            Visit::Leave(dir) => match fs::remove_dir(&dir) {
                Ok(()) => report.completed += 1,
                Err(e) => report.fail(&dir, FileError::from_io(&dir, e)),
            },
        }
    }

    tracing::info!(
        path = %path.display(),
        completed = report.completed,
        failed = report.failures.len(),
        "delete finished"
    );
    report
}

#[cfg(windows)]
fn remove_entry(path: &Path) -> io::Result<()> {
    // Directory symlinks and junctions need remove_dir on Windows.
    fs::remove_file(path).or_else(|_| fs::remove_dir(path))
}

#[cfg(not(windows))]
fn remove_entry(path: &Path) -> io::Result<()> {
    fs::remove_file(path)
}

fn invalid_input(path: &Path, message: &str) -> FileError {
    FileError::Io {
        path: path.to_path_buf(),
        source: io::Error::new(io::ErrorKind::InvalidInput, message.to_string()),
    }
}

#[cfg(test)]
#[path = "../../../../../tests/unit/kernel/services/adapters/file_ops.rs"]
mod tests;

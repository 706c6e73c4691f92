//! Directory listing port.
//!
//! Abstracts how a directory's immediate children are enumerated so the
//! controller can be driven by the local filesystem or by a test double.

use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FileError {
    #[error("not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("access denied: {}", .0.display())]
    AccessDenied(PathBuf),
    #[error("io error at {}: {source}", .path.display())]
    Io { path: PathBuf, source: io::Error },
}

impl FileError {
    pub fn from_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        let path = path.into();
        match err.kind() {
            io::ErrorKind::NotFound => FileError::NotFound(path),
            io::ErrorKind::PermissionDenied => FileError::AccessDenied(path),
            _ => FileError::Io { path, source: err },
        }
    }

    pub fn path(&self) -> &Path {
        match self {
            FileError::NotFound(path) | FileError::AccessDenied(path) => path,
            FileError::Io { path, .. } => path,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, FileError::NotFound(_))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntryKind {
    Directory,
    File,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub name: String,
    pub path: PathBuf,
    pub kind: EntryKind,
}

#[derive(Debug)]
pub enum Listing {
    /// Directories first, then files.
    Entries(Vec<DirEntry>),
    /// The path is gone or is no longer a directory.
    NotFound,
    Faulted(FileError),
}

pub trait DirectoryLoader: Send + Sync {
    fn list(&self, path: &Path, include_hidden: bool) -> Listing;

    /// Drive roots to seed a fresh tree with.
    fn roots(&self) -> Vec<PathBuf>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FsOpKind {
    Paste,
    Delete,
}

#[derive(Debug)]
pub struct FsOpFailure {
    pub path: PathBuf,
    pub error: FileError,
}

/// Result of one paste or delete batch. Failed items do not stop the batch.
#[derive(Debug)]
pub struct FsOpReport {
    pub kind: FsOpKind,
    /// Paste destination, or the deleted path.
    pub target: PathBuf,
    pub completed: usize,
    pub failures: Vec<FsOpFailure>,
}

impl FsOpReport {
    pub fn new(kind: FsOpKind, target: PathBuf) -> Self {
        Self {
            kind,
            target,
            completed: 0,
            failures: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub(crate) fn fail(&mut self, path: &Path, error: FileError) {
        self.failures.push(FsOpFailure {
            path: path.to_path_buf(),
            error,
        });
    }
}

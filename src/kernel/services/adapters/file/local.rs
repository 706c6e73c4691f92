//! 本地文件系统目录枚举
//!
//! 实现 DirectoryLoader trait：目录在前，文件在后，组内保持 read_dir 原始顺序

use crate::kernel::services::ports::file::{
    DirEntry, DirectoryLoader, EntryKind, FileError, Listing,
};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct LocalDirectoryLoader;

impl LocalDirectoryLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for LocalDirectoryLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DirectoryLoader for LocalDirectoryLoader {
    fn list(&self, path: &Path, include_hidden: bool) -> Listing {
        match fs::metadata(path) {
            Ok(metadata) if metadata.is_dir() => {}
            Ok(_) => return Listing::NotFound,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Listing::NotFound,
            Err(e) => return faulted(path, e),
        }

        let read_dir = match fs::read_dir(path) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Listing::NotFound,
            Err(e) => return faulted(path, e),
        };

        let mut dirs = Vec::new();
        let mut files = Vec::new();
        for entry in read_dir {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                    continue;
                }
            };
            let entry_path = entry.path();
            if !include_hidden && is_hidden(&entry) {
                continue;
            }

            // Follows symlinks so a link to a directory lists as a directory.
            let metadata = match fs::metadata(&entry_path) {
                Ok(metadata) => metadata,
                Err(e) => {
                    tracing::debug!(
                        path = %entry_path.display(),
                        error = %e,
                        "skipping entry without metadata"
                    );
                    continue;
                }
            };

            let name = entry.file_name().to_string_lossy().into_owned();
            if metadata.is_dir() {
                dirs.push(DirEntry {
                    name,
                    path: entry_path,
                    kind: EntryKind::Directory,
                });
            } else {
                files.push(DirEntry {
                    name,
                    path: entry_path,
                    kind: EntryKind::File,
                });
            }
        }

        dirs.extend(files);
        Listing::Entries(dirs)
    }

    fn roots(&self) -> Vec<PathBuf> {
        drive_roots()
    }
}

fn faulted(path: &Path, e: io::Error) -> Listing {
    let error = FileError::from_io(path, e);
    tracing::warn!(error = %error, "directory listing faulted");
    Listing::Faulted(error)
}

#[cfg(windows)]
fn is_hidden(entry: &fs::DirEntry) -> bool {
    use std::os::windows::fs::MetadataExt;
    const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;

    if entry.file_name().to_string_lossy().starts_with('.') {
        return true;
    }
    entry
        .metadata()
        .map(|m| m.file_attributes() & FILE_ATTRIBUTE_HIDDEN != 0)
        .unwrap_or(false)
}

#[cfg(not(windows))]
fn is_hidden(entry: &fs::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

#[cfg(windows)]
fn drive_roots() -> Vec<PathBuf> {
    (b'A'..=b'Z')
        .map(|letter| PathBuf::from(format!("{}:\\", letter as char)))
        .filter(|root| root.exists())
        .collect()
}

#[cfg(not(windows))]
fn drive_roots() -> Vec<PathBuf> {
    vec![PathBuf::from("/")]
}

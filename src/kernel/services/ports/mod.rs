//! Service ports: traits + data contracts.

pub mod clipboard;
pub mod file;
pub mod launcher;
pub mod runtime;
pub mod settings;

pub use clipboard::FileClipboard;
pub use file::{
    DirEntry, DirectoryLoader, EntryKind, FileError, FsOpFailure, FsOpKind, FsOpReport, Listing,
};
pub use launcher::ProcessLauncher;
pub use runtime::{AsyncExecutor, BlockingJob};
pub use settings::Settings;

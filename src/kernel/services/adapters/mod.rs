//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod clipboard;
pub mod data_dir;
pub mod file;
pub mod file_watcher;
pub mod launcher;
pub mod runtime;
pub mod settings;

pub use clipboard::MemoryClipboard;
pub use data_dir::{ensure_log_dir, get_log_dir};
pub use file::LocalDirectoryLoader;
pub use file_watcher::{WatchError, WatchManager};
pub use launcher::SystemLauncher;
pub use runtime::{AsyncRuntime, InlineExecutor};
pub use settings::{ensure_settings_file, get_settings_path, load_settings, load_settings_from};

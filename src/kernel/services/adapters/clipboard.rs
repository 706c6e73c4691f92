//! 剪贴板服务
//!
//! 进程内的文件引用列表，复制/粘贴节点时使用

use crate::kernel::services::ports::FileClipboard;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

#[derive(Clone, Default)]
pub struct MemoryClipboard {
    files: Arc<Mutex<Option<Vec<PathBuf>>>>,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// The store shared by every controller in this process.
    pub fn global() -> Self {
        static GLOBAL: OnceLock<MemoryClipboard> = OnceLock::new();
        GLOBAL.get_or_init(MemoryClipboard::new).clone()
    }

    pub fn clear(&self) {
        *self.lock() = None;
    }

    fn lock(&self) -> MutexGuard<'_, Option<Vec<PathBuf>>> {
        self.files.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl FileClipboard for MemoryClipboard {
    fn set_file_list(&self, paths: Vec<PathBuf>) {
        *self.lock() = Some(paths);
    }

    fn file_list(&self) -> Option<Vec<PathBuf>> {
        self.lock().clone()
    }
}

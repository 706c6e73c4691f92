use std::path::PathBuf;

/// Process-wide store for a list of file references.
pub trait FileClipboard: Send + Sync {
    /// Replaces whatever list was stored before.
    fn set_file_list(&self, paths: Vec<PathBuf>);

    fn file_list(&self) -> Option<Vec<PathBuf>>;

    fn has_file_list(&self) -> bool {
        self.file_list().is_some_and(|paths| !paths.is_empty())
    }
}

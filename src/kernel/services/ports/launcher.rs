use std::io;
use std::path::Path;

pub trait ProcessLauncher: Send + Sync {
    /// Starts the program without waiting for it.
    fn launch(&self, program: &Path) -> io::Result<()>;
}

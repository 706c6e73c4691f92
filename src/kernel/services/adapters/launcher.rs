use crate::kernel::services::ports::ProcessLauncher;
use std::io;
use std::path::Path;
use std::process::{Command, Stdio};

/// Starts programs as detached child processes.
#[derive(Default)]
pub struct SystemLauncher;

impl SystemLauncher {
    pub fn new() -> Self {
        Self
    }
}

impl ProcessLauncher for SystemLauncher {
    fn launch(&self, program: &Path) -> io::Result<()> {
        let mut command = Command::new(program);
        if let Some(dir) = program.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            command.current_dir(dir);
        }
        let mut child = command
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        let pid = child.id();
        tracing::info!(program = %program.display(), pid, "program started");

        // Reap the child so it does not linger as a zombie.
        let reaper = std::thread::Builder::new()
            .name(format!("treedit-reap-{pid}"))
            .spawn(move || match child.wait() {
                Ok(status) => tracing::debug!(pid, %status, "program exited"),
                Err(e) => tracing::debug!(pid, error = %e, "failed to wait for program"),
            });
        if let Err(e) = reaper {
            tracing::warn!(pid, error = %e, "failed to start reaper thread");
        }
        Ok(())
    }
}

use crate::kernel::services::bus::KernelBusSender;
use crate::models::WatchHandle;
use notify::event::ModifyKind;
use notify::{Config, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("failed to watch {}: {source}", .path.display())]
    Notify {
        path: PathBuf,
        source: notify::Error,
    },
}

struct WatchEntry {
    handle: WatchHandle,
    canonical: PathBuf,
    /// Nodes currently holding this watch.
    holders: usize,
}

/// Non-recursive per-directory watches sharing one notify backend.
///
/// Several nodes may show the same directory; each `subscribe` adds a holder
/// and the backend watch is dropped when the last holder unsubscribes.
///
/// The notify callback only forwards `KernelMessage::Reload` for the parent
/// of every changed path (and the path itself); the owner of the bus decides
/// which of those are subscribed via [`WatchManager::resolve`].
pub struct WatchManager {
    bus: KernelBusSender,
    watcher: Option<RecommendedWatcher>,
    watches: FxHashMap<PathBuf, WatchEntry>,
    by_canonical: FxHashMap<PathBuf, PathBuf>,
    next_generation: u64,
}

impl WatchManager {
    pub fn new(bus: KernelBusSender) -> Self {
        Self {
            bus,
            watcher: None,
            watches: FxHashMap::default(),
            by_canonical: FxHashMap::default(),
            next_generation: 0,
        }
    }

    /// Starts watching `path`, or adds a holder to the existing watch and
    /// returns its handle.
    pub fn subscribe(&mut self, path: &Path) -> Result<WatchHandle, WatchError> {
        if let Some(entry) = self.watches.get_mut(path) {
            entry.holders += 1;
            return Ok(entry.handle);
        }

        let notify_error = |source| WatchError::Notify {
            path: path.to_path_buf(),
            source,
        };
        if self.watcher.is_none() {
            self.watcher = Some(self.create_watcher().map_err(notify_error)?);
        }
        let Some(watcher) = self.watcher.as_mut() else {
            return Err(notify_error(notify::Error::generic("watcher unavailable")));
        };
        watcher
            .watch(path, RecursiveMode::NonRecursive)
            .map_err(notify_error)?;

        self.next_generation += 1;
        let handle = WatchHandle::new(self.next_generation);
        let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());
        self.by_canonical.insert(canonical.clone(), path.to_path_buf());
        self.watches.insert(
            path.to_path_buf(),
            WatchEntry {
                handle,
                canonical,
                holders: 1,
            },
        );
        tracing::debug!(path = %path.display(), "watch subscribed");
        Ok(handle)
    }

    /// Drops one holder of the watch on `path`, releasing the backend watch
    /// with the last one. Returns false if there was no watch.
    pub fn unsubscribe(&mut self, path: &Path) -> bool {
        match self.watches.get_mut(path) {
            None => return false,
            Some(entry) if entry.holders > 1 => {
                entry.holders -= 1;
                return true;
            }
            Some(_) => {}
        }
        let Some(entry) = self.watches.remove(path) else {
            return false;
        };
        if self.by_canonical.get(&entry.canonical).map(PathBuf::as_path) == Some(path) {
            self.by_canonical.remove(&entry.canonical);
        }
        if let Some(watcher) = self.watcher.as_mut() {
            if let Err(e) = watcher.unwatch(path) {
                tracing::debug!(path = %path.display(), error = %e, "unwatch failed");
            }
        }
        tracing::debug!(path = %path.display(), "watch released");
        true
    }

    pub fn is_subscribed(&self, path: &Path) -> bool {
        self.watches.contains_key(path)
    }

    pub fn handle(&self, path: &Path) -> Option<WatchHandle> {
        self.watches.get(path).map(|entry| entry.handle)
    }

    pub fn holders(&self, path: &Path) -> usize {
        self.watches.get(path).map_or(0, |entry| entry.holders)
    }

    /// Maps a path reported by the backend to the subscribed path it
    /// belongs to, accounting for backends that report canonical paths.
    pub fn resolve(&self, reported: &Path) -> Option<PathBuf> {
        if self.watches.contains_key(reported) {
            return Some(reported.to_path_buf());
        }
        self.by_canonical.get(reported).cloned()
    }

    pub fn len(&self) -> usize {
        self.watches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.watches.is_empty()
    }

    pub fn watched_paths(&self) -> Vec<PathBuf> {
        self.watches.keys().cloned().collect()
    }

    /// Releases every watch and stops the backend.
    pub fn shutdown_all(&mut self) {
        let count = self.watches.len();
        self.watches.clear();
        self.by_canonical.clear();
        // Dropping the watcher unregisters all of its paths.
        self.watcher = None;
        if count > 0 {
            tracing::debug!(count, "all watches released");
        }
    }

    fn create_watcher(&self) -> Result<RecommendedWatcher, notify::Error> {
        let bus = self.bus.clone();
        RecommendedWatcher::new(
            move |res: Result<notify::Event, notify::Error>| {
                let event = match res {
                    Ok(event) => event,
                    Err(e) => {
                        tracing::debug!(error = %e, "watch backend error");
                        return;
                    }
                };
                if !is_structural(&event.kind) {
                    return;
                }
                for path in reload_candidates(event.paths) {
                    let _ = bus.send_reload(path);
                }
            },
            Config::default(),
        )
    }
}

impl Drop for WatchManager {
    fn drop(&mut self) {
        self.shutdown_all();
    }
}

/// Create, remove and rename events change a directory's listing; content
/// and metadata changes do not.
fn is_structural(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_)
            | EventKind::Remove(_)
            | EventKind::Modify(ModifyKind::Name(_))
            | EventKind::Any
    )
}

fn reload_candidates(paths: Vec<PathBuf>) -> Vec<PathBuf> {
    let mut out: Vec<PathBuf> = Vec::with_capacity(paths.len() * 2);
    for path in paths {
        if let Some(parent) = path.parent() {
            if !out.iter().any(|p| p == parent) {
                out.push(parent.to_path_buf());
            }
        }
        if !out.contains(&path) {
            out.push(path);
        }
    }
    out
}

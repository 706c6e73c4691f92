//! The tree owner.
//!
//! `TreeController` is the only place the node tree is mutated. Host actions
//! come in through [`TreeController::dispatch`]; watch notifications and
//! finished file operations come in through the kernel bus and are applied in
//! [`TreeController::pump`] / [`TreeController::wait_and_pump`].

use rustc_hash::FxHashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{RecvTimeoutError, TryRecvError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;

use crate::kernel::action::{Action, ContextAction};
use crate::kernel::services::adapters::file::ops;
use crate::kernel::services::adapters::{
    InlineExecutor, LocalDirectoryLoader, MemoryClipboard, SystemLauncher, WatchManager,
};
use crate::kernel::services::bus::{kernel_bus, KernelBusReceiver, KernelBusSender, KernelMessage};
use crate::kernel::services::ports::{
    AsyncExecutor, DirectoryLoader, EntryKind, FileClipboard, FileError, FsOpKind, FsOpReport,
    Listing, ProcessLauncher, Settings,
};
use crate::models::tree_document::{self, DocumentError};
use crate::models::{ChildSpec, FileTreeError, LoadState, NodeId, NodeKind, NodeTree};

pub const UNTITLED_DOCUMENT: &str = "Untitled";

#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("node does not exist or has no path")]
    InvalidNode,
    #[error(transparent)]
    Document(#[from] DocumentError),
    #[error("no document path to save to")]
    NoDocumentPath,
    #[error(transparent)]
    Tree(#[from] FileTreeError),
    #[error("failed to launch {}: {source}", .path.display())]
    Launch { path: PathBuf, source: io::Error },
}

#[derive(Debug)]
pub enum ReloadOutcome {
    Reloaded,
    /// The directory vanished and its node was removed.
    Removed,
    /// Listing faulted; the node now shows no children.
    Inaccessible(FileError),
}

#[derive(Debug, Default)]
pub struct DispatchResult {
    pub state_changed: bool,
    pub reload: Option<ReloadOutcome>,
}

impl DispatchResult {
    fn changed(state_changed: bool) -> Self {
        Self {
            state_changed,
            reload: None,
        }
    }
}

/// What one drain of the kernel bus did to the tree.
#[derive(Debug, Default)]
pub struct PumpReport {
    pub reloaded: Vec<PathBuf>,
    pub removed: Vec<PathBuf>,
    pub faults: Vec<FileError>,
    pub completed: Vec<FsOpReport>,
}

impl PumpReport {
    pub fn is_empty(&self) -> bool {
        self.reloaded.is_empty()
            && self.removed.is_empty()
            && self.faults.is_empty()
            && self.completed.is_empty()
    }

    pub fn tree_changed(&self) -> bool {
        !self.reloaded.is_empty() || !self.removed.is_empty() || !self.faults.is_empty()
    }
}

pub struct TreeController {
    settings: Settings,
    tree: NodeTree,
    watches: WatchManager,
    bus: KernelBusSender,
    rx: KernelBusReceiver,
    loader: Arc<dyn DirectoryLoader>,
    clipboard: Arc<dyn FileClipboard>,
    launcher: Arc<dyn ProcessLauncher>,
    executor: Arc<dyn AsyncExecutor>,
    document_path: Option<PathBuf>,
}

impl TreeController {
    pub fn new(settings: Settings) -> Self {
        let (bus, rx) = kernel_bus();
        Self {
            settings,
            tree: NodeTree::new(),
            watches: WatchManager::new(bus.clone()),
            bus,
            rx,
            loader: Arc::new(LocalDirectoryLoader::new()),
            clipboard: Arc::new(MemoryClipboard::global()),
            launcher: Arc::new(SystemLauncher::new()),
            executor: Arc::new(InlineExecutor),
            document_path: None,
        }
    }

    pub fn with_loader(mut self, loader: Arc<dyn DirectoryLoader>) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_clipboard(mut self, clipboard: Arc<dyn FileClipboard>) -> Self {
        self.clipboard = clipboard;
        self
    }

    pub fn with_launcher(mut self, launcher: Arc<dyn ProcessLauncher>) -> Self {
        self.launcher = launcher;
        self
    }

    pub fn with_executor(mut self, executor: Arc<dyn AsyncExecutor>) -> Self {
        self.executor = executor;
        self
    }

    pub fn tree(&self) -> &NodeTree {
        &self.tree
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn watches(&self) -> &WatchManager {
        &self.watches
    }

    /// Sender for producers that want to post onto this controller's bus.
    pub fn bus(&self) -> KernelBusSender {
        self.bus.clone()
    }

    pub fn document_path(&self) -> Option<&Path> {
        self.document_path.as_deref()
    }

    pub fn document_title(&self) -> String {
        self.document_path
            .as_deref()
            .and_then(Path::file_name)
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| UNTITLED_DOCUMENT.to_string())
    }

    pub fn dispatch(&mut self, action: Action) -> Result<DispatchResult, ControllerError> {
        match action {
            Action::LoadDrives => Ok(DispatchResult::changed(!self.load_drives().is_empty())),
            Action::Expand(id) => {
                let reload = self.expand(id)?;
                Ok(DispatchResult {
                    state_changed: true,
                    reload,
                })
            }
            Action::Collapse(id) => Ok(DispatchResult::changed(self.collapse(id)?)),
            Action::Select(id) => {
                self.select(id)?;
                Ok(DispatchResult::changed(true))
            }
            Action::Context { node, action } => match action {
                ContextAction::Refresh => {
                    let outcome = self.refresh(node)?;
                    Ok(DispatchResult {
                        state_changed: true,
                        reload: Some(outcome),
                    })
                }
                ContextAction::Run => {
                    self.run(node)?;
                    Ok(DispatchResult::changed(false))
                }
                ContextAction::Copy => {
                    self.copy(node)?;
                    Ok(DispatchResult::changed(false))
                }
                ContextAction::Paste => {
                    self.paste(node)?;
                    Ok(DispatchResult::changed(false))
                }
                ContextAction::Delete => Ok(DispatchResult::changed(self.delete(node)?)),
            },
            Action::SetShowHidden(show) => Ok(DispatchResult::changed(self.set_show_hidden(show))),
            Action::OpenDocument(path) => {
                self.load_document(&path)?;
                Ok(DispatchResult::changed(true))
            }
            Action::SaveDocument(path) => {
                self.save_document(path.as_deref())?;
                Ok(DispatchResult::changed(false))
            }
        }
    }

    /// Menu entries that apply to `id`. Refresh is only offered for nodes
    /// that can hold children.
    pub fn context_actions(&self, id: NodeId) -> Vec<ContextAction> {
        let Some(kind) = self.tree.kind(id) else {
            return Vec::new();
        };
        if kind == NodeKind::Placeholder {
            return Vec::new();
        }
        let mut actions = Vec::with_capacity(5);
        if kind.is_container() {
            actions.push(ContextAction::Refresh);
        }
        actions.extend([
            ContextAction::Run,
            ContextAction::Copy,
            ContextAction::Paste,
            ContextAction::Delete,
        ]);
        actions
    }

    pub fn load_drives(&mut self) -> Vec<NodeId> {
        self.loader
            .roots()
            .into_iter()
            .map(|root| self.tree.add_root(root))
            .collect()
    }

    pub fn add_root(&mut self, path: impl Into<PathBuf>) -> NodeId {
        self.tree.add_root(path.into())
    }

    /// Expands `id`, materializing it first when it was never loaded or has
    /// gone unwatched since it was last shown. Returns the reload outcome if
    /// a reload happened.
    pub fn expand(&mut self, id: NodeId) -> Result<Option<ReloadOutcome>, ControllerError> {
        let node = self.tree.get(id).ok_or(ControllerError::InvalidNode)?;
        match node.kind() {
            NodeKind::Placeholder => return Ok(None),
            NodeKind::File => {
                let is_dir = node.path().is_some_and(Path::is_dir);
                if !is_dir {
                    return Ok(None);
                }
                self.tree.promote_to_directory(id)?;
            }
            NodeKind::Root | NodeKind::Directory => {}
        }

        self.tree.expand(id);
        let Some(node) = self.tree.get(id) else {
            return Err(ControllerError::InvalidNode);
        };
        if node.path().is_none() {
            return Ok(None);
        }

        let mut outcome = None;
        if !node.is_materialized() || node.watch().is_none() {
            let reloaded = self.reload_node(id)?;
            if matches!(reloaded, ReloadOutcome::Removed) {
                return Ok(Some(reloaded));
            }
            outcome = Some(reloaded);
        }
        self.subscribe(id);
        tracing::debug!(path = ?self.tree.path(id), "expanded");
        Ok(outcome)
    }

    /// Collapses `id` and stops watching it and everything below it.
    pub fn collapse(&mut self, id: NodeId) -> Result<bool, ControllerError> {
        if !self.tree.contains(id) {
            return Err(ControllerError::InvalidNode);
        }
        let was_expanded = self.tree.is_expanded(id);
        let released = self.tree.collapse(id);
        self.release(&released);
        tracing::debug!(path = ?self.tree.path(id), released = released.len(), "collapsed");
        Ok(was_expanded)
    }

    pub fn select(&mut self, id: NodeId) -> Result<(), ControllerError> {
        if !self.tree.contains(id) {
            return Err(ControllerError::InvalidNode);
        }
        self.tree.set_selected(Some(id));
        Ok(())
    }

    /// Re-lists a directory node. The node keeps its watch.
    pub fn refresh(&mut self, id: NodeId) -> Result<ReloadOutcome, ControllerError> {
        let kind = self.tree.kind(id).ok_or(ControllerError::InvalidNode)?;
        if !kind.is_container() {
            return Err(FileTreeError::ParentNotDirectory.into());
        }
        self.reload_node(id)
    }

    /// Puts the node's path on the clipboard. Returns false if the path no
    /// longer exists.
    pub fn copy(&mut self, id: NodeId) -> Result<bool, ControllerError> {
        let path = self.node_path(id)?;
        if !path.exists() {
            return Ok(false);
        }
        tracing::debug!(path = %path.display(), "copied to clipboard");
        self.clipboard.set_file_list(vec![path]);
        Ok(true)
    }

    /// Copies the clipboard's file list into the node's directory. The work
    /// runs on the executor; the result arrives as `FsOpCompleted`.
    pub fn paste(&mut self, id: NodeId) -> Result<bool, ControllerError> {
        let kind = self.tree.kind(id).ok_or(ControllerError::InvalidNode)?;
        if !kind.is_container() {
            return Ok(false);
        }
        let target = self.node_path(id)?;
        let Some(sources) = self.clipboard.file_list().filter(|files| !files.is_empty()) else {
            return Ok(false);
        };

        let bus = self.bus.clone();
        self.executor.spawn_blocking(Box::new(move || {
            let report = ops::paste(&sources, &target);
            let _ = bus.send(KernelMessage::FsOpCompleted(report));
        }));
        Ok(true)
    }

    /// Removes the node (and its watches) right away, then deletes the path
    /// from disk on the executor.
    pub fn delete(&mut self, id: NodeId) -> Result<bool, ControllerError> {
        let path = self.node_path(id)?;
        let released = self.tree.remove(id)?;
        self.release(&released);

        let bus = self.bus.clone();
        self.executor.spawn_blocking(Box::new(move || {
            let report = ops::delete_recursive(&path);
            let _ = bus.send(KernelMessage::FsOpCompleted(report));
        }));
        Ok(true)
    }

    /// Starts the node's program if it is an executable file.
    pub fn run(&mut self, id: NodeId) -> Result<bool, ControllerError> {
        if self.tree.kind(id).ok_or(ControllerError::InvalidNode)? != NodeKind::File {
            return Ok(false);
        }
        let path = self.node_path(id)?;
        if !path.is_file() || !self.settings.is_executable(&path) {
            return Ok(false);
        }
        self.launcher
            .launch(&path)
            .map_err(|source| ControllerError::Launch { path, source })?;
        Ok(true)
    }

    /// Changes hidden-entry visibility and re-lists every expanded directory.
    pub fn set_show_hidden(&mut self, show: bool) -> bool {
        if self.settings.show_hidden == show {
            return false;
        }
        self.settings.show_hidden = show;

        let expanded: Vec<NodeId> = self
            .tree
            .roots()
            .to_vec()
            .into_iter()
            .flat_map(|root| self.tree.subtree(root))
            .filter(|&id| self.tree.is_expanded(id))
            .filter(|&id| self.tree.get(id).is_some_and(|n| n.is_materialized()))
            .collect();
        for id in expanded {
            if !self.tree.contains(id) {
                continue;
            }
            if let Err(e) = self.reload_node(id) {
                tracing::debug!(error = %e, "skipping reload after visibility change");
            }
        }
        true
    }

    /// Writes the tree to `path`, or to the current document when `None`.
    pub fn save_document(&mut self, path: Option<&Path>) -> Result<PathBuf, ControllerError> {
        let target = path
            .map(Path::to_path_buf)
            .or_else(|| self.document_path.clone())
            .ok_or(ControllerError::NoDocumentPath)?;
        tree_document::save_to_file(&target, &self.tree.outline())?;
        tracing::info!(path = %target.display(), "document saved");
        self.document_path = Some(target.clone());
        Ok(target)
    }

    /// Replaces the tree with a saved document. On failure nothing changes.
    pub fn load_document(&mut self, path: &Path) -> Result<(), ControllerError> {
        let outline = tree_document::load_from_file(path)?;
        self.tree.clear();
        self.watches.shutdown_all();
        self.tree = NodeTree::from_outline(&outline);
        self.document_path = Some(path.to_path_buf());
        tracing::info!(path = %path.display(), roots = outline.len(), "document loaded");
        Ok(())
    }

    /// Applies everything already queued on the bus without blocking.
    pub fn pump(&mut self) -> PumpReport {
        let mut messages = Vec::new();
        while let Ok(msg) = self.rx.try_recv() {
            messages.push(msg);
        }
        self.apply(messages)
    }

    /// Blocks up to `timeout` for the first message, then keeps collecting
    /// for the coalescing window before applying the batch.
    pub fn wait_and_pump(&mut self, timeout: Duration) -> PumpReport {
        let first = match self.rx.recv_timeout(timeout) {
            Ok(msg) => msg,
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => {
                return PumpReport::default();
            }
        };

        let mut messages = vec![first];
        let deadline = Instant::now() + Duration::from_millis(self.settings.reload_coalesce_ms);
        while let Some(left) = deadline.checked_duration_since(Instant::now()) {
            match self.rx.recv_timeout(left) {
                Ok(msg) => messages.push(msg),
                Err(_) => break,
            }
        }
        loop {
            match self.rx.try_recv() {
                Ok(msg) => messages.push(msg),
                Err(TryRecvError::Empty) | Err(TryRecvError::Disconnected) => break,
            }
        }
        self.apply(messages)
    }

    /// Releases every watch. Nodes stay in the tree.
    pub fn shutdown(&mut self) {
        let ids: Vec<NodeId> = self
            .tree
            .roots()
            .to_vec()
            .into_iter()
            .flat_map(|root| self.tree.subtree(root))
            .collect();
        for id in ids {
            self.tree.set_watch(id, None);
        }
        self.watches.shutdown_all();
    }

    fn apply(&mut self, messages: Vec<KernelMessage>) -> PumpReport {
        let mut report = PumpReport::default();
        let mut seen: FxHashSet<PathBuf> = FxHashSet::default();
        let mut pending: Vec<PathBuf> = Vec::new();

        for msg in messages {
            match msg {
                KernelMessage::Reload(reported) => {
                    let Some(watched) = self.watches.resolve(&reported) else {
                        continue;
                    };
                    if seen.insert(watched.clone()) {
                        pending.push(watched);
                    }
                }
                KernelMessage::FsOpCompleted(op) => {
                    for failure in &op.failures {
                        tracing::warn!(
                            path = %failure.path.display(),
                            error = %failure.error,
                            "file operation item failed"
                        );
                    }
                    let refresh = match op.kind {
                        FsOpKind::Paste => Some(op.target.clone()),
                        FsOpKind::Delete => op.target.parent().map(Path::to_path_buf),
                    };
                    if let Some(path) = refresh {
                        if seen.insert(path.clone()) {
                            pending.push(path);
                        }
                    }
                    report.completed.push(op);
                }
            }
        }

        for path in pending {
            let mut reloaded = false;
            let mut removed = false;
            let ids = self.tree.find_all_by_path(&path).to_vec();
            for id in ids {
                let Some(node) = self.tree.get(id) else {
                    continue;
                };
                if !node.kind().is_container() || !node.is_materialized() {
                    continue;
                }
                match self.reload_node(id) {
                    Ok(ReloadOutcome::Reloaded) => reloaded = true,
                    Ok(ReloadOutcome::Removed) => removed = true,
                    Ok(ReloadOutcome::Inaccessible(e)) => report.faults.push(e),
                    Err(e) => {
                        tracing::debug!(path = %path.display(), error = %e, "reload skipped")
                    }
                }
            }
            if reloaded {
                report.reloaded.push(path.clone());
            }
            if removed {
                report.removed.push(path);
            }
        }
        report
    }

    fn reload_node(&mut self, id: NodeId) -> Result<ReloadOutcome, ControllerError> {
        let path = self.node_path(id)?;
        self.tree.set_load_state(id, LoadState::Loading);

        match self.loader.list(&path, self.settings.show_hidden) {
            Listing::Entries(entries) => {
                let specs = entries
                    .into_iter()
                    .map(|entry| ChildSpec {
                        display_name: entry.name,
                        path: entry.path,
                        kind: match entry.kind {
                            EntryKind::Directory => NodeKind::Directory,
                            EntryKind::File => NodeKind::File,
                        },
                    })
                    .collect();
                let summary = self.tree.reconcile_children(id, specs)?;
                self.release(&summary.released);
                tracing::debug!(
                    path = %path.display(),
                    added = summary.added,
                    kept = summary.kept,
                    removed = summary.removed,
                    "reloaded"
                );
                Ok(ReloadOutcome::Reloaded)
            }
            Listing::NotFound => {
                let released = self.tree.remove(id)?;
                self.release(&released);
                tracing::debug!(path = %path.display(), "directory vanished");
                Ok(ReloadOutcome::Removed)
            }
            Listing::Faulted(error) => {
                let summary = self.tree.reconcile_children(id, Vec::new())?;
                self.release(&summary.released);
                tracing::warn!(path = %path.display(), error = %error, "directory inaccessible");
                Ok(ReloadOutcome::Inaccessible(error))
            }
        }
    }

    fn subscribe(&mut self, id: NodeId) {
        let Some(path) = self.tree.path(id).map(Path::to_path_buf) else {
            return;
        };
        let Some(node) = self.tree.get(id) else {
            return;
        };
        if !node.is_materialized() || node.watch().is_some() {
            return;
        }
        match self.watches.subscribe(&path) {
            Ok(handle) => {
                self.tree.set_watch(id, Some(handle));
            }
            Err(e) => {
                tracing::warn!(error = %e, "directory left unwatched");
            }
        }
    }

    fn release(&mut self, paths: &[PathBuf]) {
        for path in paths {
            self.watches.unsubscribe(path);
        }
    }

    fn node_path(&self, id: NodeId) -> Result<PathBuf, ControllerError> {
        self.tree
            .path(id)
            .map(Path::to_path_buf)
            .ok_or(ControllerError::InvalidNode)
    }
}

impl Drop for TreeController {
    fn drop(&mut self) {
        self.shutdown();
    }
}

#[cfg(test)]
#[path = "../../tests/unit/kernel/controller.rs"]
mod tests;

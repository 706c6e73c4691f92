use std::path::PathBuf;

use crate::models::NodeId;

/// Entries of a node's context menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextAction {
    Refresh,
    Run,
    Copy,
    Paste,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    LoadDrives,
    Expand(NodeId),
    Collapse(NodeId),
    Select(NodeId),
    Context {
        node: NodeId,
        action: ContextAction,
    },
    SetShowHidden(bool),
    OpenDocument(PathBuf),
    /// `None` saves to the current document path.
    SaveDocument(Option<PathBuf>),
}

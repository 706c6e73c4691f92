//! Data models: the node arena and its persisted document form.

pub mod node_tree;
pub mod tree_document;

pub use node_tree::{
    display_name_for, ChildSpec, FileTreeError, LoadState, Node, NodeId, NodeKind, NodeTree,
    ReconcileSummary, TreeRow, WatchHandle, PLACEHOLDER_TEXT,
};
pub use tree_document::{DocumentError, OutlineNode, DOCUMENT_EXTENSION};

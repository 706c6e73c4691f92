//! Arena-backed tree of filesystem nodes.
//!
//! Nodes are addressed by generational `NodeId`s so that stale ids held by a
//! host (or by a queued reload) resolve to `None` instead of a wrong node.
//! Directories start unmaterialized with a single placeholder child and are
//! filled in by the controller when expanded.

use rustc_hash::{FxHashMap, FxHashSet};
use slotmap::{new_key_type, SlotMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::tree_document::OutlineNode;

new_key_type! { pub struct NodeId; }

/// Text shown for the synthetic child of an unexpanded directory.
pub const PLACEHOLDER_TEXT: &str = "...";

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Root,
    Directory,
    File,
    Placeholder,
}

impl NodeKind {
    /// Roots and directories can hold children.
    pub fn is_container(self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Directory)
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoadState {
    NotLoaded,
    Loading,
    Loaded,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FileTreeError {
    #[error("invalid node id")]
    InvalidNodeId,
    #[error("parent is not a directory")]
    ParentNotDirectory,
}

/// Token for an active directory watch, handed out by the watch manager.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct WatchHandle(u64);

impl WatchHandle {
    pub(crate) fn new(generation: u64) -> Self {
        Self(generation)
    }

    pub fn generation(self) -> u64 {
        self.0
    }
}

/// A child as described by a directory listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildSpec {
    pub display_name: String,
    pub path: PathBuf,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Node {
    kind: NodeKind,
    display_name: String,
    path: Option<PathBuf>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    load_state: LoadState,
    watch: Option<WatchHandle>,
}

impl Node {
    fn new(
        kind: NodeKind,
        display_name: String,
        path: Option<PathBuf>,
        parent: Option<NodeId>,
        load_state: LoadState,
    ) -> Self {
        Self {
            kind,
            display_name,
            path,
            parent,
            children: Vec::new(),
            load_state,
            watch: None,
        }
    }

    pub fn kind(&self) -> NodeKind {
        self.kind
    }

    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn is_materialized(&self) -> bool {
        self.load_state == LoadState::Loaded
    }

    pub fn watch(&self) -> Option<WatchHandle> {
        self.watch
    }
}

/// Outcome of replacing a directory's children with a fresh listing.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReconcileSummary {
    pub added: usize,
    pub kept: usize,
    pub removed: usize,
    /// Watched paths inside removed subtrees; the caller must unsubscribe them.
    pub released: Vec<PathBuf>,
}

pub struct NodeTree {
    arena: SlotMap<NodeId, Node>,
    roots: Vec<NodeId>,
    expanded: FxHashSet<NodeId>,
    selected: Option<NodeId>,
    /// Every live node showing a path, oldest first.
    id_by_path: FxHashMap<PathBuf, Vec<NodeId>>,
}

impl Default for NodeTree {
    fn default() -> Self {
        Self::new()
    }
}

impl NodeTree {
    pub fn new() -> Self {
        Self {
            arena: SlotMap::with_key(),
            roots: Vec::new(),
            expanded: FxHashSet::default(),
            selected: None,
            id_by_path: FxHashMap::default(),
        }
    }

    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    pub fn get(&self, id: NodeId) -> Option<&Node> {
        self.arena.get(id)
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.arena.contains_key(id)
    }

    /// Number of live nodes, placeholders included.
    pub fn len(&self) -> usize {
        self.arena.len()
    }

    pub fn is_empty(&self) -> bool {
        self.arena.is_empty()
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.arena
            .get(id)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    pub fn kind(&self, id: NodeId) -> Option<NodeKind> {
        self.arena.get(id).map(|n| n.kind)
    }

    pub fn path(&self, id: NodeId) -> Option<&Path> {
        self.arena.get(id).and_then(|n| n.path.as_deref())
    }

    pub fn selected(&self) -> Option<NodeId> {
        self.selected
    }

    pub fn set_selected(&mut self, id: Option<NodeId>) {
        self.selected = id.filter(|id| self.arena.contains_key(*id));
    }

    /// Most recently inserted node showing `path`.
    pub fn find_by_path(&self, path: &Path) -> Option<NodeId> {
        self.find_all_by_path(path).last().copied()
    }

    /// All nodes showing `path`, oldest first.
    pub fn find_all_by_path(&self, path: &Path) -> &[NodeId] {
        self.id_by_path
            .get(path)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn add_root(&mut self, path: PathBuf) -> NodeId {
        let display_name = display_name_for(&path);
        let id = self.alloc(NodeKind::Root, display_name, Some(path), None, LoadState::NotLoaded);
        self.roots.push(id);
        id
    }

    /// Appends a real child, dropping the parent's placeholder first.
    /// A parent that receives real children counts as materialized.
    pub fn insert_child(&mut self, parent: NodeId, spec: ChildSpec) -> Result<NodeId, FileTreeError> {
        let parent_kind = self.kind(parent).ok_or(FileTreeError::InvalidNodeId)?;
        if !parent_kind.is_container() {
            return Err(FileTreeError::ParentNotDirectory);
        }
        self.drop_placeholders(parent);

        let id = self.alloc_child(parent, spec);
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.push(id);
            node.load_state = LoadState::Loaded;
        }
        Ok(id)
    }

    pub fn set_load_state(&mut self, id: NodeId, state: LoadState) {
        if let Some(node) = self.arena.get_mut(id) {
            node.load_state = state;
        }
    }

    /// Turns a decoded leaf into an unmaterialized directory once the
    /// filesystem says it is one.
    pub fn promote_to_directory(&mut self, id: NodeId) -> Result<(), FileTreeError> {
        let node = self.arena.get(id).ok_or(FileTreeError::InvalidNodeId)?;
        if node.kind != NodeKind::File {
            return Ok(());
        }
        let stale: Vec<NodeId> = node.children.clone();
        for child in stale {
            self.remove_subtree(child);
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.kind = NodeKind::Directory;
            node.children.clear();
            node.load_state = LoadState::NotLoaded;
        }
        let placeholder = self.alloc(
            NodeKind::Placeholder,
            PLACEHOLDER_TEXT.to_string(),
            None,
            Some(id),
            LoadState::Loaded,
        );
        if let Some(node) = self.arena.get_mut(id) {
            node.children.push(placeholder);
        }
        Ok(())
    }

    pub fn set_watch(&mut self, id: NodeId, watch: Option<WatchHandle>) -> Option<WatchHandle> {
        let node = self.arena.get_mut(id)?;
        std::mem::replace(&mut node.watch, watch)
    }

    pub fn is_expanded(&self, id: NodeId) -> bool {
        self.expanded.contains(&id)
    }

    pub fn expand(&mut self, id: NodeId) {
        if self.kind(id).is_some_and(NodeKind::is_container) {
            self.expanded.insert(id);
        }
    }

    /// Collapses `id` and every descendant, clearing their watch handles.
    /// Returns the paths whose watches were held so the caller can release them.
    pub fn collapse(&mut self, id: NodeId) -> Vec<PathBuf> {
        let mut released = Vec::new();
        for node_id in self.subtree(id) {
            self.expanded.remove(&node_id);
            if let Some(node) = self.arena.get_mut(node_id) {
                if node.watch.take().is_some() {
                    if let Some(path) = &node.path {
                        released.push(path.clone());
                    }
                }
            }
        }
        released
    }

    /// Pre-order ids of `id` and all its descendants.
    pub fn subtree(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![id];
        while let Some(node_id) = stack.pop() {
            let Some(node) = self.arena.get(node_id) else {
                continue;
            };
            out.push(node_id);
            stack.extend(node.children.iter().rev().copied());
        }
        out
    }

    /// Detaches `id` from its parent (or the root list) and frees its subtree.
    pub fn remove(&mut self, id: NodeId) -> Result<Vec<PathBuf>, FileTreeError> {
        let parent = self
            .arena
            .get(id)
            .ok_or(FileTreeError::InvalidNodeId)?
            .parent;

        match parent {
            Some(parent_id) => {
                if let Some(parent) = self.arena.get_mut(parent_id) {
                    parent.children.retain(|child| *child != id);
                }
            }
            None => self.roots.retain(|root| *root != id),
        }

        if self.selected.is_some_and(|sel| self.subtree(id).contains(&sel)) {
            self.selected = parent;
        }
        Ok(self.remove_subtree(id))
    }

    /// Drops every node. Returns the watched paths that were held.
    pub fn clear(&mut self) -> Vec<PathBuf> {
        let released = self
            .arena
            .values()
            .filter(|n| n.watch.is_some())
            .filter_map(|n| n.path.clone())
            .collect();
        self.arena.clear();
        self.roots.clear();
        self.expanded.clear();
        self.selected = None;
        self.id_by_path.clear();
        released
    }

    /// Replaces the children of `id` with `specs`, keeping existing child
    /// nodes whose path and kind still match so their subtrees survive.
    pub fn reconcile_children(
        &mut self,
        id: NodeId,
        specs: Vec<ChildSpec>,
    ) -> Result<ReconcileSummary, FileTreeError> {
        let node = self.arena.get(id).ok_or(FileTreeError::InvalidNodeId)?;
        if !node.kind.is_container() {
            return Err(FileTreeError::ParentNotDirectory);
        }

        let mut reusable: FxHashMap<(PathBuf, NodeKind), NodeId> = FxHashMap::default();
        let mut discard = Vec::new();
        for &child_id in &node.children {
            match self.arena.get(child_id) {
                Some(child) if child.kind != NodeKind::Placeholder => match &child.path {
                    Some(path) => {
                        if let Some(dup) = reusable.insert((path.clone(), child.kind), child_id) {
                            discard.push(dup);
                        }
                    }
                    None => discard.push(child_id),
                },
                _ => discard.push(child_id),
            }
        }

        let mut summary = ReconcileSummary::default();
        let mut children = Vec::with_capacity(specs.len());
        for spec in specs {
            match reusable.remove(&(spec.path.clone(), spec.kind)) {
                Some(existing) => {
                    if let Some(child) = self.arena.get_mut(existing) {
                        child.display_name = spec.display_name;
                    }
                    summary.kept += 1;
                    children.push(existing);
                }
                None => {
                    summary.added += 1;
                    children.push(self.alloc_child(id, spec));
                }
            }
        }

        discard.extend(reusable.into_values());
        for stale in discard {
            if self.arena.get(stale).is_some_and(|n| n.kind != NodeKind::Placeholder) {
                summary.removed += 1;
            }
            summary.released.extend(self.remove_subtree(stale));
        }

        if let Some(node) = self.arena.get_mut(id) {
            node.children = children;
            node.load_state = LoadState::Loaded;
        }
        Ok(summary)
    }

    /// Placeholder-free projection used by the document codec.
    pub fn outline(&self) -> Vec<OutlineNode> {
        self.roots
            .iter()
            .filter_map(|&root| self.outline_of(root))
            .collect()
    }

    fn outline_of(&self, id: NodeId) -> Option<OutlineNode> {
        let node = self.arena.get(id)?;
        if node.kind == NodeKind::Placeholder {
            return None;
        }
        Some(OutlineNode {
            text: node.display_name.clone(),
            path: node.path.clone(),
            children: node
                .children
                .iter()
                .filter_map(|&child| self.outline_of(child))
                .collect(),
        })
    }

    /// Builds a tree from decoded records. Top-level records become roots,
    /// records with children become materialized directories, leaves become
    /// files. Nothing is watched.
    pub fn from_outline(outline: &[OutlineNode]) -> Self {
        let mut tree = Self::new();
        let mut stack: Vec<(Option<NodeId>, &OutlineNode)> =
            outline.iter().rev().map(|record| (None, record)).collect();

        while let Some((parent, record)) = stack.pop() {
            let kind = match parent {
                None => NodeKind::Root,
                Some(_) if record.children.is_empty() => NodeKind::File,
                Some(_) => NodeKind::Directory,
            };
            let id = tree.alloc(
                kind,
                record.text.clone(),
                record.path.clone(),
                parent,
                LoadState::Loaded,
            );
            match parent {
                Some(parent_id) => {
                    if let Some(node) = tree.arena.get_mut(parent_id) {
                        node.children.push(id);
                    }
                }
                None => tree.roots.push(id),
            }
            stack.extend(record.children.iter().rev().map(|child| (Some(id), child)));
        }
        tree
    }

    fn alloc_child(&mut self, parent: NodeId, spec: ChildSpec) -> NodeId {
        let load_state = if spec.kind.is_container() {
            LoadState::NotLoaded
        } else {
            LoadState::Loaded
        };
        self.alloc(spec.kind, spec.display_name, Some(spec.path), Some(parent), load_state)
    }

    fn alloc(
        &mut self,
        kind: NodeKind,
        display_name: String,
        path: Option<PathBuf>,
        parent: Option<NodeId>,
        load_state: LoadState,
    ) -> NodeId {
        let indexed_path = path.clone();
        let id = self
            .arena
            .insert(Node::new(kind, display_name, path, parent, load_state));
        if let Some(path) = indexed_path {
            self.id_by_path.entry(path).or_default().push(id);
        }

        if kind.is_container() && load_state == LoadState::NotLoaded {
            let placeholder = self.arena.insert(Node::new(
                NodeKind::Placeholder,
                PLACEHOLDER_TEXT.to_string(),
                None,
                Some(id),
                LoadState::Loaded,
            ));
            if let Some(node) = self.arena.get_mut(id) {
                node.children.push(placeholder);
            }
        }
        id
    }

    fn drop_placeholders(&mut self, parent: NodeId) {
        let placeholders: Vec<NodeId> = self
            .children(parent)
            .iter()
            .copied()
            .filter(|&child| self.kind(child) == Some(NodeKind::Placeholder))
            .collect();
        if placeholders.is_empty() {
            return;
        }
        if let Some(node) = self.arena.get_mut(parent) {
            node.children.retain(|child| !placeholders.contains(child));
        }
        for placeholder in placeholders {
            self.arena.remove(placeholder);
        }
    }

    /// Frees `id` and its descendants without touching the parent's child list.
    fn remove_subtree(&mut self, id: NodeId) -> Vec<PathBuf> {
        let mut released = Vec::new();
        for node_id in self.subtree(id) {
            self.expanded.remove(&node_id);
            if self.selected == Some(node_id) {
                self.selected = None;
            }
            let Some(node) = self.arena.remove(node_id) else {
                continue;
            };
            if let Some(path) = node.path {
                if let Some(ids) = self.id_by_path.get_mut(&path) {
                    ids.retain(|&other| other != node_id);
                    if ids.is_empty() {
                        self.id_by_path.remove(&path);
                    }
                }
                if node.watch.is_some() {
                    released.push(path);
                }
            }
        }
        released
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    pub id: NodeId,
    pub depth: u16,
    pub name: String,
    pub kind: NodeKind,
    pub is_expanded: bool,
    pub load_state: LoadState,
}

impl NodeTree {
    /// Visible rows in display order: roots, then the children of every
    /// expanded node. Placeholders are never shown.
    pub fn flatten_for_view(&self) -> Vec<TreeRow> {
        let mut result = Vec::new();
        let mut stack: Vec<(NodeId, u16)> = self.roots.iter().rev().map(|&id| (id, 0)).collect();

        while let Some((id, depth)) = stack.pop() {
            let Some(node) = self.arena.get(id) else {
                continue;
            };
            if node.kind == NodeKind::Placeholder {
                continue;
            }
            let is_expanded = self.expanded.contains(&id);
            result.push(TreeRow {
                id,
                depth,
                name: node.display_name.clone(),
                kind: node.kind,
                is_expanded,
                load_state: node.load_state,
            });

            if is_expanded {
                for &child in node.children.iter().rev() {
                    stack.push((child, depth.saturating_add(1)));
                }
            }
        }

        result
    }
}

/// Base name of `path`, or the path itself for roots like `/` or `C:\`.
pub fn display_name_for(path: &Path) -> String {
    match path.file_name() {
        Some(name) if !name.is_empty() => name.to_string_lossy().into_owned(),
        _ => path.to_string_lossy().into_owned(),
    }
}

#[cfg(test)]
#[path = "../../tests/unit/models/node_tree.rs"]
mod tests;

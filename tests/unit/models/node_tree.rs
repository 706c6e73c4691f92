use super::*;

fn dir(name: &str, parent: &Path) -> ChildSpec {
    ChildSpec {
        display_name: name.to_string(),
        path: parent.join(name),
        kind: NodeKind::Directory,
    }
}

fn file(name: &str, parent: &Path) -> ChildSpec {
    ChildSpec {
        display_name: name.to_string(),
        path: parent.join(name),
        kind: NodeKind::File,
    }
}

fn names(tree: &NodeTree, id: NodeId) -> Vec<String> {
    tree.children(id)
        .iter()
        .filter_map(|&child| tree.get(child))
        .map(|node| node.display_name().to_string())
        .collect()
}

#[test]
fn test_new_root_has_single_placeholder() {
    let mut tree = NodeTree::new();
    let root = tree.add_root(PathBuf::from("/data"));

    let node = tree.get(root).unwrap();
    assert_eq!(node.kind(), NodeKind::Root);
    assert_eq!(node.display_name(), "data");
    assert_eq!(node.load_state(), LoadState::NotLoaded);
    assert!(!node.is_materialized());

    let children = tree.children(root);
    assert_eq!(children.len(), 1);
    let placeholder = tree.get(children[0]).unwrap();
    assert_eq!(placeholder.kind(), NodeKind::Placeholder);
    assert_eq!(placeholder.display_name(), PLACEHOLDER_TEXT);
    assert!(placeholder.path().is_none());
    assert!(placeholder.children().is_empty());
}

#[test]
fn test_drive_root_display_name_is_path() {
    assert_eq!(display_name_for(Path::new("/")), "/");
    assert_eq!(display_name_for(Path::new("/home/user")), "user");
}

#[test]
fn test_insert_child_replaces_placeholder() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());

    let sub = tree.insert_child(root, dir("sub", &root_path)).unwrap();
    let leaf = tree.insert_child(root, file("a.txt", &root_path)).unwrap();

    assert_eq!(tree.children(root), &[sub, leaf]);
    assert!(tree.get(root).unwrap().is_materialized());
    assert_eq!(tree.kind(sub), Some(NodeKind::Directory));
    assert_eq!(tree.get(sub).unwrap().load_state(), LoadState::NotLoaded);
    assert_eq!(tree.children(sub).len(), 1);
    assert_eq!(tree.get(leaf).unwrap().load_state(), LoadState::Loaded);
    assert_eq!(tree.get(sub).unwrap().parent(), Some(root));
}

#[test]
fn test_insert_child_into_file_is_rejected() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let leaf = tree.insert_child(root, file("a.txt", &root_path)).unwrap();

    let err = tree
        .insert_child(leaf, file("b.txt", &root_path))
        .unwrap_err();
    assert_eq!(err, FileTreeError::ParentNotDirectory);
}

#[test]
fn test_find_by_path() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let sub = tree.insert_child(root, dir("sub", &root_path)).unwrap();

    assert_eq!(tree.find_by_path(&root_path), Some(root));
    assert_eq!(tree.find_by_path(&root_path.join("sub")), Some(sub));
    assert_eq!(tree.find_by_path(Path::new("/elsewhere")), None);
}

#[test]
fn test_remove_detaches_subtree_and_reports_watches() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let sub = tree.insert_child(root, dir("sub", &root_path)).unwrap();
    let sub_path = root_path.join("sub");
    let nested = tree.insert_child(sub, file("n.txt", &sub_path)).unwrap();
    tree.set_watch(sub, Some(WatchHandle::new(1)));
    tree.expand(sub);
    tree.set_selected(Some(nested));

    let released = tree.remove(sub).unwrap();

    assert_eq!(released, vec![sub_path.clone()]);
    assert!(tree.children(root).is_empty());
    assert!(!tree.contains(sub));
    assert!(!tree.contains(nested));
    assert!(!tree.is_expanded(sub));
    assert_eq!(tree.selected(), Some(root));
    assert_eq!(tree.find_by_path(&sub_path), None);
}

#[test]
fn test_remove_root() {
    let mut tree = NodeTree::new();
    let a = tree.add_root(PathBuf::from("/a"));
    let b = tree.add_root(PathBuf::from("/b"));

    tree.remove(a).unwrap();

    assert_eq!(tree.roots(), &[b]);
    assert_eq!(tree.remove(a), Err(FileTreeError::InvalidNodeId));
}

#[test]
fn test_stale_id_resolves_to_none() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let leaf = tree.insert_child(root, file("a.txt", &root_path)).unwrap();
    tree.remove(leaf).unwrap();

    let _fresh = tree.insert_child(root, file("b.txt", &root_path)).unwrap();
    assert!(tree.get(leaf).is_none());
}

#[test]
fn test_collapse_clears_descendants() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let sub = tree.insert_child(root, dir("sub", &root_path)).unwrap();
    tree.expand(root);
    tree.expand(sub);
    tree.set_watch(root, Some(WatchHandle::new(1)));
    tree.set_watch(sub, Some(WatchHandle::new(2)));

    let mut released = tree.collapse(root);
    released.sort();

    assert_eq!(released, vec![root_path.clone(), root_path.join("sub")]);
    assert!(!tree.is_expanded(root));
    assert!(!tree.is_expanded(sub));
    assert!(tree.get(root).unwrap().watch().is_none());
    assert!(tree.get(sub).unwrap().watch().is_none());
    assert_eq!(tree.children(root), &[sub]);
}

#[test]
fn test_expand_ignores_files() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let leaf = tree.insert_child(root, file("a.txt", &root_path)).unwrap();

    tree.expand(leaf);
    assert!(!tree.is_expanded(leaf));
}

#[test]
fn test_reconcile_keeps_matching_children() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let keep = tree.insert_child(root, dir("keep", &root_path)).unwrap();
    let gone = tree.insert_child(root, dir("gone", &root_path)).unwrap();
    tree.set_watch(gone, Some(WatchHandle::new(3)));
    let keep_path = root_path.join("keep");
    let inner = tree.insert_child(keep, file("inner.txt", &keep_path)).unwrap();
    tree.expand(keep);

    let summary = tree
        .reconcile_children(
            root,
            vec![
                dir("new", &root_path),
                dir("keep", &root_path),
                file("f.txt", &root_path),
            ],
        )
        .unwrap();

    assert_eq!(summary.added, 2);
    assert_eq!(summary.kept, 1);
    assert_eq!(summary.removed, 1);
    assert_eq!(summary.released, vec![root_path.join("gone")]);
    assert_eq!(names(&tree, root), vec!["new", "keep", "f.txt"]);
    assert_eq!(tree.children(root)[1], keep);
    assert!(tree.contains(inner));
    assert!(tree.is_expanded(keep));
    assert!(!tree.contains(gone));
}

#[test]
fn test_reconcile_replaces_kind_change() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let was_file = tree.insert_child(root, file("x", &root_path)).unwrap();

    tree.reconcile_children(root, vec![dir("x", &root_path)])
        .unwrap();

    let now = tree.children(root)[0];
    assert_ne!(now, was_file);
    assert_eq!(tree.kind(now), Some(NodeKind::Directory));
    assert_eq!(tree.find_by_path(&root_path.join("x")), Some(now));
}

#[test]
fn test_reconcile_empty_listing_materializes_without_placeholder() {
    let mut tree = NodeTree::new();
    let root = tree.add_root(PathBuf::from("/empty"));

    let summary = tree.reconcile_children(root, Vec::new()).unwrap();

    assert_eq!(summary.removed, 0);
    assert!(tree.children(root).is_empty());
    assert!(tree.get(root).unwrap().is_materialized());
}

#[test]
fn test_promote_to_directory() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let leaf = tree.insert_child(root, file("maybe", &root_path)).unwrap();

    tree.promote_to_directory(leaf).unwrap();

    let node = tree.get(leaf).unwrap();
    assert_eq!(node.kind(), NodeKind::Directory);
    assert_eq!(node.load_state(), LoadState::NotLoaded);
    assert_eq!(tree.children(leaf).len(), 1);
    assert_eq!(tree.kind(tree.children(leaf)[0]), Some(NodeKind::Placeholder));
}

#[test]
fn test_outline_skips_placeholders() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    tree.insert_child(root, dir("sub", &root_path)).unwrap();
    tree.insert_child(root, file("a.txt", &root_path)).unwrap();

    let outline = tree.outline();

    assert_eq!(outline.len(), 1);
    assert_eq!(outline[0].text, "data");
    assert_eq!(outline[0].children.len(), 2);
    assert_eq!(outline[0].children[0].text, "sub");
    assert!(outline[0].children[0].children.is_empty());
}

#[test]
fn test_from_outline_infers_kinds() {
    let outline = vec![OutlineNode {
        text: "x".to_string(),
        path: Some(PathBuf::from("/p/x")),
        children: vec![
            OutlineNode {
                text: "y".to_string(),
                path: Some(PathBuf::from("/p/x/y")),
                children: vec![OutlineNode {
                    text: "z".to_string(),
                    path: None,
                    children: Vec::new(),
                }],
            },
            OutlineNode {
                text: "w".to_string(),
                path: Some(PathBuf::from("/p/x/w")),
                children: Vec::new(),
            },
        ],
    }];

    let tree = NodeTree::from_outline(&outline);

    assert_eq!(tree.roots().len(), 1);
    let root = tree.roots()[0];
    assert_eq!(tree.kind(root), Some(NodeKind::Root));
    assert!(tree.get(root).unwrap().is_materialized());
    let children = tree.children(root);
    assert_eq!(tree.kind(children[0]), Some(NodeKind::Directory));
    assert_eq!(tree.kind(children[1]), Some(NodeKind::File));
    assert_eq!(tree.find_by_path(Path::new("/p/x/y")), Some(children[0]));
    assert_eq!(tree.outline(), outline);
    assert!(tree.subtree(root).iter().all(|&id| tree.get(id).unwrap().watch().is_none()));
}

#[test]
fn test_flatten_for_view_hides_collapsed_and_placeholders() {
    let mut tree = NodeTree::new();
    let root_path = PathBuf::from("/data");
    let root = tree.add_root(root_path.clone());
    let sub = tree.insert_child(root, dir("sub", &root_path)).unwrap();
    tree.insert_child(root, file("a.txt", &root_path)).unwrap();

    assert_eq!(tree.flatten_for_view().len(), 1);

    tree.expand(root);
    tree.expand(sub);
    let rows = tree.flatten_for_view();
    let rendered: Vec<(u16, &str)> = rows.iter().map(|r| (r.depth, r.name.as_str())).collect();
    assert_eq!(rendered, vec![(0, "data"), (1, "sub"), (1, "a.txt")]);
    assert!(rows[1].is_expanded);
}

#[test]
fn test_clear_reports_watched_paths() {
    let mut tree = NodeTree::new();
    let root = tree.add_root(PathBuf::from("/data"));
    tree.set_watch(root, Some(WatchHandle::new(9)));

    let released = tree.clear();

    assert_eq!(released, vec![PathBuf::from("/data")]);
    assert!(tree.is_empty());
    assert!(tree.roots().is_empty());
}

#[test]
fn test_find_all_by_path_tracks_aliases() {
    let mut tree = NodeTree::new();
    let outer_path = PathBuf::from("/data");
    let sub_path = outer_path.join("sub");
    let alias = tree.add_root(sub_path.clone());
    let outer = tree.add_root(outer_path.clone());
    let nested = tree.insert_child(outer, dir("sub", &outer_path)).unwrap();

    assert_eq!(tree.find_all_by_path(&sub_path), &[alias, nested]);
    assert_eq!(tree.find_by_path(&sub_path), Some(nested));

    tree.remove(nested).unwrap();
    assert_eq!(tree.find_all_by_path(&sub_path), &[alias]);
    assert_eq!(tree.find_by_path(&sub_path), Some(alias));

    tree.remove(alias).unwrap();
    assert!(tree.find_all_by_path(&sub_path).is_empty());
}

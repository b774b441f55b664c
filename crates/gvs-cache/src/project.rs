//! Per-project state: change set, folder rollup, repository handle.

use std::collections::HashSet;
use std::path::Path;

use gvs_repo::RepoHandle;
use gvs_types::{ChangeKind, FileChangeSet, NodeId};
use tracing::debug;

use crate::tree::NodeTree;

/// Folders known to transitively contain a changed file.
///
/// The set is only meaningful while the rollup is current; any change to the
/// project's change set or tree marks it dirty, and the next folder query
/// rebuilds it.
#[derive(Clone, Debug, Default)]
pub struct FolderRollup {
    folders: HashSet<NodeId>,
    current: bool,
}

impl FolderRollup {
    pub fn is_current(&self) -> bool {
        self.current
    }

    pub fn mark_dirty(&mut self) {
        self.current = false;
    }

    pub fn contains(&self, folder: NodeId) -> bool {
        self.folders.contains(&folder)
    }

    pub fn len(&self) -> usize {
        self.folders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.folders.is_empty()
    }

    /// Recompute from `changes` against `tree` for the project at `root`.
    ///
    /// Every ancestor folder of every changed file under `root` that has a
    /// node is added, up to and including the folder at `root` when the tree
    /// has one. The upward walk stops at the first folder already in the set
    /// and never leaves `root`.
    pub fn rebuild(&mut self, tree: &dyn NodeTree, root: &Path, changes: &FileChangeSet) {
        self.folders.clear();
        let container = tree.node_for_path(root);
        for path in changes.paths() {
            if !path.starts_with(root) {
                continue;
            }
            let Some(node) = tree.node_for_path(path) else {
                continue;
            };
            if let Some(container) = container {
                self.folders.insert(container);
            }
            let mut cursor = tree.parent_folder(node);
            while let Some(folder) = cursor {
                let inside = tree.file_path(folder).is_some_and(|p| p.starts_with(root));
                if !inside || !self.folders.insert(folder) || Some(folder) == container {
                    break;
                }
                cursor = tree.parent_folder(folder);
            }
        }
        self.current = true;
        debug!(folders = self.folders.len(), "folder rollup rebuilt");
    }
}

/// Tracked state of one project root.
pub struct ProjectStatus {
    handle: RepoHandle,
    changes: FileChangeSet,
    rollup: FolderRollup,
}

impl ProjectStatus {
    pub fn new(handle: RepoHandle) -> Self {
        Self {
            handle,
            changes: FileChangeSet::new(),
            rollup: FolderRollup::default(),
        }
    }

    pub fn root(&self) -> &Path {
        self.handle.root()
    }

    pub fn handle(&self) -> &RepoHandle {
        &self.handle
    }

    pub fn changes(&self) -> &FileChangeSet {
        &self.changes
    }

    pub fn rollup(&self) -> &FolderRollup {
        &self.rollup
    }

    /// Replace the change set if it differs. Returns whether it changed.
    pub fn merge(&mut self, changes: FileChangeSet) -> bool {
        if self.changes == changes {
            return false;
        }
        self.changes = changes;
        self.rollup.mark_dirty();
        true
    }

    pub fn invalidate_rollup(&mut self) {
        self.rollup.mark_dirty();
    }

    /// Classification of the file at `path`.
    pub fn file_status(&self, path: &Path) -> ChangeKind {
        self.changes.get(path).unwrap_or(ChangeKind::Unmodified)
    }

    /// Classification of `folder`, rebuilding the rollup first if dirty.
    pub fn folder_status(&mut self, tree: &dyn NodeTree, folder: NodeId) -> ChangeKind {
        if !self.rollup.is_current() {
            self.rollup.rebuild(tree, self.handle.root(), &self.changes);
        }
        if self.rollup.contains(folder) {
            ChangeKind::FolderContainsChanges
        } else {
            ChangeKind::Unmodified
        }
    }
}

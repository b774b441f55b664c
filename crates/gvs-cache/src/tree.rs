//! The project tree as seen by the cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gvs_types::{NodeId, NodeKind};
use ignore::WalkBuilder;
use tracing::debug;

use crate::error::{CacheError, CacheResult};

/// Read access to the IDE's project tree.
///
/// The tree is owned by the IDE. Node identities stay stable for as long as
/// the node exists; a node that no longer exists answers `None` everywhere.
pub trait NodeTree {
    /// Whether `node` is a file or a folder.
    fn kind(&self, node: NodeId) -> Option<NodeKind>;

    /// The folder directly containing `node`.
    fn parent_folder(&self, node: NodeId) -> Option<NodeId>;

    /// Absolute filesystem path of a file or folder node.
    fn file_path(&self, node: NodeId) -> Option<&Path>;

    /// The node at `path`, if the tree has one.
    fn node_for_path(&self, path: &Path) -> Option<NodeId>;
}

#[derive(Clone, Debug)]
struct Node {
    kind: NodeKind,
    path: PathBuf,
    parent: Option<NodeId>,
}

/// Arena-backed [`NodeTree`] rooted at one folder.
///
/// Adding a path creates every missing folder between it and the root.
#[derive(Clone, Debug)]
pub struct MemoryTree {
    nodes: Vec<Node>,
    by_path: HashMap<PathBuf, NodeId>,
}

impl MemoryTree {
    /// Create a tree holding only the root folder.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        let mut by_path = HashMap::new();
        by_path.insert(root.clone(), NodeId(0));
        Self {
            nodes: vec![Node {
                kind: NodeKind::Folder,
                path: root,
                parent: None,
            }],
            by_path,
        }
    }

    /// Build a tree from the files under `root`, honouring ignore files.
    ///
    /// The `.git` directory is never entered.
    pub fn scan(root: impl Into<PathBuf>) -> CacheResult<Self> {
        let root = root.into();
        if !root.is_dir() {
            return Err(CacheError::NotADirectory(root));
        }

        let mut tree = Self::new(&root);
        let walker = WalkBuilder::new(&root)
            .hidden(false)
            .filter_entry(|entry| entry.file_name() != ".git")
            .build();
        for entry in walker {
            let entry = entry?;
            if entry.depth() == 0 {
                continue;
            }
            let is_dir = entry.file_type().is_some_and(|t| t.is_dir());
            if is_dir {
                tree.add_folder(entry.path());
            } else {
                tree.add_file(entry.path());
            }
        }
        debug!(root = %root.display(), nodes = tree.len(), "project tree scanned");
        Ok(tree)
    }

    /// The root folder node.
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    /// Path of the root folder.
    pub fn root_path(&self) -> &Path {
        &self.nodes[0].path
    }

    /// Number of nodes, root included.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Always `false`; a tree holds at least its root.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Add a file node, creating missing parent folders.
    ///
    /// Returns `None` if `path` is not strictly below the root.
    pub fn add_file(&mut self, path: impl AsRef<Path>) -> Option<NodeId> {
        self.add(path.as_ref(), NodeKind::File)
    }

    /// Add a folder node, creating missing parent folders.
    pub fn add_folder(&mut self, path: impl AsRef<Path>) -> Option<NodeId> {
        self.add(path.as_ref(), NodeKind::Folder)
    }

    /// Every folder node, in insertion order.
    pub fn folders(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes
            .iter()
            .enumerate()
            .filter(|(_, node)| node.kind == NodeKind::Folder)
            .map(|(i, _)| NodeId(i as u64))
    }

    fn add(&mut self, path: &Path, kind: NodeKind) -> Option<NodeId> {
        if let Some(&id) = self.by_path.get(path) {
            return Some(id);
        }
        if path == self.root_path() || !path.starts_with(self.root_path()) {
            return None;
        }
        let parent = self.ensure_folder(path.parent()?)?;
        let id = NodeId(self.nodes.len() as u64);
        self.nodes.push(Node {
            kind,
            path: path.to_path_buf(),
            parent: Some(parent),
        });
        self.by_path.insert(path.to_path_buf(), id);
        Some(id)
    }

    fn ensure_folder(&mut self, path: &Path) -> Option<NodeId> {
        match self.by_path.get(path) {
            Some(&id) => Some(id),
            None => self.add(path, NodeKind::Folder),
        }
    }

    fn node(&self, node: NodeId) -> Option<&Node> {
        usize::try_from(node.0).ok().and_then(|i| self.nodes.get(i))
    }
}

impl NodeTree for MemoryTree {
    fn kind(&self, node: NodeId) -> Option<NodeKind> {
        self.node(node).map(|n| n.kind)
    }

    fn parent_folder(&self, node: NodeId) -> Option<NodeId> {
        self.node(node)?.parent
    }

    fn file_path(&self, node: NodeId) -> Option<&Path> {
        self.node(node).map(|n| n.path.as_path())
    }

    fn node_for_path(&self, path: &Path) -> Option<NodeId> {
        self.by_path.get(path).copied()
    }
}

//! The project-wide status cache.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use gvs_backend::Backend;
use gvs_repo::{RepoEvent, RepoHandle};
use gvs_types::{ChangeKind, FileChangeSet, LineMarkers, NodeId, NodeKind};
use tokio::sync::broadcast;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info};

use crate::diff_cache::FileDiffCache;
use crate::notify::{Notification, NotificationStream};
use crate::project::ProjectStatus;
use crate::tree::NodeTree;

/// Cached VCS status of every tracked project.
///
/// Lives on one thread. Queries are answered from cached state only; the
/// only backend work it starts is through [`check_status`](Self::check_status)
/// and [`request_file_diff`](Self::request_file_diff), whose results arrive
/// later on the channel passed to [`new`](Self::new) and are folded in with
/// [`apply`](Self::apply).
pub struct ProjectStatusCache {
    backend: Arc<dyn Backend>,
    results: UnboundedSender<RepoEvent>,
    notifier: broadcast::Sender<Notification>,
    projects: HashMap<PathBuf, ProjectStatus>,
    diffs: FileDiffCache,
    current_project: Option<PathBuf>,
    current_document: Option<PathBuf>,
    pending_diff: Option<PathBuf>,
}

impl ProjectStatusCache {
    /// Create an empty cache.
    ///
    /// Repository results are sent to `results`; notifications go out on a
    /// broadcast channel holding up to `notification_capacity` messages.
    pub fn new(
        backend: Arc<dyn Backend>,
        results: UnboundedSender<RepoEvent>,
        notification_capacity: usize,
    ) -> Self {
        let (notifier, _) = broadcast::channel(notification_capacity.max(1));
        Self {
            backend,
            results,
            notifier,
            projects: HashMap::new(),
            diffs: FileDiffCache::new(),
            current_project: None,
            current_document: None,
            pending_diff: None,
        }
    }

    /// Subscribe to refresh notifications.
    pub fn subscribe(&self) -> NotificationStream {
        self.notifier.subscribe()
    }

    // ---------------------------------------------------------------
    // Projects
    // ---------------------------------------------------------------

    /// Start tracking the project at `root`.
    ///
    /// Returns `false` if it is already tracked or no repository governs it.
    pub fn register_project(&mut self, root: impl Into<PathBuf>) -> bool {
        let root = root.into();
        if self.projects.contains_key(&root) {
            debug!(root = %root.display(), "project already registered");
            return false;
        }
        let handle = RepoHandle::open(self.backend.as_ref(), root.clone(), self.results.clone());
        if !handle.is_open() {
            debug!(root = %root.display(), "no repository, project not tracked");
            return false;
        }
        info!(root = %root.display(), "project registered");
        self.projects.insert(root, ProjectStatus::new(handle));
        true
    }

    /// Stop tracking the project at `root`. Safe if it was never tracked.
    pub fn unregister_project(&mut self, root: &Path) -> bool {
        if self.current_project.as_deref() == Some(root) {
            self.current_project = None;
        }
        let removed = self.projects.remove(root).is_some();
        if removed {
            info!(root = %root.display(), "project unregistered");
        }
        removed
    }

    pub fn is_registered(&self, root: &Path) -> bool {
        self.projects.contains_key(root)
    }

    pub fn project(&self, root: &Path) -> Option<&ProjectStatus> {
        self.projects.get(root)
    }

    /// Roots of every tracked project.
    pub fn roots(&self) -> impl Iterator<Item = &Path> + '_ {
        self.projects.keys().map(PathBuf::as_path)
    }

    pub fn set_current_project(&mut self, root: Option<PathBuf>) {
        self.current_project = root;
    }

    pub fn current_project(&self) -> Option<&Path> {
        self.current_project.as_deref()
    }

    /// Root of the tracked project containing `path`.
    ///
    /// Matching is per path component, and the most deeply nested root wins.
    pub fn owning_root(&self, path: &Path) -> Option<&Path> {
        self.projects
            .keys()
            .filter(|root| path.starts_with(root))
            .max_by_key(|root| root.components().count())
            .map(PathBuf::as_path)
    }

    fn owning_project_mut(&mut self, path: &Path) -> Option<&mut ProjectStatus> {
        let root = self.owning_root(path)?.to_path_buf();
        self.projects.get_mut(&root)
    }

    fn owning_project(&self, path: &Path) -> Option<&ProjectStatus> {
        self.projects.get(self.owning_root(path)?)
    }

    // -- refresh triggers --

    /// Ask for fresh results for the current project and current document.
    pub fn check_status(&mut self) {
        let Some(root) = self.current_project.as_deref() else {
            debug!("no current project, status check skipped");
            return;
        };
        match self.projects.get(root) {
            Some(project) => {
                project.handle().request_file_change_set();
            }
            None => debug!(root = %root.display(), "current project not tracked"),
        }
        if let Some(document) = self.current_document.clone() {
            self.request_file_diff(document);
        }
    }

    /// Request line markers for `path` and open its cache entry.
    ///
    /// Returns `false` if no tracked project contains the path or a diff is
    /// already running for that project. In the latter case the request is
    /// kept and retried when the next diff result is applied; only the most
    /// recent deferred request is kept.
    pub fn request_file_diff(&mut self, path: impl Into<PathBuf>) -> bool {
        let path = path.into();
        if self.owning_root(&path).is_none() {
            return false;
        }
        self.diffs.open(path.clone());
        let started = self.diff_through_owner(&path);
        if !started {
            debug!(path = %path.display(), "diff busy, request deferred");
            self.pending_diff = Some(path);
        }
        started
    }

    /// Path whose diff request waits for a busy repository.
    pub fn pending_diff(&self) -> Option<&Path> {
        self.pending_diff.as_deref()
    }

    fn retry_pending_diff(&mut self) {
        let Some(path) = self.pending_diff.take() else {
            return;
        };
        if self.diffs.is_open(&path) {
            self.request_file_diff(path);
        }
    }

    fn diff_through_owner(&self, path: &Path) -> bool {
        match self.owning_project(path) {
            Some(project) => project.handle().request_file_diff(path),
            None => false,
        }
    }

    /// Mark the folder rollup of the project at `root` out of date.
    pub fn invalidate_rollup(&mut self, root: &Path) {
        if let Some(project) = self.projects.get_mut(root) {
            project.invalidate_rollup();
        }
    }

    // ---------------------------------------------------------------
    // Documents
    // ---------------------------------------------------------------

    /// Make `path` the document the gutter and navigation refer to.
    pub fn set_current_document(&mut self, path: Option<PathBuf>) {
        self.current_document = path;
        self.notify(Notification::CurrentFileDiffChanged);
    }

    pub fn current_document(&self) -> Option<&Path> {
        self.current_document.as_deref()
    }

    /// Forget the markers of a closed document.
    pub fn close_document(&mut self, path: &Path) {
        self.diffs.close(path);
        if self.current_document.as_deref() == Some(path) {
            self.current_document = None;
        }
        if self.pending_diff.as_deref() == Some(path) {
            self.pending_diff = None;
        }
    }

    pub fn file_diffs(&self) -> &FileDiffCache {
        &self.diffs
    }

    // ---------------------------------------------------------------
    // Merging
    // ---------------------------------------------------------------

    /// Fold one repository result into the cache.
    pub fn apply(&mut self, event: RepoEvent) -> bool {
        match event {
            RepoEvent::FileChangeSet { root, changes } => self.merge_file_change_set(&root, changes),
            RepoEvent::FileDiff { path, markers } => {
                let changed = self.merge_file_diff(&path, markers);
                // The diff slot of this project is free again.
                self.retry_pending_diff();
                changed
            }
        }
    }

    /// Replace the change set of the project at `root` if it differs.
    ///
    /// Notifies `StatusChanged` on change. Unknown roots are ignored.
    pub fn merge_file_change_set(&mut self, root: &Path, changes: FileChangeSet) -> bool {
        let Some(project) = self.projects.get_mut(root) else {
            debug!(root = %root.display(), "change set for untracked project dropped");
            return false;
        };
        if !project.merge(changes) {
            return false;
        }
        debug!(root = %root.display(), changes = project.changes().len(), "change set merged");
        self.notify(Notification::StatusChanged {
            root: root.to_path_buf(),
        });
        true
    }

    /// Replace the markers of an open document if they differ.
    ///
    /// Notifies `CurrentFileDiffChanged` only when `path` is the current
    /// document. Results for closed documents are dropped.
    pub fn merge_file_diff(&mut self, path: &Path, markers: LineMarkers) -> bool {
        if !self.diffs.merge(path, markers) {
            return false;
        }
        if self.current_document.as_deref() == Some(path) {
            self.notify(Notification::CurrentFileDiffChanged);
        }
        true
    }

    // ---------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------

    /// Classification used to decorate `node`.
    ///
    /// Files answer from their project's change set, folders from the lazy
    /// rollup. Nodes the tree does not know are `Invalid`; nodes outside
    /// every tracked project are `Unmodified`.
    pub fn vcs_status_changes(&mut self, tree: &dyn NodeTree, node: NodeId) -> ChangeKind {
        let (Some(kind), Some(path)) = (tree.kind(node), tree.file_path(node)) else {
            return ChangeKind::Invalid;
        };
        let path = path.to_path_buf();
        let Some(project) = self.owning_project_mut(&path) else {
            return ChangeKind::Unmodified;
        };
        match kind {
            NodeKind::File => project.file_status(&path),
            NodeKind::Folder => project.folder_status(tree, node),
        }
    }

    /// Classification of the file at `path`, without a tree.
    pub fn file_status(&self, path: &Path) -> ChangeKind {
        self.owning_project(path)
            .map(|project| project.file_status(path))
            .unwrap_or(ChangeKind::Unmodified)
    }

    /// Line markers of the current document.
    pub fn current_file_diff(&self) -> Option<&LineMarkers> {
        self.diffs.get(self.current_document.as_deref()?)
    }

    /// First changed line of the current document after `line`.
    pub fn next_changed_line(&self, line: u32) -> Option<u32> {
        self.current_file_diff()?.next_after(line)
    }

    /// Last changed line of the current document before `line`.
    pub fn previous_changed_line(&self, line: u32) -> Option<u32> {
        self.current_file_diff()?.previous_before(line)
    }

    fn notify(&self, notification: Notification) {
        // No subscribers is not an error.
        let _ = self.notifier.send(notification);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gvs_backend::{InMemoryBackend, InMemoryRepo};
    use gvs_types::LineMarker;
    use proptest::prelude::*;
    use tokio::sync::broadcast::error::TryRecvError;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    struct Fixture {
        cache: ProjectStatusCache,
        results: UnboundedReceiver<RepoEvent>,
        repo: InMemoryRepo,
    }

    fn fixture() -> Fixture {
        let backend = Arc::new(InMemoryBackend::new());
        let repo = backend.create_repo("/p");
        let (tx, results) = mpsc::unbounded_channel();
        let cache = ProjectStatusCache::new(backend, tx, 16);
        Fixture {
            cache,
            results,
            repo,
        }
    }

    fn set(entries: &[(&str, ChangeKind)]) -> FileChangeSet {
        entries
            .iter()
            .map(|(p, k)| (PathBuf::from(p), *k))
            .collect()
    }

    fn markers(lines: &[u32]) -> LineMarkers {
        lines.iter().map(|&l| (l, LineMarker::ADDED)).collect()
    }

    #[test]
    fn register_requires_repository() {
        let mut f = fixture();
        assert!(f.cache.register_project("/p"));
        assert!(!f.cache.register_project("/p"));
        assert!(!f.cache.register_project("/elsewhere"));
        assert!(f.cache.is_registered(Path::new("/p")));
        assert_eq!(f.cache.roots().count(), 1);

        assert!(f.cache.unregister_project(Path::new("/p")));
        assert!(!f.cache.unregister_project(Path::new("/p")));
        assert!(!f.cache.unregister_project(Path::new("/never")));
    }

    #[test]
    fn unregister_clears_current_project() {
        let mut f = fixture();
        f.cache.register_project("/p");
        f.cache.set_current_project(Some(PathBuf::from("/p")));
        f.cache.unregister_project(Path::new("/p"));
        assert_eq!(f.cache.current_project(), None);
    }

    #[test]
    fn idempotent_merge_notifies_once() {
        let mut f = fixture();
        f.cache.register_project("/p");
        let mut notes = f.cache.subscribe();

        let changes = set(&[("/p/a.rs", ChangeKind::Modified)]);
        assert!(f.cache.merge_file_change_set(Path::new("/p"), changes.clone()));
        assert!(!f.cache.merge_file_change_set(Path::new("/p"), changes));

        assert_eq!(
            notes.try_recv(),
            Ok(Notification::StatusChanged {
                root: PathBuf::from("/p")
            })
        );
        assert_eq!(notes.try_recv(), Err(TryRecvError::Empty));
    }

    #[test]
    fn merge_for_unknown_root_is_ignored() {
        let mut f = fixture();
        let changes = set(&[("/q/a.rs", ChangeKind::Modified)]);
        assert!(!f.cache.merge_file_change_set(Path::new("/q"), changes));
    }

    #[test]
    fn unregistered_paths_get_neutral_defaults() {
        let mut f = fixture();
        let mut tree = crate::tree::MemoryTree::new("/");
        let file = tree.add_file("/q/a.rs").unwrap();
        let folder = tree.node_for_path(Path::new("/q")).unwrap();

        assert_eq!(f.cache.vcs_status_changes(&tree, file), ChangeKind::Unmodified);
        assert_eq!(f.cache.vcs_status_changes(&tree, folder), ChangeKind::Unmodified);
        assert_eq!(f.cache.vcs_status_changes(&tree, NodeId(999)), ChangeKind::Invalid);
        assert_eq!(f.cache.current_file_diff(), None);
        assert_eq!(f.cache.next_changed_line(0), None);
        assert_eq!(f.cache.previous_changed_line(100), None);
    }

    #[test]
    fn file_and_folder_queries() {
        let mut f = fixture();
        f.cache.register_project("/p");
        let mut tree = crate::tree::MemoryTree::new("/p");
        let a = tree.add_file("/p/src/a.rs").unwrap();
        let b = tree.add_file("/p/docs/b.md").unwrap();
        let src = tree.node_for_path(Path::new("/p/src")).unwrap();
        let docs = tree.node_for_path(Path::new("/p/docs")).unwrap();

        f.cache.merge_file_change_set(
            Path::new("/p"),
            set(&[("/p/src/a.rs", ChangeKind::Untracked)]),
        );
        assert_eq!(f.cache.vcs_status_changes(&tree, a), ChangeKind::Untracked);
        assert_eq!(f.cache.vcs_status_changes(&tree, b), ChangeKind::Unmodified);
        assert_eq!(
            f.cache.vcs_status_changes(&tree, src),
            ChangeKind::FolderContainsChanges
        );
        assert_eq!(
            f.cache.vcs_status_changes(&tree, tree.root()),
            ChangeKind::FolderContainsChanges
        );
        assert_eq!(f.cache.vcs_status_changes(&tree, docs), ChangeKind::Unmodified);
    }

    #[test]
    fn rollup_rebuilds_lazily_after_merge_and_tree_change() {
        let mut f = fixture();
        f.cache.register_project("/p");
        let mut tree = crate::tree::MemoryTree::new("/p");
        tree.add_file("/p/src/a.rs").unwrap();

        f.cache.merge_file_change_set(
            Path::new("/p"),
            set(&[("/p/lib/new.rs", ChangeKind::Untracked)]),
        );
        // The file has no node yet, so the project claims nothing.
        assert_eq!(
            f.cache.vcs_status_changes(&tree, tree.root()),
            ChangeKind::Unmodified
        );
        assert!(f.cache.project(Path::new("/p")).unwrap().rollup().is_current());

        // The tree gains the node; the rollup only notices once invalidated.
        let new = tree.add_file("/p/lib/new.rs").unwrap();
        let lib = tree.parent_folder(new).unwrap();
        assert_eq!(f.cache.vcs_status_changes(&tree, lib), ChangeKind::Unmodified);
        f.cache.invalidate_rollup(Path::new("/p"));
        assert_eq!(
            f.cache.vcs_status_changes(&tree, lib),
            ChangeKind::FolderContainsChanges
        );

        // A new change set marks the rollup dirty by itself.
        f.cache.merge_file_change_set(Path::new("/p"), FileChangeSet::new());
        assert!(!f.cache.project(Path::new("/p")).unwrap().rollup().is_current());
        assert_eq!(f.cache.vcs_status_changes(&tree, lib), ChangeKind::Unmodified);
    }

    #[test]
    fn nested_roots_pick_the_deepest() {
        let backend = Arc::new(InMemoryBackend::new());
        backend.create_repo("/ws");
        backend.create_repo("/ws/vendor/lib");
        let (tx, _rx) = mpsc::unbounded_channel();
        let mut cache = ProjectStatusCache::new(backend, tx, 4);
        cache.register_project("/ws");
        cache.register_project("/ws/vendor/lib");
        cache.register_project("/wsx");

        assert_eq!(
            cache.owning_root(Path::new("/ws/vendor/lib/src/x.rs")),
            Some(Path::new("/ws/vendor/lib"))
        );
        assert_eq!(cache.owning_root(Path::new("/ws/src/y.rs")), Some(Path::new("/ws")));
        assert_eq!(cache.owning_root(Path::new("/wsx/z.rs")), None);
    }

    #[test]
    fn file_diff_merge_and_notification() {
        let mut f = fixture();
        f.cache.register_project("/p");
        let mut notes = f.cache.subscribe();
        let current = PathBuf::from("/p/a.rs");
        let other = PathBuf::from("/p/b.rs");

        // Not opened yet: dropped.
        assert!(!f.cache.merge_file_diff(&current, markers(&[1])));

        f.cache.set_current_document(Some(current.clone()));
        assert_eq!(notes.try_recv(), Ok(Notification::CurrentFileDiffChanged));

        f.cache.request_file_diff(current.clone());
        f.cache.request_file_diff(other.clone());
        assert!(f.cache.merge_file_diff(&current, markers(&[3, 7])));
        assert_eq!(notes.try_recv(), Ok(Notification::CurrentFileDiffChanged));
        assert!(!f.cache.merge_file_diff(&current, markers(&[3, 7])));

        assert!(f.cache.merge_file_diff(&other, markers(&[1])));
        assert_eq!(notes.try_recv(), Err(TryRecvError::Empty));

        assert_eq!(f.cache.current_file_diff(), Some(&markers(&[3, 7])));
        f.cache.close_document(&current);
        assert_eq!(f.cache.current_document(), None);
        assert!(!f.cache.merge_file_diff(&current, markers(&[9])));
    }

    #[test]
    fn navigation_boundaries() {
        let mut f = fixture();
        f.cache.register_project("/p");
        let doc = PathBuf::from("/p/a.rs");
        f.cache.set_current_document(Some(doc.clone()));
        f.cache.request_file_diff(doc.clone());
        f.cache.merge_file_diff(&doc, markers(&[3, 7, 12]));

        assert_eq!(f.cache.next_changed_line(0), Some(3));
        assert_eq!(f.cache.next_changed_line(3), Some(7));
        assert_eq!(f.cache.next_changed_line(12), None);
        assert_eq!(f.cache.previous_changed_line(12), Some(7));
        assert_eq!(f.cache.previous_changed_line(3), None);
        assert_eq!(f.cache.previous_changed_line(100), Some(12));
    }

    #[test]
    fn check_status_round_trip_through_backend() {
        let mut f = fixture();
        f.repo.commit_file("a.rs", "one\n");
        f.repo.write("a.rs", "one\ntwo\n");
        f.repo.write("b.rs", "new\n");
        f.cache.register_project("/p");
        f.cache.set_current_project(Some(PathBuf::from("/p")));
        f.cache.set_current_document(Some(PathBuf::from("/p/a.rs")));
        f.cache.request_file_diff("/p/a.rs");
        // Drain the direct diff first so check_status can start its own.
        let first = f.results.blocking_recv().unwrap();
        f.cache.apply(first);

        f.cache.check_status();
        let mut seen = 0;
        while seen < 1 {
            if let Some(event) = f.results.blocking_recv() {
                if matches!(event, RepoEvent::FileChangeSet { .. }) {
                    seen += 1;
                }
                f.cache.apply(event);
            }
        }

        assert_eq!(f.cache.file_status(Path::new("/p/a.rs")), ChangeKind::Modified);
        assert_eq!(f.cache.file_status(Path::new("/p/b.rs")), ChangeKind::Untracked);
        assert_eq!(f.cache.current_file_diff().and_then(|m| m.get(2)), Some(LineMarker::ADDED));
        assert_eq!(f.repo.status_scans(), 1);
    }

    #[test]
    fn check_status_without_current_project_does_nothing() {
        let mut f = fixture();
        f.cache.register_project("/p");
        f.cache.check_status();
        assert_eq!(f.repo.status_scans(), 0);
        assert!(f.results.try_recv().is_err());
    }

    fn arb_tree_and_changes() -> impl Strategy<Value = (Vec<String>, Vec<usize>)> {
        let file = proptest::collection::vec(0u8..3, 1..4).prop_map(|parts| {
            let mut path = String::from("/p");
            for (depth, part) in parts.iter().enumerate() {
                path.push_str(&format!("/d{depth}_{part}"));
            }
            path.push_str(".rs");
            path
        });
        proptest::collection::vec(file, 1..12).prop_flat_map(|files| {
            let n = files.len();
            (Just(files), proptest::collection::vec(0..n, 0..n))
        })
    }

    proptest! {
        #[test]
        fn folder_rollup_matches_descendants((files, changed) in arb_tree_and_changes()) {
            let mut f = fixture();
            f.cache.register_project("/p");
            let mut tree = crate::tree::MemoryTree::new("/p");
            for file in &files {
                tree.add_file(file);
            }
            let changes: FileChangeSet = changed
                .iter()
                .map(|&i| (PathBuf::from(&files[i]), ChangeKind::Modified))
                .collect();
            f.cache.merge_file_change_set(Path::new("/p"), changes.clone());

            let folders: Vec<NodeId> = tree.folders().collect();
            for folder in folders {
                let folder_path = tree.file_path(folder).unwrap().to_path_buf();
                let has_changed_descendant = changes
                    .paths()
                    .any(|p| p.starts_with(&folder_path) && tree.node_for_path(p).is_some());
                let expected = if has_changed_descendant {
                    ChangeKind::FolderContainsChanges
                } else {
                    ChangeKind::Unmodified
                };
                prop_assert_eq!(f.cache.vcs_status_changes(&tree, folder), expected);
            }
        }
    }
}

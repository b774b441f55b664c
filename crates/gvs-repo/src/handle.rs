//! The repository handle.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

use gvs_backend::{Backend, BackendRepo, BackendResult};
use gvs_diff::{classify_status, line_markers};
use gvs_types::{ChangeKind, FileChangeSet, LineMarkers};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};

use crate::event::RepoEvent;
use crate::in_flight::InFlight;

type SharedRepo = Arc<Mutex<Box<dyn BackendRepo>>>;

/// Binding between one project root and one opened repository.
///
/// The repository is opened once, at construction, and released when the
/// handle drops. If opening fails the handle stays inert: both requests
/// return `false` and nothing is ever emitted.
///
/// Each request runs on its own worker thread. At most one status scan and
/// one file diff are in flight at a time; a request made while the previous
/// one of the same kind still runs is dropped. The slot is released before
/// the result is sent, so the receiver may re-request immediately.
pub struct RepoHandle {
    root: PathBuf,
    repo: Option<SharedRepo>,
    workdir: Option<PathBuf>,
    events: UnboundedSender<RepoEvent>,
    status_in_flight: Arc<AtomicBool>,
    diff_in_flight: Arc<AtomicBool>,
}

impl RepoHandle {
    /// Open the repository governing `root` and route results to `events`.
    pub fn open(
        backend: &dyn Backend,
        root: impl Into<PathBuf>,
        events: UnboundedSender<RepoEvent>,
    ) -> Self {
        let root = root.into();
        let (repo, workdir) = match backend.open(&root) {
            Ok(repo) => {
                let workdir = repo.workdir().to_path_buf();
                info!(root = %root.display(), workdir = %workdir.display(), "repository opened");
                (Some(Arc::new(Mutex::new(repo))), Some(workdir))
            }
            Err(e) => {
                warn!(root = %root.display(), error = %e, "failed to open repository");
                (None, None)
            }
        };
        Self {
            root,
            repo,
            workdir,
            events,
            status_in_flight: Arc::new(AtomicBool::new(false)),
            diff_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Project root this handle serves.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Whether the repository was opened successfully.
    pub fn is_open(&self) -> bool {
        self.repo.is_some()
    }

    /// Working directory of the opened repository.
    pub fn workdir(&self) -> Option<&Path> {
        self.workdir.as_deref()
    }

    pub fn is_status_in_flight(&self) -> bool {
        self.status_in_flight.load(Ordering::Acquire)
    }

    pub fn is_diff_in_flight(&self) -> bool {
        self.diff_in_flight.load(Ordering::Acquire)
    }

    /// Start a status scan of the whole working tree.
    ///
    /// Returns `true` if a scan was started. On success a
    /// [`RepoEvent::FileChangeSet`] is sent; on failure nothing is.
    pub fn request_file_change_set(&self) -> bool {
        let Some(repo) = self.repo.clone() else {
            return false;
        };
        let Some(slot) = InFlight::acquire(&self.status_in_flight) else {
            debug!(root = %self.root.display(), "status scan already in flight");
            return false;
        };

        let root = self.root.clone();
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("gvs-status".into())
            .spawn(move || {
                let result = scan_changes(&repo);
                drop(slot);
                match result {
                    Ok(changes) => {
                        debug!(root = %root.display(), changes = changes.len(), "status scan finished");
                        send(&events, RepoEvent::FileChangeSet { root, changes });
                    }
                    Err(e) => warn!(root = %root.display(), error = %e, "status scan failed"),
                }
            });
        spawn_outcome(spawned, "gvs-status")
    }

    /// Start a diff of `path` against the index.
    ///
    /// Returns `true` if a diff was started. Paths outside the working
    /// directory or ignored by the repository produce nothing.
    pub fn request_file_diff(&self, path: impl Into<PathBuf>) -> bool {
        let Some(repo) = self.repo.clone() else {
            return false;
        };
        let Some(slot) = InFlight::acquire(&self.diff_in_flight) else {
            debug!(root = %self.root.display(), "file diff already in flight");
            return false;
        };

        let path = path.into();
        let events = self.events.clone();
        let spawned = thread::Builder::new()
            .name("gvs-diff".into())
            .spawn(move || {
                let result = diff_file(&repo, &path);
                drop(slot);
                match result {
                    Ok(Some(markers)) => {
                        debug!(path = %path.display(), lines = markers.len(), "file diff finished");
                        send(&events, RepoEvent::FileDiff { path, markers });
                    }
                    Ok(None) => debug!(path = %path.display(), "file not diffable"),
                    Err(e) => warn!(path = %path.display(), error = %e, "file diff failed"),
                }
            });
        spawn_outcome(spawned, "gvs-diff")
    }
}

fn scan_changes(repo: &Mutex<Box<dyn BackendRepo>>) -> BackendResult<FileChangeSet> {
    let repo = repo.lock().expect("lock poisoned");
    let workdir = repo.workdir().to_path_buf();
    let mut changes = FileChangeSet::new();

    for entry in repo.statuses()? {
        if entry.flags.is_ignored() {
            continue;
        }
        match classify_status(entry.flags) {
            ChangeKind::Invalid => {
                debug!(path = %entry.path.display(), flags = ?entry.flags, "unclassifiable status dropped");
            }
            kind => {
                changes.insert(workdir.join(&entry.path), kind);
            }
        }
    }
    Ok(changes)
}

fn diff_file(repo: &Mutex<Box<dyn BackendRepo>>, path: &Path) -> BackendResult<Option<LineMarkers>> {
    let repo = repo.lock().expect("lock poisoned");
    let Ok(rel_path) = path.strip_prefix(repo.workdir()) else {
        return Ok(None);
    };
    if rel_path.as_os_str().is_empty() || repo.is_ignored(rel_path)? {
        return Ok(None);
    }
    let hunks = repo.diff_index_to_workdir(rel_path, 0)?;
    Ok(Some(line_markers(&hunks)))
}

fn send(events: &UnboundedSender<RepoEvent>, event: RepoEvent) {
    let kind = event.kind_name();
    if events.send(event).is_err() {
        debug!(event = kind, "receiver gone, result dropped");
    }
}

fn spawn_outcome(spawned: std::io::Result<thread::JoinHandle<()>>, name: &str) -> bool {
    match spawned {
        Ok(_) => true,
        Err(e) => {
            warn!(thread = name, error = %e, "failed to spawn worker");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::time::{Duration, Instant};

    use gvs_backend::{Git2Backend, InMemoryBackend};
    use gvs_types::LineMarker;
    use tokio::sync::mpsc::{self, error::TryRecvError, UnboundedReceiver};

    fn channel() -> (UnboundedSender<RepoEvent>, UnboundedReceiver<RepoEvent>) {
        mpsc::unbounded_channel()
    }

    fn wait_idle(handle: &RepoHandle) {
        let deadline = Instant::now() + Duration::from_secs(5);
        while handle.is_status_in_flight() || handle.is_diff_in_flight() {
            assert!(Instant::now() < deadline, "worker did not finish");
            thread::sleep(Duration::from_millis(1));
        }
    }

    #[test]
    fn failed_open_is_inert() {
        let backend = InMemoryBackend::new();
        let (tx, mut rx) = channel();
        let handle = RepoHandle::open(&backend, "/nowhere", tx);

        assert!(!handle.is_open());
        assert_eq!(handle.workdir(), None);
        assert!(!handle.request_file_change_set());
        assert!(!handle.request_file_diff("/nowhere/a.txt"));
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn change_set_is_keyed_by_absolute_path() {
        let backend = InMemoryBackend::new();
        let fixture = backend.create_repo("/w");
        fixture.commit_file(".gitignore", "*.log\n");
        fixture.commit_file("src/lib.rs", "fn a() {}\n");
        fixture.write("src/lib.rs", "fn b() {}\n");
        fixture.write("notes.md", "todo\n");
        fixture.write("debug.log", "noise\n");

        let (tx, mut rx) = channel();
        let handle = RepoHandle::open(&backend, "/w/src", tx);
        assert_eq!(handle.workdir(), Some(Path::new("/w")));
        assert!(handle.request_file_change_set());

        let Some(RepoEvent::FileChangeSet { root, changes }) = rx.blocking_recv() else {
            panic!("expected a change set");
        };
        assert_eq!(root, PathBuf::from("/w/src"));
        assert_eq!(
            changes.sorted(),
            vec![
                (Path::new("/w/notes.md"), ChangeKind::Untracked),
                (Path::new("/w/src/lib.rs"), ChangeKind::Modified),
            ]
        );
    }

    #[test]
    fn at_most_one_scan_in_flight() {
        let backend = InMemoryBackend::new();
        let fixture = backend.create_repo("/w");
        fixture.write("a.txt", "x\n");
        let (tx, mut rx) = channel();
        let handle = RepoHandle::open(&backend, "/w", tx);

        let gate = fixture.pause();
        assert!(handle.request_file_change_set());
        assert!(!handle.request_file_change_set());
        assert!(!handle.request_file_change_set());
        assert!(handle.is_status_in_flight());
        drop(gate);

        assert!(matches!(rx.blocking_recv(), Some(RepoEvent::FileChangeSet { .. })));
        assert_eq!(fixture.status_scans(), 1);

        // The slot is free by the time the result arrives.
        assert!(handle.request_file_change_set());
        assert!(rx.blocking_recv().is_some());
        assert_eq!(fixture.status_scans(), 2);
    }

    #[test]
    fn ignored_path_is_never_diffed() {
        let backend = InMemoryBackend::new();
        let fixture = backend.create_repo("/w");
        fixture.commit_file(".gitignore", "*.log\n");
        fixture.write("build.log", "noise\n");
        let (tx, mut rx) = channel();
        let handle = RepoHandle::open(&backend, "/w", tx);

        assert!(handle.request_file_diff("/w/build.log"));
        wait_idle(&handle);
        assert!(handle.request_file_diff("/elsewhere/file.txt"));
        wait_idle(&handle);

        assert_eq!(fixture.diff_runs(), 0);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));
    }

    #[test]
    fn failed_query_emits_nothing_and_keeps_handle_usable() {
        let backend = InMemoryBackend::new();
        let fixture = backend.create_repo("/w");
        fixture.write("a.txt", "x\n");
        let (tx, mut rx) = channel();
        let handle = RepoHandle::open(&backend, "/w", tx);

        fixture.set_failing(true);
        assert!(handle.request_file_change_set());
        wait_idle(&handle);
        assert!(matches!(rx.try_recv(), Err(TryRecvError::Empty)));

        fixture.set_failing(false);
        assert!(handle.request_file_change_set());
        assert!(rx.blocking_recv().is_some());
    }

    #[test]
    fn scan_and_diff_run_independently() {
        let backend = InMemoryBackend::new();
        let fixture = backend.create_repo("/w");
        fixture.commit_file("a.txt", "one\n");
        fixture.write("a.txt", "one\ntwo\n");
        let (tx, mut rx) = channel();
        let handle = RepoHandle::open(&backend, "/w", tx);

        let gate = fixture.pause();
        assert!(handle.request_file_change_set());
        // The diff may wait on the repository behind the paused scan, but it
        // claims its own slot.
        assert!(handle.request_file_diff("/w/a.txt"));
        drop(gate);

        let mut kinds: Vec<&'static str> = (0..2)
            .filter_map(|_| rx.blocking_recv())
            .map(|e| e.kind_name())
            .collect();
        kinds.sort();
        assert_eq!(kinds, vec!["file_change_set", "file_diff"]);
    }

    #[test]
    fn results_after_receiver_drop_are_discarded() {
        let backend = InMemoryBackend::new();
        let fixture = backend.create_repo("/w");
        fixture.write("a.txt", "x\n");
        let (tx, rx) = channel();
        let handle = RepoHandle::open(&backend, "/w", tx);
        drop(rx);

        assert!(handle.request_file_change_set());
        wait_idle(&handle);
        assert!(handle.request_file_change_set());
    }

    /// Committed empty file later appended to, plus an untracked file.
    fn scenario_repo() -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        let repo = git2::Repository::init(dir.path()).unwrap();
        fs::write(dir.path().join("empty.txt"), "").unwrap();
        let mut index = repo.index().unwrap();
        index.add_path(Path::new("empty.txt")).unwrap();
        index.write().unwrap();
        let tree = repo.find_tree(index.write_tree().unwrap()).unwrap();
        let sig = git2::Signature::now("gvs", "gvs@example.com").unwrap();
        repo.commit(Some("HEAD"), &sig, &sig, "initial", &tree, &[])
            .unwrap();

        fs::write(dir.path().join("empty.txt"), "Empty\n").unwrap();
        fs::write(dir.path().join("untracked.txt"), "new\n").unwrap();
        dir
    }

    #[test]
    fn git_scenario_status_and_diff() {
        let dir = scenario_repo();
        let root = dir.path().to_path_buf();
        let backend = Git2Backend::new();
        let (tx, mut rx) = channel();
        let handle = RepoHandle::open(&backend, &root, tx);
        assert!(handle.is_open());

        assert!(handle.request_file_change_set());
        let Some(RepoEvent::FileChangeSet { changes, .. }) = rx.blocking_recv() else {
            panic!("expected a change set");
        };
        assert_eq!(changes.len(), 2);
        assert_eq!(changes.get(&root.join("empty.txt")), Some(ChangeKind::Modified));
        assert_eq!(changes.get(&root.join("untracked.txt")), Some(ChangeKind::Untracked));

        assert!(handle.request_file_diff(root.join("empty.txt")));
        let Some(RepoEvent::FileDiff { path, markers }) = rx.blocking_recv() else {
            panic!("expected a file diff");
        };
        assert_eq!(path, root.join("empty.txt"));
        assert_eq!(markers.len(), 1);
        assert_eq!(markers.get(1), Some(LineMarker::ADDED));
    }
}

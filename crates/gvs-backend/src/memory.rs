//! In-memory backend for tests and demos.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock};

use gvs_diff::{diff_lines, DiffHunk};
use gvs_types::StatusFlags;
use ignore::gitignore::GitignoreBuilder;
use tracing::debug;

use crate::error::{BackendError, BackendResult};
use crate::traits::{Backend, BackendRepo, StatusEntry};

const GITIGNORE: &str = ".gitignore";

/// Backend serving repositories that live entirely in memory.
///
/// Each repository keeps three snapshots of its files (HEAD, index and
/// working tree) and derives status flags and diffs from them the way Git
/// would. Repositories are shared: the handle returned by
/// [`create_repo`](Self::create_repo) sees every query made through
/// [`Backend::open`], and vice versa.
pub struct InMemoryBackend {
    repos: RwLock<HashMap<PathBuf, InMemoryRepo>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            repos: RwLock::new(HashMap::new()),
        }
    }

    /// Create an empty repository whose working directory is `workdir`.
    ///
    /// Returns the existing repository if one is already bound there.
    pub fn create_repo(&self, workdir: impl Into<PathBuf>) -> InMemoryRepo {
        let workdir = workdir.into();
        let mut repos = self.repos.write().expect("lock poisoned");
        repos
            .entry(workdir.clone())
            .or_insert_with(|| InMemoryRepo::new(workdir))
            .clone()
    }

    /// Number of repositories.
    pub fn len(&self) -> usize {
        self.repos.read().expect("lock poisoned").len()
    }

    /// Returns `true` if no repository was created.
    pub fn is_empty(&self) -> bool {
        self.repos.read().expect("lock poisoned").is_empty()
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for InMemoryBackend {
    fn open(&self, path: &Path) -> BackendResult<Box<dyn BackendRepo>> {
        let repos = self.repos.read().expect("lock poisoned");
        let governing = repos
            .iter()
            .filter(|(workdir, _)| path.starts_with(workdir))
            .max_by_key(|(workdir, _)| workdir.components().count())
            .map(|(_, repo)| repo.clone());
        match governing {
            Some(repo) => Ok(Box::new(repo)),
            None => Err(BackendError::NotFound(path.to_path_buf())),
        }
    }
}

#[derive(Default)]
struct Snapshots {
    head: BTreeMap<PathBuf, String>,
    index: BTreeMap<PathBuf, String>,
    worktree: BTreeMap<PathBuf, String>,
}

struct RepoState {
    workdir: PathBuf,
    files: RwLock<Snapshots>,
    status_scans: AtomicUsize,
    diff_runs: AtomicUsize,
    failing: AtomicBool,
    gate: Mutex<()>,
}

/// One in-memory repository, cheap to clone.
#[derive(Clone)]
pub struct InMemoryRepo {
    state: Arc<RepoState>,
}

impl InMemoryRepo {
    fn new(workdir: PathBuf) -> Self {
        Self {
            state: Arc::new(RepoState {
                workdir,
                files: RwLock::new(Snapshots::default()),
                status_scans: AtomicUsize::new(0),
                diff_runs: AtomicUsize::new(0),
                failing: AtomicBool::new(false),
                gate: Mutex::new(()),
            }),
        }
    }

    /// Write `contents` to the working-tree file at `rel_path`.
    pub fn write(&self, rel_path: impl Into<PathBuf>, contents: impl Into<String>) {
        self.files_mut()
            .worktree
            .insert(rel_path.into(), contents.into());
    }

    /// Delete the working-tree file at `rel_path`.
    pub fn remove(&self, rel_path: impl AsRef<Path>) {
        self.files_mut().worktree.remove(rel_path.as_ref());
    }

    /// Copy the working-tree state of `rel_path` into the index.
    pub fn stage(&self, rel_path: impl AsRef<Path>) {
        let rel_path = rel_path.as_ref();
        let mut files = self.files_mut();
        match files.worktree.get(rel_path).cloned() {
            Some(contents) => {
                files.index.insert(rel_path.to_path_buf(), contents);
            }
            None => {
                files.index.remove(rel_path);
            }
        }
    }

    /// Make the index the new HEAD.
    pub fn commit(&self) {
        let mut files = self.files_mut();
        files.head = files.index.clone();
    }

    /// Write, stage and commit one file.
    pub fn commit_file(&self, rel_path: impl Into<PathBuf>, contents: impl Into<String>) {
        let rel_path = rel_path.into();
        self.write(rel_path.clone(), contents);
        self.stage(&rel_path);
        self.commit();
    }

    /// Number of status scans run so far.
    pub fn status_scans(&self) -> usize {
        self.state.status_scans.load(Ordering::SeqCst)
    }

    /// Number of file diffs run so far.
    pub fn diff_runs(&self) -> usize {
        self.state.diff_runs.load(Ordering::SeqCst)
    }

    /// Make every subsequent query fail (or succeed again).
    pub fn set_failing(&self, failing: bool) {
        self.state.failing.store(failing, Ordering::SeqCst);
    }

    /// Block status scans until the returned guard is dropped.
    ///
    /// A scan started while paused is counted immediately and then waits.
    pub fn pause(&self) -> MutexGuard<'_, ()> {
        self.state.gate.lock().expect("lock poisoned")
    }

    fn files(&self) -> std::sync::RwLockReadGuard<'_, Snapshots> {
        self.state.files.read().expect("lock poisoned")
    }

    fn files_mut(&self) -> std::sync::RwLockWriteGuard<'_, Snapshots> {
        self.state.files.write().expect("lock poisoned")
    }

    fn check_failure(&self, operation: &str) -> BackendResult<()> {
        if self.state.failing.load(Ordering::SeqCst) {
            return Err(BackendError::Injected(operation.to_string()));
        }
        Ok(())
    }

    fn ignore_matcher(&self, files: &Snapshots) -> BackendResult<ignore::gitignore::Gitignore> {
        let mut builder = GitignoreBuilder::new(&self.state.workdir);
        if let Some(rules) = files.worktree.get(Path::new(GITIGNORE)) {
            for line in rules.lines() {
                builder.add_line(None, line)?;
            }
        }
        Ok(builder.build()?)
    }
}

impl BackendRepo for InMemoryRepo {
    fn workdir(&self) -> &Path {
        &self.state.workdir
    }

    fn is_ignored(&self, rel_path: &Path) -> BackendResult<bool> {
        self.check_failure("ignore check")?;
        let files = self.files();
        let matcher = self.ignore_matcher(&files)?;
        Ok(matcher
            .matched_path_or_any_parents(rel_path, false)
            .is_ignore())
    }

    fn statuses(&self) -> BackendResult<Vec<StatusEntry>> {
        self.state.status_scans.fetch_add(1, Ordering::SeqCst);
        let _gate = self.state.gate.lock().expect("lock poisoned");
        self.check_failure("status scan")?;

        let files = self.files();
        let matcher = self.ignore_matcher(&files)?;
        let paths: BTreeSet<&PathBuf> = files
            .head
            .keys()
            .chain(files.index.keys())
            .chain(files.worktree.keys())
            .collect();

        let mut entries = Vec::new();
        for path in paths {
            let head = files.head.get(path);
            let index = files.index.get(path);
            let worktree = files.worktree.get(path);

            let mut flags = match (head, index) {
                (None, Some(_)) => StatusFlags::INDEX_NEW,
                (Some(_), None) => StatusFlags::INDEX_DELETED,
                (Some(h), Some(i)) if h != i => StatusFlags::INDEX_MODIFIED,
                _ => StatusFlags::empty(),
            };
            flags |= match (index, worktree) {
                (None, Some(_)) => {
                    if matcher.matched_path_or_any_parents(path, false).is_ignore() {
                        StatusFlags::IGNORED
                    } else {
                        StatusFlags::WT_NEW
                    }
                }
                (Some(_), None) => StatusFlags::WT_DELETED,
                (Some(i), Some(w)) if i != w => StatusFlags::WT_MODIFIED,
                _ => StatusFlags::empty(),
            };

            if !flags.is_empty() {
                entries.push(StatusEntry::new(path.clone(), flags));
            }
        }
        debug!(workdir = %self.state.workdir.display(), entries = entries.len(), "in-memory status scan");
        Ok(entries)
    }

    fn diff_index_to_workdir(
        &self,
        rel_path: &Path,
        context_lines: u32,
    ) -> BackendResult<Vec<DiffHunk>> {
        self.state.diff_runs.fetch_add(1, Ordering::SeqCst);
        self.check_failure("file diff")?;

        let files = self.files();
        // Untracked files have no index side and produce no hunks.
        let Some(old) = files.index.get(rel_path) else {
            return Ok(Vec::new());
        };
        let new = files.worktree.get(rel_path).map(String::as_str).unwrap_or("");
        Ok(diff_lines(old, new, context_lines as usize))
    }
}

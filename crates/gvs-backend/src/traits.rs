//! The [`Backend`] and [`BackendRepo`] traits.

use std::path::{Path, PathBuf};

use gvs_diff::DiffHunk;
use gvs_types::StatusFlags;

use crate::error::BackendResult;

/// One entry of a status scan.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatusEntry {
    /// Path relative to the working directory.
    pub path: PathBuf,
    /// Backend status bits for the path.
    pub flags: StatusFlags,
}

impl StatusEntry {
    pub fn new(path: impl Into<PathBuf>, flags: StatusFlags) -> Self {
        Self {
            path: path.into(),
            flags,
        }
    }
}

/// Entry point of a VCS backend.
///
/// Implementations must be shareable across threads; the opened repositories
/// they hand out need only be `Send`.
pub trait Backend: Send + Sync {
    /// Open the repository that governs `path` (at `path` or above it).
    fn open(&self, path: &Path) -> BackendResult<Box<dyn BackendRepo>>;

    /// Probe for a repository governing `path`.
    ///
    /// Returns the repository's working directory, or `None` if there is no
    /// usable repository.
    fn discover(&self, path: &Path) -> Option<PathBuf> {
        self.open(path).ok().map(|repo| repo.workdir().to_path_buf())
    }
}

/// An opened repository.
///
/// A repository is not safe for concurrent queries; callers serialize access
/// to it.
pub trait BackendRepo: Send {
    /// Absolute working directory the repository is bound to.
    fn workdir(&self) -> &Path;

    /// Whether `rel_path` (relative to the working directory) matches the
    /// repository's ignore rules.
    fn is_ignored(&self, rel_path: &Path) -> BackendResult<bool>;

    /// Every path the backend reports as changed, ignored entries included
    /// when the backend reports them.
    fn statuses(&self) -> BackendResult<Vec<StatusEntry>>;

    /// Hunks of the index-to-workdir diff of exactly `rel_path`.
    fn diff_index_to_workdir(
        &self,
        rel_path: &Path,
        context_lines: u32,
    ) -> BackendResult<Vec<DiffHunk>>;
}

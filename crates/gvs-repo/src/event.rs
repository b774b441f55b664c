use std::path::PathBuf;

use gvs_types::{FileChangeSet, LineMarkers};

/// A completed repository query.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RepoEvent {
    /// Change set of the project rooted at `root`.
    FileChangeSet {
        root: PathBuf,
        changes: FileChangeSet,
    },
    /// Line markers of the file at `path`.
    FileDiff { path: PathBuf, markers: LineMarkers },
}

impl RepoEvent {
    /// Short label for logging.
    pub fn kind_name(&self) -> &'static str {
        match self {
            Self::FileChangeSet { .. } => "file_change_set",
            Self::FileDiff { .. } => "file_diff",
        }
    }
}

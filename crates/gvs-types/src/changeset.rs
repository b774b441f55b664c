//! The per-repository file change set.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::change::ChangeKind;

/// Mapping from absolute file path to its [`ChangeKind`].
///
/// Keys are unique and carry no ordering. A change set is replaced wholesale
/// every time a status scan completes, and compared by full equality against
/// the previous one to decide whether anything downstream must refresh.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileChangeSet(HashMap<PathBuf, ChangeKind>);

impl FileChangeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the classification of `path`.
    pub fn insert(&mut self, path: impl Into<PathBuf>, kind: ChangeKind) -> Option<ChangeKind> {
        self.0.insert(path.into(), kind)
    }

    pub fn get(&self, path: &Path) -> Option<ChangeKind> {
        self.0.get(path).copied()
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.0.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> + '_ {
        self.0.keys().map(PathBuf::as_path)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Path, ChangeKind)> + '_ {
        self.0.iter().map(|(path, kind)| (path.as_path(), *kind))
    }

    /// Entries sorted by path, for stable presentation.
    pub fn sorted(&self) -> Vec<(&Path, ChangeKind)> {
        let mut entries: Vec<_> = self.iter().collect();
        entries.sort_by(|(a, _), (b, _)| a.cmp(b));
        entries
    }
}

impl FromIterator<(PathBuf, ChangeKind)> for FileChangeSet {
    fn from_iter<I: IntoIterator<Item = (PathBuf, ChangeKind)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use gvs_types::LineMarkers;

/// Line markers of the documents currently open in the editor.
///
/// An entry exists from the first diff request for a document until the
/// document closes. Results for documents without an entry are dropped.
#[derive(Clone, Debug, Default)]
pub struct FileDiffCache {
    entries: HashMap<PathBuf, LineMarkers>,
}

impl FileDiffCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty entry for `path` unless one exists.
    pub fn open(&mut self, path: impl Into<PathBuf>) {
        self.entries.entry(path.into()).or_default();
    }

    pub fn is_open(&self, path: &Path) -> bool {
        self.entries.contains_key(path)
    }

    pub fn get(&self, path: &Path) -> Option<&LineMarkers> {
        self.entries.get(path)
    }

    /// Replace the markers of an open document.
    ///
    /// Returns `true` only if the entry exists and its markers changed.
    pub fn merge(&mut self, path: &Path, markers: LineMarkers) -> bool {
        match self.entries.get_mut(path) {
            Some(existing) if *existing != markers => {
                *existing = markers;
                true
            }
            _ => false,
        }
    }

    /// Drop the entry of a closed document.
    pub fn close(&mut self, path: &Path) -> Option<LineMarkers> {
        self.entries.remove(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

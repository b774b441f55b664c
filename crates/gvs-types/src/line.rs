//! Per-line change markers of a single document.

use std::collections::BTreeMap;
use std::ops::Bound;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Added/deleted bitset of one line.
    ///
    /// With zero-context diffs an edited line is covered by both the old
    /// and the new range of its hunk, so it carries both bits.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct LineMarker: u8 {
        const ADDED = 0b01;
        const DELETED = 0b10;
    }
}

/// How a marked line is drawn in the scrollbar gutter.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GutterHighlight {
    Added,
    Deleted,
    AddedAndDeleted,
}

impl GutterHighlight {
    /// Decoration for `marker`, or `None` for an empty marker.
    pub fn from_marker(marker: LineMarker) -> Option<Self> {
        let added = marker.contains(LineMarker::ADDED);
        let deleted = marker.contains(LineMarker::DELETED);
        match (added, deleted) {
            (true, true) => Some(Self::AddedAndDeleted),
            (true, false) => Some(Self::Added),
            (false, true) => Some(Self::Deleted),
            (false, false) => None,
        }
    }
}

/// Mapping from 1-based line number to a non-empty [`LineMarker`].
///
/// Absence of a line means the line is unmodified; an empty marker is never
/// stored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LineMarkers(BTreeMap<u32, LineMarker>);

impl LineMarkers {
    pub fn new() -> Self {
        Self::default()
    }

    /// OR `marker` into the entry for `line`.
    pub fn mark(&mut self, line: u32, marker: LineMarker) {
        if marker.is_empty() {
            return;
        }
        *self.0.entry(line).or_default() |= marker;
    }

    pub fn get(&self, line: u32) -> Option<LineMarker> {
        self.0.get(&line).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Marked lines in ascending order.
    pub fn iter(&self) -> impl DoubleEndedIterator<Item = (u32, LineMarker)> + '_ {
        self.0.iter().map(|(line, marker)| (*line, *marker))
    }

    /// First marked line strictly after `line`.
    pub fn next_after(&self, line: u32) -> Option<u32> {
        self.0
            .range((Bound::Excluded(line), Bound::Unbounded))
            .next()
            .map(|(l, _)| *l)
    }

    /// Last marked line strictly before `line`.
    pub fn previous_before(&self, line: u32) -> Option<u32> {
        self.0.range(..line).next_back().map(|(l, _)| *l)
    }

    /// Gutter decorations for a document of `line_count` lines.
    ///
    /// Rows are zero-based; markers past the end of the document (a diff
    /// computed against an older buffer) are skipped.
    pub fn highlights(&self, line_count: u32) -> Vec<(u32, GutterHighlight)> {
        self.0
            .iter()
            .take_while(|(line, _)| **line <= line_count)
            .filter(|(line, _)| **line >= 1)
            .filter_map(|(line, marker)| {
                GutterHighlight::from_marker(*marker).map(|h| (line - 1, h))
            })
            .collect()
    }
}

impl FromIterator<(u32, LineMarker)> for LineMarkers {
    fn from_iter<I: IntoIterator<Item = (u32, LineMarker)>>(iter: I) -> Self {
        let mut markers = Self::new();
        for (line, marker) in iter {
            markers.mark(line, marker);
        }
        markers
    }
}

use std::ops::Range;

use serde::{Deserialize, Serialize};

/// A contiguous region of a diff, numbered the way Git numbers hunks.
///
/// Line numbers are 1-based. A side with zero lines is anchored at the line
/// *before* the change (`0` when the change is at the top of the file), so
/// `old_start..old_start + old_lines` is always the exact span of old lines
/// the hunk covers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DiffHunk {
    /// First old line of the hunk.
    pub old_start: u32,
    /// Number of old lines in the hunk.
    pub old_lines: u32,
    /// First new line of the hunk.
    pub new_start: u32,
    /// Number of new lines in the hunk.
    pub new_lines: u32,
}

impl DiffHunk {
    pub fn new(old_start: u32, old_lines: u32, new_start: u32, new_lines: u32) -> Self {
        Self {
            old_start,
            old_lines,
            new_start,
            new_lines,
        }
    }

    /// Build a hunk from zero-based, half-open line index ranges.
    pub fn from_index_ranges(old: Range<usize>, new: Range<usize>) -> Self {
        let (old_start, old_lines) = git_span(old);
        let (new_start, new_lines) = git_span(new);
        Self::new(old_start, old_lines, new_start, new_lines)
    }

    /// Old lines covered by the hunk.
    pub fn old_range(&self) -> Range<u32> {
        self.old_start..self.old_start.saturating_add(self.old_lines)
    }

    /// New lines covered by the hunk.
    pub fn new_range(&self) -> Range<u32> {
        self.new_start..self.new_start.saturating_add(self.new_lines)
    }
}

fn git_span(range: Range<usize>) -> (u32, u32) {
    let len = to_u32(range.len());
    let start = to_u32(range.start);
    if len == 0 {
        (start, 0)
    } else {
        (start.saturating_add(1), len)
    }
}

fn to_u32(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

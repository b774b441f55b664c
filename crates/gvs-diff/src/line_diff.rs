//! Line-by-line text diff producing Git-numbered hunks.
//!
//! Uses the `similar` crate (Myers diff algorithm). Backends without a native
//! diff engine use this to answer index-to-workdir diff queries.

use similar::TextDiff;

use crate::hunk::DiffHunk;

/// Compute the hunks turning `old` into `new`, with `context` unchanged lines
/// around each change.
///
/// Identical texts produce no hunks. With `context == 0` every hunk covers
/// exactly the changed lines, matching `git diff -U0`.
pub fn diff_lines(old: &str, new: &str, context: usize) -> Vec<DiffHunk> {
    if old == new {
        return Vec::new();
    }

    let text_diff = TextDiff::from_lines(old, new);
    let mut hunks = Vec::new();

    for group in text_diff.grouped_ops(context) {
        let (Some(first), Some(last)) = (group.first(), group.last()) else {
            continue;
        };
        let old_range = first.old_range().start..last.old_range().end;
        let new_range = first.new_range().start..last.new_range().end;
        if old_range.is_empty() && new_range.is_empty() {
            continue;
        }
        hunks.push(DiffHunk::from_index_ranges(old_range, new_range));
    }

    hunks
}

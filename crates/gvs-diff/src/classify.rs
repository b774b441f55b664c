//! Backend output to gvs classifications.

use gvs_types::{ChangeKind, LineMarker, LineMarkers, StatusFlags};

use crate::hunk::DiffHunk;

/// Map backend status flags to a [`ChangeKind`].
///
/// The modified group is checked first, so a file that is new in the index
/// and further edited in the working tree classifies as `Modified`. Flags
/// outside both groups (ignored, conflicted, unreadable, none) yield
/// `Invalid`, which callers drop rather than store.
pub fn classify_status(flags: StatusFlags) -> ChangeKind {
    if flags.intersects(StatusFlags::MODIFIED_GROUP) {
        ChangeKind::Modified
    } else if flags.intersects(StatusFlags::UNTRACKED_GROUP) {
        ChangeKind::Untracked
    } else {
        ChangeKind::Invalid
    }
}

/// Fold diff hunks into per-line markers.
///
/// Every line of a hunk's new span is marked `ADDED`, every line of its old
/// span `DELETED`, OR-ing into lines already marked. The result does not
/// depend on hunk order.
pub fn line_markers<'a, I>(hunks: I) -> LineMarkers
where
    I: IntoIterator<Item = &'a DiffHunk>,
{
    let mut markers = LineMarkers::new();
    for hunk in hunks {
        for line in hunk.new_range() {
            markers.mark(line, LineMarker::ADDED);
        }
        for line in hunk.old_range() {
            markers.mark(line, LineMarker::DELETED);
        }
    }
    markers
}

use std::fmt;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

/// Classification of a project tree node's uncommitted state.
///
/// Exactly one of `Unmodified`, `Modified` or `Untracked` applies to a
/// tracked file. `FolderContainsChanges` is derived for folders at query time
/// and never stored per file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ChangeKind {
    /// No uncommitted change.
    Unmodified,
    /// Edited, renamed or type-changed, in the index or the working tree.
    Modified,
    /// New or deleted, in the index or the working tree.
    Untracked,
    /// A folder with at least one changed descendant file.
    FolderContainsChanges,
    /// Classification failed or does not apply.
    Invalid,
}

impl ChangeKind {
    /// Returns `true` for the kinds that warrant a decoration.
    pub fn is_changed(&self) -> bool {
        matches!(
            self,
            Self::Modified | Self::Untracked | Self::FolderContainsChanges
        )
    }
}

impl fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Unmodified => "unmodified",
            Self::Modified => "modified",
            Self::Untracked => "untracked",
            Self::FolderContainsChanges => "contains changes",
            Self::Invalid => "invalid",
        };
        write!(f, "{s}")
    }
}

bitflags! {
    /// Per-file status bits as reported by the VCS backend.
    ///
    /// Bit values match libgit2's `git_status_t`.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct StatusFlags: u32 {
        const INDEX_NEW = 1 << 0;
        const INDEX_MODIFIED = 1 << 1;
        const INDEX_DELETED = 1 << 2;
        const INDEX_RENAMED = 1 << 3;
        const INDEX_TYPECHANGE = 1 << 4;
        const WT_NEW = 1 << 7;
        const WT_MODIFIED = 1 << 8;
        const WT_DELETED = 1 << 9;
        const WT_TYPECHANGE = 1 << 10;
        const WT_RENAMED = 1 << 11;
        const WT_UNREADABLE = 1 << 12;
        const IGNORED = 1 << 14;
        const CONFLICTED = 1 << 15;
    }
}

impl StatusFlags {
    /// Flags that classify a file as [`ChangeKind::Modified`].
    pub const MODIFIED_GROUP: Self = Self::WT_MODIFIED
        .union(Self::WT_RENAMED)
        .union(Self::WT_TYPECHANGE)
        .union(Self::INDEX_MODIFIED)
        .union(Self::INDEX_RENAMED)
        .union(Self::INDEX_TYPECHANGE);

    /// Flags that classify a file as [`ChangeKind::Untracked`].
    pub const UNTRACKED_GROUP: Self = Self::WT_NEW
        .union(Self::WT_DELETED)
        .union(Self::INDEX_NEW)
        .union(Self::INDEX_DELETED);

    /// Returns `true` if the backend marked the entry as ignored.
    pub fn is_ignored(&self) -> bool {
        self.contains(Self::IGNORED)
    }
}

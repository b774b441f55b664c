//! Change classification for gvs.
//!
//! Pure, stateless mappings from raw backend output to the gvs data model:
//! per-file status flags become a [`ChangeKind`](gvs_types::ChangeKind), and
//! diff hunks become per-line [`LineMarkers`](gvs_types::LineMarkers).
//!
//! # Key Types
//!
//! - [`DiffHunk`] -- Old/new line spans of one contiguous change
//! - [`classify_status`] -- Status flags to change kind
//! - [`line_markers`] -- Hunks to added/deleted line markers
//! - [`diff_lines`] -- Git-numbered line diff of two texts

pub mod classify;
pub mod hunk;
pub mod line_diff;

pub use classify::{classify_status, line_markers};
pub use hunk::DiffHunk;
pub use line_diff::diff_lines;

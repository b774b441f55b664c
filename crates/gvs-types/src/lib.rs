//! Foundation types for gvs.
//!
//! This crate provides the data model shared by every other gvs crate: how a
//! file's uncommitted state is classified, how individual lines of a document
//! are marked, and how the project tree is addressed.
//!
//! # Key Types
//!
//! - [`ChangeKind`] -- Closed classification of a tree node's VCS state
//! - [`StatusFlags`] -- Backend-neutral per-file status bits
//! - [`LineMarker`] / [`LineMarkers`] -- Per-line added/deleted bitsets of one document
//! - [`GutterHighlight`] -- Scrollbar decoration derived from a line marker
//! - [`FileChangeSet`] -- Absolute path to [`ChangeKind`] for one repository
//! - [`NodeId`] / [`NodeKind`] -- Identity and kind of a project tree node

pub mod change;
pub mod changeset;
pub mod line;
pub mod node;

pub use change::{ChangeKind, StatusFlags};
pub use changeset::FileChangeSet;
pub use line::{GutterHighlight, LineMarker, LineMarkers};
pub use node::{NodeId, NodeKind};

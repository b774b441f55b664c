//! Project-wide VCS status cache for gvs.
//!
//! Aggregates per-file change sets into folder "contains changes" rollups,
//! keeps line markers for open documents, and answers point queries from UI
//! code on the owning thread while the repository queries run elsewhere.
//!
//! # Key Types
//!
//! - [`ProjectStatusCache`] -- All tracked projects, the current document, notifications
//! - [`ProjectStatus`] / [`FolderRollup`] -- One project's change set and lazy rollup
//! - [`FileDiffCache`] -- Line markers of open documents
//! - [`NodeTree`] / [`MemoryTree`] -- The project tree as the cache sees it
//! - [`Notification`] -- Refresh signals for UI collaborators

pub mod cache;
pub mod diff_cache;
pub mod error;
pub mod notify;
pub mod project;
pub mod tree;

pub use cache::ProjectStatusCache;
pub use diff_cache::FileDiffCache;
pub use error::{CacheError, CacheResult};
pub use notify::{Notification, NotificationStream};
pub use project::{FolderRollup, ProjectStatus};
pub use tree::{MemoryTree, NodeTree};

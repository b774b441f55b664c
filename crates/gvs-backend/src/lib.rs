//! VCS backend interface for gvs.
//!
//! The status engine never talks to a version-control library directly; it
//! goes through the [`Backend`] / [`BackendRepo`] traits defined here. Native
//! callback iteration (status-for-each, diff-for-each-hunk) is wrapped into
//! finite vectors built per call, so callers never hold a live iterator into
//! the library.
//!
//! # Key Types
//!
//! - [`Backend`] -- Opens the repository governing a path
//! - [`BackendRepo`] -- One opened repository: ignore check, status scan, file diff
//! - [`Git2Backend`] -- libgit2 through the `git2` crate
//! - [`InMemoryBackend`] -- Instrumented in-memory repositories for tests and demos

pub mod error;
pub mod git;
pub mod lifecycle;
pub mod memory;
pub mod traits;

pub use error::{BackendError, BackendResult};
pub use git::Git2Backend;
pub use lifecycle::{init, is_initialized, shutdown};
pub use memory::{InMemoryBackend, InMemoryRepo};
pub use traits::{Backend, BackendRepo, StatusEntry};

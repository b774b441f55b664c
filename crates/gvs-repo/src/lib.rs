//! Repository handle for gvs.
//!
//! A [`RepoHandle`] binds one project root to one opened backend repository
//! and answers two queries off the calling thread: the change set of the
//! whole working tree and the line markers of a single file. Results come
//! back as [`RepoEvent`]s over an unbounded channel so the owner can merge
//! them on its own thread.
//!
//! # Key Types
//!
//! - [`RepoHandle`] -- Owns the repository, runs at most one query of each kind
//! - [`RepoEvent`] -- Completed query result addressed to the owner

pub mod event;
pub mod handle;
mod in_flight;

pub use event::RepoEvent;
pub use handle::RepoHandle;

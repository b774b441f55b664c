//! Error types for the backend crate.

use std::path::PathBuf;

/// Errors from backend repository operations.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// No repository governs the given path.
    #[error("no repository found at or above {0}")]
    NotFound(PathBuf),

    /// The repository has no working directory.
    #[error("repository at {0} is bare")]
    Bare(PathBuf),

    /// A path handed to the repository lies outside its working directory.
    #[error("path {path} is outside the working directory {workdir}")]
    OutsideWorkdir { path: PathBuf, workdir: PathBuf },

    /// The underlying libgit2 call failed.
    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    /// Ignore rules could not be parsed.
    #[error("ignore rules error: {0}")]
    Ignore(#[from] ignore::Error),

    /// A failure injected into an in-memory repository.
    #[error("injected failure: {0}")]
    Injected(String),

    /// I/O error reading the working directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result alias for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

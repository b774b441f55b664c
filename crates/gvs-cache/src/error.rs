use std::path::PathBuf;

/// Errors from building a project tree.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// Walking the working directory failed.
    #[error("walk error: {0}")]
    Walk(#[from] ignore::Error),

    /// The scan root is not a directory.
    #[error("not a directory: {0}")]
    NotADirectory(PathBuf),
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

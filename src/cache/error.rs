use std::path::PathBuf;
use thiserror::Error;

/// Failures of a backing [`crate::Store`]. The cache logs these and treats the
/// operation as a miss; they never reach the cache's callers.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read cache file '{0}'")]
    Read(PathBuf, #[source] std::io::Error),

    #[error("Failed to write cache file '{0}'")]
    Write(PathBuf, #[source] std::io::Error),

    #[error("Failed to delete cache file '{0}'")]
    Delete(PathBuf, #[source] std::io::Error),

    #[error("Failed to list cache directory '{0}'")]
    List(PathBuf, #[source] std::io::Error),

    #[error("Store quota exceeded: {needed} bytes needed, capacity is {capacity}")]
    QuotaExceeded { needed: usize, capacity: usize },
}

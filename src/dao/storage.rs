use std::error::Error;

use thiserror::Error;

/// Result alias for snapshot store operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Backend-neutral failure of a snapshot store, wrapping the driver error.
#[derive(Debug, Error)]
#[error("{backend} snapshot store unavailable: {source}")]
pub struct StorageError {
    backend: &'static str,
    #[source]
    source: Box<dyn Error + Send + Sync>,
}

impl StorageError {
    /// Wrap a failure reported by `backend`.
    pub fn new(backend: &'static str, source: impl Into<Box<dyn Error + Send + Sync>>) -> Self {
        Self {
            backend,
            source: source.into(),
        }
    }

    /// Name of the backend that failed.
    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

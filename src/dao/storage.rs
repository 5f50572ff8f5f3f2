use std::error::Error;
use thiserror::Error;
use uuid::Uuid;

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Error raised by storage backends regardless of the underlying database.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The backend could not serve the request.
    #[error("storage unavailable: {message}")]
    Unavailable {
        /// Human readable summary of the failure.
        message: String,
        /// Underlying backend error.
        #[source]
        source: Box<dyn Error + Send + Sync>,
    },
    /// The stored revision moved on since the caller read it.
    #[error("match `{id}` was modified concurrently (expected version {expected_version})")]
    Conflict {
        /// Match whose update was rejected.
        id: Uuid,
        /// Revision the caller read before writing.
        expected_version: u64,
    },
    /// An insert collided with an existing match id.
    #[error("match `{id}` already exists")]
    Duplicate {
        /// Colliding match id.
        id: Uuid,
    },
}

impl StorageError {
    /// Construct an unavailable error from any backend failure.
    pub fn unavailable(message: String, source: impl Error + Send + Sync + 'static) -> Self {
        StorageError::Unavailable {
            message,
            source: Box::new(source),
        }
    }
}

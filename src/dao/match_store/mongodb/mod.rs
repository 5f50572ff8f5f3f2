mod config;
mod error;
mod models;
/// Store implementation.
pub mod store;

pub use config::MongoConfig;
pub use error::MongoDaoError;
pub use store::MongoMatchStore;

use crate::dao::storage::StorageError;

impl From<MongoDaoError> for StorageError {
    fn from(err: MongoDaoError) -> Self {
        match err {
            MongoDaoError::VersionConflict {
                id,
                expected_version,
            } => StorageError::Conflict {
                id,
                expected_version,
            },
            MongoDaoError::DuplicateMatch { id } => StorageError::Duplicate { id },
            other => StorageError::unavailable(other.to_string(), other),
        }
    }
}

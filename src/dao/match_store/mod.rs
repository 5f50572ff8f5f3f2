pub mod memory;
/// MongoDB-backed store.
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::models::MatchEntity;
use crate::dao::storage::StorageResult;

pub use memory::MemoryMatchStore;

/// Abstraction over the persistence layer for matches.
///
/// `update_match` is a compare-and-swap: it must only write when the stored
/// revision equals `expected_version`, and fail with
/// [`StorageError::Conflict`](crate::dao::storage::StorageError::Conflict) otherwise.
pub trait MatchStore: Send + Sync {
    /// Persist a new match; fails with `Duplicate` when the id is taken.
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Fetch a match by id.
    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Replace a match if its stored version still equals `expected_version`.
    fn update_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>>;
    /// Most recently created non-terminal match involving `participant`.
    fn find_latest_active_for_participant(
        &self,
        participant: i64,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>>;
    /// Check that the backend answers.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Re-establish the backend connection after a failed health check.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}

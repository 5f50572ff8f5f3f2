//! Process-local match store, used when no database is configured and in tests.

use std::sync::Arc;

use dashmap::{DashMap, mapref::entry::Entry};
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    match_store::MatchStore,
    models::MatchEntity,
    storage::{StorageError, StorageResult},
};

/// [`MatchStore`] keeping every match in a concurrent map.
#[derive(Clone, Default)]
pub struct MemoryMatchStore {
    matches: Arc<DashMap<Uuid, MatchEntity>>,
}

impl MemoryMatchStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn insert(&self, entity: MatchEntity) -> StorageResult<()> {
        match self.matches.entry(entity.id) {
            Entry::Occupied(_) => Err(StorageError::Duplicate { id: entity.id }),
            Entry::Vacant(slot) => {
                slot.insert(entity);
                Ok(())
            }
        }
    }

    fn update(&self, entity: MatchEntity, expected_version: u64) -> StorageResult<()> {
        let id = entity.id;
        // The shard lock held by `get_mut` makes the version check and the
        // write a single step.
        let Some(mut stored) = self.matches.get_mut(&id) else {
            return Err(StorageError::Conflict {
                id,
                expected_version,
            });
        };
        if stored.version != expected_version {
            return Err(StorageError::Conflict {
                id,
                expected_version,
            });
        }
        *stored = entity;
        Ok(())
    }

    fn latest_active_for(&self, participant: i64) -> Option<MatchEntity> {
        self.matches
            .iter()
            .filter(|entry| !entry.status.is_terminal() && entry.involves(participant))
            .max_by_key(|entry| entry.created_at)
            .map(|entry| entry.value().clone())
    }
}

impl MatchStore for MemoryMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert(entity) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.matches.get(&id).map(|entry| entry.value().clone())) })
    }

    fn update_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.update(entity, expected_version) })
    }

    fn find_latest_active_for_participant(
        &self,
        participant: i64,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.latest_active_for(participant)) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}

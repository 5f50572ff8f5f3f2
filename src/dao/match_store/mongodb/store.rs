use std::{sync::Arc, time::Duration};

use futures::future::BoxFuture;
use mongodb::{
    Client, Collection, Database, IndexModel,
    bson::{Document, doc},
    options::IndexOptions,
};
use tokio::{sync::RwLock, time::sleep};
use tracing::warn;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    error::{MongoDaoError, MongoResult, is_duplicate_key},
    models::{MongoMatchDocument, active_for_participant, doc_id, doc_id_at_version},
};
use crate::dao::{match_store::MatchStore, models::MatchEntity, storage::StorageResult};

const MATCH_COLLECTION_NAME: &str = "matches";
const CONNECT_ATTEMPTS: u32 = 10;
const CONNECT_BACKOFF: [Duration; 4] = [
    Duration::from_millis(250),
    Duration::from_millis(500),
    Duration::from_secs(1),
    Duration::from_secs(2),
];

/// [`MatchStore`] backed by a MongoDB collection, using the `version` field
/// as the compare-and-swap guard for updates.
#[derive(Clone)]
pub struct MongoMatchStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    // Kept alive alongside the database handle it produced.
    _client: Client,
    database: Database,
}

/// Open a client and wait until the server answers a ping.
async fn open(config: &MongoConfig) -> MongoResult<MongoState> {
    let client = Client::with_options(config.options.clone())
        .map_err(|source| MongoDaoError::ClientConstruction { source })?;
    let database = client.database(&config.database_name);

    let mut attempt = 0;
    loop {
        match database.run_command(doc! { "ping": 1 }).await {
            Ok(_) => {
                return Ok(MongoState {
                    _client: client,
                    database,
                });
            }
            Err(source) => {
                attempt += 1;
                if attempt >= CONNECT_ATTEMPTS {
                    return Err(MongoDaoError::InitialPing {
                        attempts: attempt,
                        source,
                    });
                }
                let delay = CONNECT_BACKOFF[(attempt as usize - 1).min(CONNECT_BACKOFF.len() - 1)];
                warn!(attempt, ?delay, "MongoDB not answering yet; retrying");
                sleep(delay).await;
            }
        }
    }
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = self.state.read().await.database.clone();
        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let fresh = open(&self.config).await?;
        *self.state.write().await = fresh;
        Ok(())
    }
}

impl MongoMatchStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let state = open(&config).await?;
        let store = Self {
            inner: Arc::new(MongoInner {
                state: RwLock::new(state),
                config,
            }),
        };
        store.ensure_indexes().await?;
        Ok(store)
    }

    async fn ensure_indexes(&self) -> MongoResult<()> {
        let collection = self.collection().await;
        for (field, name) in [
            ("creator.participant_id", "creator_recent_idx"),
            ("second.participant_id", "second_recent_idx"),
        ] {
            let mut keys = Document::new();
            keys.insert(field, 1);
            keys.insert("created_at", -1);
            let index = IndexModel::builder()
                .keys(keys)
                .options(IndexOptions::builder().name(Some(name.to_owned())).build())
                .build();

            collection
                .create_index(index)
                .await
                .map_err(|source| MongoDaoError::EnsureIndex {
                    collection: MATCH_COLLECTION_NAME,
                    index: name,
                    source,
                })?;
        }
        Ok(())
    }

    async fn collection(&self) -> Collection<MongoMatchDocument> {
        let guard = self.inner.state.read().await;
        guard
            .database
            .collection::<MongoMatchDocument>(MATCH_COLLECTION_NAME)
    }

    async fn insert(&self, entity: MatchEntity) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoMatchDocument = entity.into();
        self.collection()
            .await
            .insert_one(&document)
            .await
            .map_err(|source| {
                if is_duplicate_key(&source) {
                    MongoDaoError::DuplicateMatch { id }
                } else {
                    MongoDaoError::InsertMatch { id, source }
                }
            })?;
        Ok(())
    }

    async fn find(&self, id: Uuid) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .collection()
            .await
            .find_one(doc_id(id))
            .await
            .map_err(|source| MongoDaoError::LoadMatch { id, source })?;

        document.map(MongoMatchDocument::into_entity).transpose()
    }

    async fn update(&self, entity: MatchEntity, expected_version: u64) -> MongoResult<()> {
        let id = entity.id;
        let document: MongoMatchDocument = entity.into();
        let result = self
            .collection()
            .await
            .replace_one(doc_id_at_version(id, expected_version), &document)
            .await
            .map_err(|source| MongoDaoError::UpdateMatch { id, source })?;

        if result.matched_count == 0 {
            return Err(MongoDaoError::VersionConflict {
                id,
                expected_version,
            });
        }
        Ok(())
    }

    async fn latest_active_for(&self, participant: i64) -> MongoResult<Option<MatchEntity>> {
        let document = self
            .collection()
            .await
            .find_one(active_for_participant(participant))
            .sort(doc! { "created_at": -1 })
            .await
            .map_err(|source| MongoDaoError::LoadParticipantMatch {
                participant,
                source,
            })?;

        document.map(MongoMatchDocument::into_entity).transpose()
    }
}

impl MatchStore for MongoMatchStore {
    fn insert_match(&self, entity: MatchEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.insert(entity).await.map_err(Into::into) })
    }

    fn find_match(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move { store.find(id).await.map_err(Into::into) })
    }

    fn update_match(
        &self,
        entity: MatchEntity,
        expected_version: u64,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .update(entity, expected_version)
                .await
                .map_err(Into::into)
        })
    }

    fn find_latest_active_for_participant(
        &self,
        participant: i64,
    ) -> BoxFuture<'static, StorageResult<Option<MatchEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            store
                .latest_active_for(participant)
                .await
                .map_err(Into::into)
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.ping().await.map_err(Into::into) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { store.inner.reconnect().await.map_err(Into::into) })
    }
}

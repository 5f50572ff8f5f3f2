/// Boards, layouts, win detection and the match entity.
pub mod bingo;
/// Participant display names.
pub mod directory;
pub mod liveness;
/// Match status transitions.
pub mod match_machine;

use std::sync::Arc;

use axum::extract::ws::Message;
use dashmap::DashMap;
use tokio::sync::{Mutex, RwLock, mpsc};
use tokio::time::timeout;
use tracing::{debug, info, warn};

use crate::{
    config::AppConfig,
    dao::{match_store::MatchStore, storage::StorageError},
    error::ServiceError,
    state::{
        bingo::{Match, MatchId},
        directory::{ConfiguredDirectory, ParticipantDirectory},
        liveness::{ConnectionId, LivenessTracker},
    },
};

/// State handle shared by every handler.
pub type SharedState = Arc<AppState>;

#[derive(Clone)]
/// Handle used to push messages to a connected client.
pub struct ClientConnection {
    /// Connection identifier.
    pub id: ConnectionId,
    /// Writer channel of the socket.
    pub tx: mpsc::UnboundedSender<Message>,
}

/// Result of a read-modify-write on a match.
#[derive(Debug)]
pub struct Mutation<T> {
    /// Value returned by the mutation closure.
    pub value: T,
    /// The match as stored after the mutation.
    pub game: Match,
    /// Whether anything was written.
    pub changed: bool,
}

/// Central application state storing persistent connections and database handles.
pub struct AppState {
    config: Arc<AppConfig>,
    match_store: RwLock<Option<Arc<dyn MatchStore>>>,
    match_gates: DashMap<MatchId, Arc<Mutex<()>>>,
    connections: DashMap<ConnectionId, ClientConnection>,
    liveness: LivenessTracker,
    directory: Arc<dyn ParticipantDirectory>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let directory = Arc::new(ConfiguredDirectory::new(
            config.participants().iter().cloned(),
        ));
        Self::with_directory(config, directory)
    }

    /// Same as [`AppState::new`] with an explicit participant directory.
    pub fn with_directory(
        config: AppConfig,
        directory: Arc<dyn ParticipantDirectory>,
    ) -> SharedState {
        Arc::new(Self {
            config: Arc::new(config),
            match_store: RwLock::new(None),
            match_gates: DashMap::new(),
            connections: DashMap::new(),
            liveness: LivenessTracker::new(),
            directory,
        })
    }

    /// Loaded application configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current match store, if one is installed.
    pub async fn match_store(&self) -> Option<Arc<dyn MatchStore>> {
        let guard = self.match_store.read().await;
        guard.as_ref().cloned()
    }

    /// Current match store, or [`ServiceError::Degraded`] when none is installed.
    pub async fn require_match_store(&self) -> Result<Arc<dyn MatchStore>, ServiceError> {
        self.match_store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new match store implementation and leave degraded mode.
    pub async fn install_match_store(&self, store: Arc<dyn MatchStore>) {
        {
            let mut guard = self.match_store.write().await;
            *guard = Some(store);
        }
        info!("match store installed");
    }

    /// Remove the current match store and enter degraded mode.
    pub async fn clear_match_store(&self) {
        {
            let mut guard = self.match_store.write().await;
            guard.take();
        }
        warn!("match store removed; entering degraded mode");
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.match_store.read().await;
        guard.is_none()
    }

    /// Registry of open real-time connections.
    pub fn connections(&self) -> &DashMap<ConnectionId, ClientConnection> {
        &self.connections
    }

    /// Connection to participant and match-group bookkeeping.
    pub fn liveness(&self) -> &LivenessTracker {
        &self.liveness
    }

    /// Display name lookup for participants.
    pub fn directory(&self) -> &dyn ParticipantDirectory {
        self.directory.as_ref()
    }

    fn match_gate(&self, id: MatchId) -> Arc<Mutex<()>> {
        self.match_gates.entry(id).or_default().clone()
    }

    /// Drop the registry entry for `id` once no other caller holds or awaits its gate.
    fn release_gate(&self, id: MatchId, gate: Arc<Mutex<()>>) {
        self.match_gates
            .remove_if(&id, |_, registered| {
                Arc::ptr_eq(registered, &gate) && Arc::strong_count(registered) == 2
            });
    }

    /// Read a match straight from the store.
    pub async fn load_match(&self, id: MatchId) -> Result<Match, ServiceError> {
        let store = self.require_match_store().await?;
        store
            .find_match(id)
            .await?
            .map(Match::from)
            .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found")))
    }

    /// Run `mutation` against the latest stored version of a match and persist the result.
    ///
    /// Mutations of one match are serialized in-process; the store's version
    /// check catches writers outside this process. After a version conflict the
    /// closure runs again on a fresh read, so it must decide from the match it
    /// is handed only. Nothing is written when the closure leaves the match
    /// unchanged. The whole operation is bounded by the configured timeout.
    pub async fn mutate_match<F, T>(
        &self,
        id: MatchId,
        mut mutation: F,
    ) -> Result<Mutation<T>, ServiceError>
    where
        F: FnMut(&mut Match) -> Result<T, ServiceError>,
    {
        let gate = self.match_gate(id);
        let guard = gate.lock().await;

        let retries = self.config.conflict_retries();
        let work = async {
            let store = self.require_match_store().await?;
            let mut attempt = 0;
            loop {
                let before: Match = store
                    .find_match(id)
                    .await?
                    .map(Match::from)
                    .ok_or_else(|| ServiceError::NotFound(format!("match `{id}` not found")))?;

                let mut after = before.clone();
                let value = mutation(&mut after)?;
                if after == before {
                    return Ok(Mutation {
                        value,
                        game: after,
                        changed: false,
                    });
                }

                after.version = before.version + 1;
                match store.update_match(after.clone().into(), before.version).await {
                    Ok(()) => {
                        return Ok(Mutation {
                            value,
                            game: after,
                            changed: true,
                        });
                    }
                    Err(StorageError::Conflict {
                        expected_version, ..
                    }) if attempt < retries => {
                        attempt += 1;
                        debug!(
                            match_id = %id,
                            expected_version,
                            attempt,
                            "version conflict; re-reading match"
                        );
                    }
                    Err(err) => return Err(ServiceError::from(err)),
                }
            }
        };

        let outcome = match timeout(self.config.mutation_timeout(), work).await {
            Ok(result) => result,
            Err(_) => {
                warn!(match_id = %id, "match mutation timed out");
                Err(ServiceError::Timeout)
            }
        };
        drop(guard);
        self.release_gate(id, gate);
        outcome
    }
}

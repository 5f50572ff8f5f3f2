#![allow(dead_code)]

use std::sync::Arc;

use axum::extract::ws::Message;
use bingo_duel_back::{
    config::AppConfig,
    dao::match_store::MemoryMatchStore,
    dto::ws::ServerMessage,
    services::liveness_service,
    state::{AppState, ClientConnection, SharedState, bingo::ParticipantId, liveness::ConnectionId},
};
use tokio::sync::mpsc;
use uuid::Uuid;

pub const CREATOR: ParticipantId = 1;
pub const SECOND: ParticipantId = 2;

/// Shared state backed by a fresh in-memory store.
pub async fn ready_state() -> SharedState {
    let config = AppConfig::default()
        .with_participants([(CREATOR, "Ada".to_string()), (SECOND, "Grace".to_string())]);
    let state = AppState::new(config);
    state
        .install_match_store(Arc::new(MemoryMatchStore::new()))
        .await;
    state
}

pub fn creator_cards() -> Vec<u32> {
    (1..=24).collect()
}

pub fn second_cards() -> Vec<u32> {
    (101..=124).collect()
}

/// A fake real-time client registered the way the WebSocket handler does it.
pub struct TestClient {
    pub id: ConnectionId,
    pub rx: mpsc::UnboundedReceiver<Message>,
}

impl TestClient {
    pub fn connect(state: &SharedState, participant: ParticipantId) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        state.connections().insert(id, ClientConnection { id, tx });
        liveness_service::on_connection_opened(state, id, Some(participant));
        Self { id, rx }
    }

    /// Every server message received so far.
    pub fn drain(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(message) = self.rx.try_recv() {
            if let Message::Text(text) = message {
                messages.push(serde_json::from_str(text.as_str()).unwrap());
            }
        }
        messages
    }
}

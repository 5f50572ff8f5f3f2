use axum::extract::ws::Message;
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{
    dto::{
        matches::MatchView,
        ws::{NoticeKind, ServerMessage},
    },
    state::{
        SharedState,
        bingo::{Match, MatchId, ParticipantId},
    },
};

/// The writer half of a connection went away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionClosed;

/// Project `game` for the wire using the configured display names.
pub fn view(state: &SharedState, game: &Match) -> MatchView {
    MatchView::project(game, state.directory())
}

/// Push the full state of `game` to everyone in its channel.
pub fn broadcast_match_updated(state: &SharedState, game: &Match) {
    let message = ServerMessage::MatchUpdated {
        game: view(state, game),
    };
    send_match_event(state, game.id, &message);
}

/// Tell the channel that `game` ended without a winner.
pub fn broadcast_match_abandoned(state: &SharedState, game: &Match) {
    let message = ServerMessage::MatchAbandoned {
        game: view(state, game),
    };
    send_match_event(state, game.id, &message);
}

/// Best-effort membership notice for the channel of `match_id`.
pub fn broadcast_notice(
    state: &SharedState,
    match_id: MatchId,
    kind: NoticeKind,
    participant_id: Option<ParticipantId>,
) {
    let message = ServerMessage::Notice {
        match_id,
        kind,
        participant_id,
    };
    send_match_event(state, match_id, &message);
}

/// Serialize a payload and push it onto the provided WebSocket sender.
///
/// Serialization failures are logged and swallowed. A closed writer is
/// reported so the caller can drop the connection.
pub fn send_message_to_websocket<T>(
    tx: &mpsc::UnboundedSender<Message>,
    value: &T,
) -> Result<(), ConnectionClosed>
where
    T: ?Sized + Serialize + std::fmt::Debug,
{
    let payload = match serde_json::to_string(value) {
        Ok(p) => p,
        Err(err) => {
            warn!(error = %err, "failed to serialize message `{value:?}`");
            return Ok(());
        }
    };

    tx.send(Message::Text(payload.into()))
        .map_err(|_| ConnectionClosed)
}

fn send_match_event(state: &SharedState, match_id: Uuid, message: &ServerMessage) {
    let payload = match serde_json::to_string(message) {
        Ok(payload) => payload,
        Err(err) => {
            warn!(%match_id, error = %err, "failed to serialize match event");
            return;
        }
    };

    let mut delivered = 0usize;
    for connection_id in state.liveness().connections_in(match_id) {
        let Some(tx) = state
            .connections()
            .get(&connection_id)
            .map(|connection| connection.tx.clone())
        else {
            continue;
        };
        if tx.send(Message::Text(payload.clone().into())).is_ok() {
            delivered += 1;
        } else {
            warn!(%match_id, %connection_id, "send failed (writer closed), removing connection");
            state.connections().remove(&connection_id);
        }
    }
    debug!(%match_id, delivered, "match event sent");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::AppConfig,
        state::{AppState, ClientConnection},
    };

    fn connect(state: &SharedState, match_id: MatchId) -> mpsc::UnboundedReceiver<Message> {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        state.connections().insert(id, ClientConnection { id, tx });
        state.liveness().join_group(id, match_id);
        rx
    }

    #[test]
    fn notices_reach_only_the_match_channel() {
        let state = AppState::new(AppConfig::default());
        let (game, other) = (Uuid::new_v4(), Uuid::new_v4());
        let mut inside = connect(&state, game);
        let mut outside = connect(&state, other);

        broadcast_notice(&state, game, NoticeKind::ParticipantJoined, Some(1));

        let Some(Message::Text(text)) = inside.try_recv().ok() else {
            panic!("expected a text frame");
        };
        assert!(text.as_str().contains("participant_joined"));
        assert!(outside.try_recv().is_err());
    }

    #[test]
    fn closed_writers_are_pruned() {
        let state = AppState::new(AppConfig::default());
        let game = Uuid::new_v4();
        let receiver = connect(&state, game);
        drop(receiver);

        broadcast_notice(&state, game, NoticeKind::ParticipantLeft, None);
        assert!(state.connections().is_empty());
    }
}

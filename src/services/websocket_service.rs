use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use futures::{SinkExt, StreamExt};
use thiserror::Error;
use tokio::{sync::mpsc, task::JoinHandle};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    dto::{
        matches::MatchView,
        ws::{ClientMessage, ServerMessage},
    },
    error::ServiceError,
    services::{
        liveness_service,
        match_events::{ConnectionClosed, send_message_to_websocket, view},
        match_service,
    },
    state::{ClientConnection, SharedState, bingo::ParticipantId, liveness::ConnectionId},
};

const IDENT_TIMEOUT: Duration = Duration::from_secs(10);

/// Internal error type for inbound message handling.
///
/// Service errors are reported back on the socket; a closed writer ends the session.
#[derive(Debug, Error)]
enum SocketError {
    /// Writer channel closed - connection should be terminated immediately.
    #[error("connection closed")]
    ConnectionClosed,
    /// Message type this endpoint does not understand.
    #[error("unsupported message")]
    Unsupported,
    /// A second `identify` tried to change the bound identity.
    #[error("connection is already identified as participant {0}")]
    AlreadyIdentified(ParticipantId),
    /// Error from the match engine.
    #[error("{0}")]
    Service(#[from] ServiceError),
}

impl From<ConnectionClosed> for SocketError {
    fn from(_: ConnectionClosed) -> Self {
        SocketError::ConnectionClosed
    }
}

/// Handle the full lifecycle of one match WebSocket connection.
///
/// `identity` comes from the upgrade request; without it the first frame must
/// be an `identify` message.
pub async fn handle_socket(state: SharedState, socket: WebSocket, identity: Option<ParticipantId>) {
    let (mut sender, mut receiver) = socket.split();
    let (outbound_tx, mut outbound_rx) = mpsc::unbounded_channel::<Message>();

    // Dedicated writer task keeps outbound messages flowing even while we await inbound frames.
    let writer_task = tokio::spawn(async move {
        while let Some(message) = outbound_rx.recv().await {
            if sender.send(message).await.is_err() {
                break;
            }
        }
    });

    let participant_id = match identity {
        Some(participant_id) => participant_id,
        None => match await_identification(&mut receiver).await {
            Some(participant_id) => participant_id,
            None => {
                let _ = outbound_tx.send(Message::Close(None));
                finalize(writer_task, outbound_tx).await;
                return;
            }
        },
    };

    let connection_id: ConnectionId = Uuid::new_v4();
    state.connections().insert(
        connection_id,
        ClientConnection {
            id: connection_id,
            tx: outbound_tx.clone(),
        },
    );
    liveness_service::on_connection_opened(&state, connection_id, Some(participant_id));
    info!(%connection_id, participant_id, "client connected");

    if send_message_to_websocket(&outbound_tx, &ServerMessage::Identified { participant_id })
        .is_ok()
    {
        while let Some(message) = receiver.next().await {
            match message {
                Ok(Message::Text(text)) => {
                    let result = match ClientMessage::from_json_str(&text) {
                        Ok(inbound) => {
                            handle_message(
                                &state,
                                connection_id,
                                participant_id,
                                &outbound_tx,
                                inbound,
                            )
                            .await
                        }
                        Err(err) => {
                            warn!(%connection_id, error = %err, "failed to parse client message");
                            report(&outbound_tx, format!("malformed message: {err}"))
                        }
                    };

                    if let Err(err) = result {
                        if matches!(err, SocketError::ConnectionClosed) {
                            info!(%connection_id, "connection closed while handling message, terminating");
                            break;
                        }
                        warn!(%connection_id, participant_id, error = %err, "client request refused");
                        if report(&outbound_tx, err.to_string()).is_err() {
                            break;
                        }
                    }
                }
                Ok(Message::Ping(payload)) => {
                    let _ = outbound_tx.send(Message::Pong(payload));
                }
                Ok(Message::Close(frame)) => {
                    info!(%connection_id, "client closed");
                    let _ = outbound_tx.send(Message::Close(frame));
                    break;
                }
                Ok(Message::Binary(_)) => {}
                Ok(Message::Pong(_)) => {}
                Err(err) => {
                    warn!(%connection_id, error = %err, "websocket error");
                    break;
                }
            }
        }
    }

    liveness_service::on_connection_closed(&state, connection_id).await;
    info!(%connection_id, participant_id, "client disconnected");

    finalize(writer_task, outbound_tx).await;
}

/// Wait for the first frame and accept it only if it is an `identify` message.
async fn await_identification(
    receiver: &mut futures::stream::SplitStream<WebSocket>,
) -> Option<ParticipantId> {
    let text = match tokio::time::timeout(IDENT_TIMEOUT, receiver.next()).await {
        Ok(Some(Ok(Message::Text(text)))) => text,
        Ok(Some(Ok(_))) => {
            warn!("first frame was not a text identification");
            return None;
        }
        Ok(Some(Err(err))) => {
            warn!(error = %err, "websocket receive error");
            return None;
        }
        Ok(None) | Err(_) => {
            warn!("websocket identification timed out");
            return None;
        }
    };

    match ClientMessage::from_json_str(&text) {
        Ok(ClientMessage::Identify { participant_id }) => Some(participant_id),
        Ok(_) => {
            warn!("first message was not identification");
            None
        }
        Err(err) => {
            warn!(error = %err, "failed to parse identification message");
            None
        }
    }
}

async fn handle_message(
    state: &SharedState,
    connection_id: ConnectionId,
    participant_id: ParticipantId,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    message: ClientMessage,
) -> Result<(), SocketError> {
    match message {
        ClientMessage::Identify {
            participant_id: announced,
        } => {
            if announced != participant_id {
                return Err(SocketError::AlreadyIdentified(participant_id));
            }
            warn!(%connection_id, "ignoring duplicate identification message");
        }
        ClientMessage::JoinMatch { match_id } => {
            let game = state.load_match(match_id).await?;
            if !game.is_participant(participant_id) {
                return Err(ServiceError::Forbidden(
                    "only participants may subscribe to a match".into(),
                )
                .into());
            }
            liveness_service::on_joined_group(state, connection_id, match_id).await;
            send_message_to_websocket(
                outbound_tx,
                &ServerMessage::MatchUpdated {
                    game: view(state, &game),
                },
            )?;
        }
        ClientMessage::LeaveMatch => {
            liveness_service::on_left_group(state, connection_id).await;
        }
        ClientMessage::CheckCell { match_id, card_id } => {
            let game = match_service::check_cell(state, match_id, participant_id, card_id).await?;
            acknowledge_outside_group(state, connection_id, outbound_tx, match_id, game)?;
        }
        ClientMessage::Resume { match_id } => {
            let game = match_service::resume_match(state, match_id, participant_id).await?;
            acknowledge_outside_group(state, connection_id, outbound_tx, match_id, game)?;
        }
        ClientMessage::Unknown => return Err(SocketError::Unsupported),
    }
    Ok(())
}

/// Members of the match channel already got the broadcast; anyone else gets the result directly.
fn acknowledge_outside_group(
    state: &SharedState,
    connection_id: ConnectionId,
    outbound_tx: &mpsc::UnboundedSender<Message>,
    match_id: Uuid,
    game: MatchView,
) -> Result<(), SocketError> {
    if state.liveness().match_of(connection_id) != Some(match_id) {
        send_message_to_websocket(outbound_tx, &ServerMessage::MatchUpdated { game })?;
    }
    Ok(())
}

fn report(tx: &mpsc::UnboundedSender<Message>, message: String) -> Result<(), SocketError> {
    send_message_to_websocket(tx, &ServerMessage::Error { message })?;
    Ok(())
}

/// Ensure the writer task winds down before we return from the socket handler.
async fn finalize(writer_task: JoinHandle<()>, outbound_tx: mpsc::UnboundedSender<Message>) {
    drop(outbound_tx);
    let _ = writer_task.await;
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{
        config::AppConfig, dao::match_store::MemoryMatchStore, state::AppState,
    };

    async fn started_match() -> (SharedState, Uuid) {
        let state = AppState::new(AppConfig::default());
        state
            .install_match_store(Arc::new(MemoryMatchStore::new()))
            .await;
        let game = match_service::create_match(&state, 1, (1..=24).collect())
            .await
            .unwrap();
        match_service::join_match(&state, game.id, 2, (101..=124).collect())
            .await
            .unwrap();
        (state, game.id)
    }

    fn connect(
        state: &SharedState,
        participant: ParticipantId,
    ) -> (ConnectionId, mpsc::UnboundedSender<Message>, mpsc::UnboundedReceiver<Message>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = Uuid::new_v4();
        state.connections().insert(
            id,
            ClientConnection {
                id,
                tx: tx.clone(),
            },
        );
        liveness_service::on_connection_opened(state, id, Some(participant));
        (id, tx, rx)
    }

    fn received(rx: &mut mpsc::UnboundedReceiver<Message>) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        while let Ok(Message::Text(text)) = rx.try_recv() {
            messages.push(serde_json::from_str(text.as_str()).unwrap());
        }
        messages
    }

    #[tokio::test]
    async fn moves_from_outside_the_channel_are_acknowledged() {
        let (state, match_id) = started_match().await;
        let (connection, tx, mut rx) = connect(&state, 1);

        handle_message(
            &state,
            connection,
            1,
            &tx,
            ClientMessage::CheckCell {
                match_id,
                card_id: 5,
            },
        )
        .await
        .unwrap();

        let messages = received(&mut rx);
        assert_eq!(messages.len(), 1);
        let ServerMessage::MatchUpdated { game } = &messages[0] else {
            panic!("expected match_updated, got {messages:?}");
        };
        assert_eq!(game.creator_checked_card_ids, vec![5]);
    }

    #[tokio::test]
    async fn channel_members_get_a_single_update_per_move() {
        let (state, match_id) = started_match().await;
        let (connection, tx, mut rx) = connect(&state, 1);
        handle_message(&state, connection, 1, &tx, ClientMessage::JoinMatch { match_id })
            .await
            .unwrap();
        received(&mut rx);

        handle_message(
            &state,
            connection,
            1,
            &tx,
            ClientMessage::CheckCell {
                match_id,
                card_id: 5,
            },
        )
        .await
        .unwrap();

        let updates = received(&mut rx)
            .into_iter()
            .filter(|message| matches!(message, ServerMessage::MatchUpdated { .. }))
            .count();
        assert_eq!(updates, 1);
    }

    #[tokio::test]
    async fn outsiders_cannot_subscribe_to_a_match() {
        let (state, match_id) = started_match().await;
        let (connection, tx, mut rx) = connect(&state, 3);

        let result = handle_message(
            &state,
            connection,
            3,
            &tx,
            ClientMessage::JoinMatch { match_id },
        )
        .await;

        assert!(matches!(
            result,
            Err(SocketError::Service(ServiceError::Forbidden(_)))
        ));
        assert_eq!(state.liveness().match_of(connection), None);
        assert!(received(&mut rx).is_empty());
    }
}

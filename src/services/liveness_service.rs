//! Reacts to connection lifecycle events and derives match status changes from
//! which participants are still reachable.

use std::{collections::HashSet, time::SystemTime};

use tracing::{debug, info, warn};

use crate::{
    dto::ws::NoticeKind,
    error::ServiceError,
    services::{
        match_events::{broadcast_match_abandoned, broadcast_match_updated, broadcast_notice},
        match_service::abandon,
    },
    state::{
        SharedState,
        bingo::{Match, MatchId, ParticipantId},
        liveness::ConnectionId,
        match_machine::{MatchEvent, MatchStatus},
    },
};

/// A connection came up, possibly with a known identity.
pub fn on_connection_opened(
    state: &SharedState,
    connection_id: ConnectionId,
    participant_id: Option<ParticipantId>,
) {
    if let Some(participant_id) = participant_id {
        state
            .liveness()
            .record_participant(connection_id, participant_id);
    }
    debug!(%connection_id, ?participant_id, "connection opened");
}

/// A connection subscribed to the channel of `match_id`.
///
/// Switching channels counts as leaving the previous one.
pub async fn on_joined_group(state: &SharedState, connection_id: ConnectionId, match_id: MatchId) {
    let participant_id = state.liveness().participant_of(connection_id);
    let previous = state.liveness().join_group(connection_id, match_id);
    info!(%connection_id, %match_id, ?participant_id, "connection joined match channel");
    broadcast_notice(state, match_id, NoticeKind::ParticipantJoined, participant_id);

    if let Some(previous) = previous {
        broadcast_notice(state, previous, NoticeKind::ParticipantLeft, participant_id);
        reevaluate(state, previous).await;
    }
}

/// A connection left its match channel without closing.
pub async fn on_left_group(state: &SharedState, connection_id: ConnectionId) {
    let Some(match_id) = state.liveness().leave_group(connection_id) else {
        return;
    };
    let participant_id = state.liveness().participant_of(connection_id);
    info!(%connection_id, %match_id, ?participant_id, "connection left match channel");
    broadcast_notice(state, match_id, NoticeKind::ParticipantLeft, participant_id);
    reevaluate(state, match_id).await;
}

/// A connection went away.
pub async fn on_connection_closed(state: &SharedState, connection_id: ConnectionId) {
    state.connections().remove(&connection_id);
    let departure = state.liveness().connection_closed(connection_id);
    debug!(%connection_id, participant_id = ?departure.participant_id, "connection closed");

    let Some(match_id) = departure.match_id else {
        return;
    };
    broadcast_notice(
        state,
        match_id,
        NoticeKind::ParticipantLeft,
        departure.participant_id,
    );
    reevaluate(state, match_id).await;
}

/// Recompute the status of `match_id` from the participants still connected to it.
///
/// Failures are logged; there is no caller to report them to.
pub async fn reevaluate(state: &SharedState, match_id: MatchId) {
    let outcome = state
        .mutate_match(match_id, |game| {
            let connected: HashSet<ParticipantId> = state
                .liveness()
                .connected_participants(match_id)
                .into_iter()
                .filter(|participant| game.is_participant(*participant))
                .collect();
            apply_reachability(game, &connected)
        })
        .await;

    match outcome {
        Ok(mutation) if mutation.changed => {
            let status = mutation.game.status;
            info!(%match_id, status = status.as_str(), "liveness changed match status");
            if status == MatchStatus::Abandoned {
                broadcast_match_abandoned(state, &mutation.game);
            } else {
                broadcast_match_updated(state, &mutation.game);
            }
        }
        Ok(_) => {}
        Err(ServiceError::NotFound(_)) => {
            debug!(%match_id, "liveness event for unknown match");
        }
        Err(err) => {
            warn!(%match_id, error = %err, "failed to apply liveness change");
        }
    }
}

/// Status change implied by the set of reachable participants.
fn apply_reachability(
    game: &mut Match,
    connected: &HashSet<ParticipantId>,
) -> Result<(), ServiceError> {
    if game.status.is_terminal() {
        return Ok(());
    }

    let creator_connected = connected.contains(&game.creator.participant_id);
    match game.status {
        _ if connected.is_empty() => abandon(game),
        MatchStatus::WaitingForSecondPlayer if !creator_connected => abandon(game),
        MatchStatus::InProgress if connected.len() == 1 => {
            game.apply(MatchEvent::ParticipantLost)?;
            game.last_activity_at = Some(SystemTime::now());
            Ok(())
        }
        _ => Ok(()),
    }
}

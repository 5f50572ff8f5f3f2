use std::{collections::BTreeSet, future::Future, time::SystemTime};

use tokio::time::timeout;
use tracing::{info, warn};

use crate::{
    dto::matches::MatchView,
    error::ServiceError,
    services::match_events::{broadcast_match_abandoned, broadcast_match_updated, view},
    state::{
        SharedState,
        bingo::{CardId, Match, MatchId, ParticipantId, PlayerBoard, SELECTION_SIZE},
        match_machine::{MatchEvent, MatchStatus},
    },
};

/// Open a match for `creator` with a freshly generated board.
pub async fn create_match(
    state: &SharedState,
    creator: ParticipantId,
    selected_card_ids: Vec<CardId>,
) -> Result<MatchView, ServiceError> {
    let selected = selection_from(selected_card_ids)?;
    let store = state.require_match_store().await?;

    let game = Match::new(PlayerBoard::new(creator, selected, &mut rand::rng()));
    bounded(state, async {
        store.insert_match(game.clone().into()).await?;
        Ok(())
    })
    .await?;

    info!(match_id = %game.id, participant_id = creator, "match created");
    Ok(view(state, &game))
}

/// Take the second seat of a waiting match.
pub async fn join_match(
    state: &SharedState,
    match_id: MatchId,
    joiner: ParticipantId,
    selected_card_ids: Vec<CardId>,
) -> Result<MatchView, ServiceError> {
    let selected = selection_from(selected_card_ids)?;

    let mutation = state
        .mutate_match(match_id, |game| {
            if game.second.is_some() {
                return Err(ServiceError::Conflict(
                    "match already has two players".into(),
                ));
            }
            if game.creator.participant_id == joiner {
                return Err(ServiceError::Conflict(
                    "cannot join a match you created".into(),
                ));
            }
            game.apply(MatchEvent::SecondPlayerJoined)?;
            game.second = Some(PlayerBoard::new(joiner, selected.clone(), &mut rand::rng()));
            game.started_at = Some(SystemTime::now());
            Ok(())
        })
        .await?;

    info!(%match_id, participant_id = joiner, "second participant joined");
    broadcast_match_updated(state, &mutation.game);
    Ok(view(state, &mutation.game))
}

/// Toggle `card_id` on the caller's board and settle a win.
pub async fn check_cell(
    state: &SharedState,
    match_id: MatchId,
    caller: ParticipantId,
    card_id: CardId,
) -> Result<MatchView, ServiceError> {
    let mutation = state
        .mutate_match(match_id, |game| {
            if game.status != MatchStatus::InProgress {
                return Err(ServiceError::InvalidState(format!(
                    "cells cannot be checked while the match is {}",
                    game.status.as_str()
                )));
            }
            let seat = game.seat_of(caller).ok_or_else(not_a_participant)?;
            let board = game.board_mut(seat).ok_or_else(not_a_participant)?;
            if !board.selected_card_ids.contains(&card_id) {
                return Err(ServiceError::InvalidMove(format!(
                    "card {card_id} is not on your board"
                )));
            }

            let checked = board.toggle(card_id);
            if board.has_bingo() {
                game.apply(MatchEvent::BingoCalled(seat))?;
            }
            Ok(checked)
        })
        .await
        .inspect_err(|err| {
            if matches!(err, ServiceError::InvalidMove(_) | ServiceError::Forbidden(_)) {
                warn!(%match_id, participant_id = caller, card_id, error = %err, "rejected move");
            }
        })?;

    if mutation.game.status.is_terminal() {
        info!(%match_id, participant_id = caller, status = mutation.game.status.as_str(), "match won");
    } else {
        info!(%match_id, participant_id = caller, card_id, checked = mutation.value, "cell toggled");
    }
    broadcast_match_updated(state, &mutation.game);
    Ok(view(state, &mutation.game))
}

/// Continue a paused match; either participant may ask.
pub async fn resume_match(
    state: &SharedState,
    match_id: MatchId,
    caller: ParticipantId,
) -> Result<MatchView, ServiceError> {
    let mutation = state
        .mutate_match(match_id, |game| {
            if !game.is_participant(caller) {
                return Err(not_a_participant());
            }
            game.apply(MatchEvent::Resumed)?;
            game.last_activity_at = Some(SystemTime::now());
            Ok(())
        })
        .await?;

    info!(%match_id, participant_id = caller, "match resumed");
    broadcast_match_updated(state, &mutation.game);
    Ok(view(state, &mutation.game))
}

/// Move a match to `Abandoned`; already finished matches are returned unchanged.
pub async fn abandon_match(state: &SharedState, match_id: MatchId) -> Result<MatchView, ServiceError> {
    let mutation = state.mutate_match(match_id, abandon).await?;
    if mutation.changed {
        info!(%match_id, "match abandoned");
        broadcast_match_abandoned(state, &mutation.game);
    }
    Ok(view(state, &mutation.game))
}

/// Fetch a match the caller takes part in.
pub async fn get_match(
    state: &SharedState,
    match_id: MatchId,
    caller: ParticipantId,
) -> Result<MatchView, ServiceError> {
    let game = bounded(state, state.load_match(match_id)).await?;
    if !game.is_participant(caller) {
        return Err(not_a_participant());
    }
    Ok(view(state, &game))
}

/// Most recent unfinished match involving `participant`, used to reconnect.
pub async fn get_active_match_for_participant(
    state: &SharedState,
    participant: ParticipantId,
) -> Result<MatchView, ServiceError> {
    let store = state.require_match_store().await?;
    let entity = bounded(state, async {
        Ok(store.find_latest_active_for_participant(participant).await?)
    })
    .await?
    .ok_or_else(|| {
        ServiceError::NotFound(format!("participant {participant} has no active match"))
    })?;

    Ok(view(state, &Match::from(entity)))
}

/// Status change shared by explicit abandon calls and the liveness tracker.
pub(crate) fn abandon(game: &mut Match) -> Result<(), ServiceError> {
    if game.status.is_terminal() {
        return Ok(());
    }
    game.apply(MatchEvent::Abandoned)?;
    game.last_activity_at = Some(SystemTime::now());
    Ok(())
}

fn not_a_participant() -> ServiceError {
    ServiceError::Forbidden("caller is not a participant of this match".into())
}

fn selection_from(cards: Vec<CardId>) -> Result<BTreeSet<CardId>, ServiceError> {
    let count = cards.len();
    let selected: BTreeSet<CardId> = cards.into_iter().collect();
    if count != SELECTION_SIZE || selected.len() != SELECTION_SIZE {
        return Err(ServiceError::InvalidInput(format!(
            "exactly {SELECTION_SIZE} distinct cards must be selected"
        )));
    }
    Ok(selected)
}

async fn bounded<T>(
    state: &SharedState,
    work: impl Future<Output = Result<T, ServiceError>>,
) -> Result<T, ServiceError> {
    timeout(state.config().mutation_timeout(), work)
        .await
        .unwrap_or(Err(ServiceError::Timeout))
}

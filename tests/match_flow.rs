mod common;

use std::collections::BTreeSet;

use bingo_duel_back::{
    error::ServiceError,
    services::match_service,
    state::match_machine::MatchStatus,
};
use common::{CREATOR, SECOND, creator_cards, ready_state, second_cards};

#[tokio::test]
async fn full_match_until_creator_wins() {
    let state = ready_state().await;

    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    assert_eq!(created.status, MatchStatus::WaitingForSecondPlayer);
    assert_eq!(created.creator_board_layout.len(), 24);
    assert_eq!(created.creator_display_name.as_deref(), Some("Ada"));
    assert!(created.second_participant_id.is_none());

    let joined = match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();
    assert_eq!(joined.status, MatchStatus::InProgress);
    assert!(joined.started_at.is_some());
    assert_eq!(joined.second_participant_id, Some(SECOND));
    assert_eq!(joined.second_board_layout.len(), 24);
    assert_eq!(joined.creator_board_layout, created.creator_board_layout);
    let layout_set: BTreeSet<u32> = joined.second_board_layout.iter().copied().collect();
    assert_eq!(layout_set, second_cards().into_iter().collect());

    // The first five layout entries fill the top row.
    let top_row: Vec<u32> = joined.creator_board_layout[..5].to_vec();
    let mut last = None;
    for card in &top_row {
        last = Some(
            match_service::check_cell(&state, created.id, CREATOR, *card)
                .await
                .unwrap(),
        );
    }
    let won = last.unwrap();
    assert_eq!(won.status, MatchStatus::CreatorWon);
    assert_eq!(won.creator_checked_card_ids.len(), 5);

    for (caller, card) in [(CREATOR, creator_cards()[10]), (SECOND, second_cards()[0])] {
        let result = match_service::check_cell(&state, created.id, caller, card).await;
        assert!(matches!(result, Err(ServiceError::InvalidState(_))));
    }
    let result = match_service::resume_match(&state, created.id, SECOND).await;
    assert!(matches!(result, Err(ServiceError::InvalidState(_))));
}

#[tokio::test]
async fn second_join_conflicts_and_keeps_first_joiner() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();

    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();
    let result = match_service::join_match(&state, created.id, 3, (201..=224).collect()).await;
    assert!(matches!(result, Err(ServiceError::Conflict(_))));

    let current = match_service::get_match(&state, created.id, CREATOR)
        .await
        .unwrap();
    assert_eq!(current.second_participant_id, Some(SECOND));
}

#[tokio::test]
async fn checking_twice_restores_the_cell() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    let card = second_cards()[7];
    let once = match_service::check_cell(&state, created.id, SECOND, card)
        .await
        .unwrap();
    assert_eq!(once.second_checked_card_ids, vec![card]);

    let twice = match_service::check_cell(&state, created.id, SECOND, card)
        .await
        .unwrap();
    assert!(twice.second_checked_card_ids.is_empty());
    assert_eq!(twice.status, MatchStatus::InProgress);
}

#[tokio::test]
async fn opponent_cards_are_invalid_moves() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    let result = match_service::check_cell(&state, created.id, CREATOR, second_cards()[0]).await;
    assert!(matches!(result, Err(ServiceError::InvalidMove(_))));

    let current = match_service::get_match(&state, created.id, SECOND)
        .await
        .unwrap();
    assert!(current.creator_checked_card_ids.is_empty());
    assert!(current.second_checked_card_ids.is_empty());
}

#[tokio::test]
async fn repeated_fetches_return_the_same_layouts() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    let first = match_service::get_match(&state, created.id, CREATOR)
        .await
        .unwrap();
    let second = match_service::get_match(&state, created.id, SECOND)
        .await
        .unwrap();
    assert_eq!(first, second);
    assert_eq!(first.creator_board_layout, created.creator_board_layout);
}

#[tokio::test]
async fn racing_final_cells_produce_a_single_winner() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    let joined = match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    // Both players stand one cell away from a full top row.
    for card in &joined.creator_board_layout[..4] {
        match_service::check_cell(&state, created.id, CREATOR, *card)
            .await
            .unwrap();
    }
    for card in &joined.second_board_layout[..4] {
        match_service::check_cell(&state, created.id, SECOND, *card)
            .await
            .unwrap();
    }

    let creator_last = joined.creator_board_layout[4];
    let second_last = joined.second_board_layout[4];
    let (creator_state, second_state) = (state.clone(), state.clone());
    let id = created.id;
    let creator_move = tokio::spawn(async move {
        match_service::check_cell(&creator_state, id, CREATOR, creator_last).await
    });
    let second_move = tokio::spawn(async move {
        match_service::check_cell(&second_state, id, SECOND, second_last).await
    });
    let results = [creator_move.await.unwrap(), second_move.await.unwrap()];

    let winners: Vec<_> = results.iter().filter_map(|result| result.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    assert!(winners[0].status.is_terminal());
    assert!(
        results
            .iter()
            .any(|result| matches!(result, Err(ServiceError::InvalidState(_))))
    );

    let stored = match_service::get_match(&state, id, CREATOR).await.unwrap();
    assert_eq!(stored.status, winners[0].status);
}

#[tokio::test]
async fn reconnect_lookup_finds_the_running_match() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    let active = match_service::get_active_match_for_participant(&state, SECOND)
        .await
        .unwrap();
    assert_eq!(active.id, created.id);

    let result = match_service::get_active_match_for_participant(&state, 99).await;
    assert!(matches!(result, Err(ServiceError::NotFound(_))));
}

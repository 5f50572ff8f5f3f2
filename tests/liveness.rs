mod common;

use bingo_duel_back::{
    dto::ws::{NoticeKind, ServerMessage},
    error::ServiceError,
    services::{liveness_service, match_service},
    state::match_machine::MatchStatus,
};
use common::{CREATOR, SECOND, TestClient, creator_cards, ready_state, second_cards};

async fn status_of(state: &bingo_duel_back::state::SharedState, id: uuid::Uuid) -> MatchStatus {
    state.load_match(id).await.unwrap().status
}

#[tokio::test]
async fn disconnects_pause_then_abandon() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    let creator = TestClient::connect(&state, CREATOR);
    let mut second = TestClient::connect(&state, SECOND);
    liveness_service::on_joined_group(&state, creator.id, created.id).await;
    liveness_service::on_joined_group(&state, second.id, created.id).await;
    second.drain();

    liveness_service::on_connection_closed(&state, creator.id).await;
    assert_eq!(status_of(&state, created.id).await, MatchStatus::Paused);
    assert!(state.load_match(created.id).await.unwrap().last_activity_at.is_some());

    let messages = second.drain();
    assert!(messages.iter().any(|message| matches!(
        message,
        ServerMessage::Notice { kind: NoticeKind::ParticipantLeft, participant_id: Some(CREATOR), .. }
    )));
    assert!(messages.iter().any(|message| matches!(
        message,
        ServerMessage::MatchUpdated { game } if game.status == MatchStatus::Paused
    )));

    liveness_service::on_connection_closed(&state, second.id).await;
    assert_eq!(status_of(&state, created.id).await, MatchStatus::Abandoned);

    let result = match_service::resume_match(&state, created.id, SECOND).await;
    assert!(matches!(result, Err(ServiceError::InvalidState(_))));
}

#[tokio::test]
async fn extra_tabs_keep_a_participant_reachable() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    let first_tab = TestClient::connect(&state, CREATOR);
    let second_tab = TestClient::connect(&state, CREATOR);
    let opponent = TestClient::connect(&state, SECOND);
    for client in [&first_tab, &second_tab, &opponent] {
        liveness_service::on_joined_group(&state, client.id, created.id).await;
    }

    liveness_service::on_connection_closed(&state, first_tab.id).await;
    assert_eq!(status_of(&state, created.id).await, MatchStatus::InProgress);

    liveness_service::on_connection_closed(&state, opponent.id).await;
    assert_eq!(status_of(&state, created.id).await, MatchStatus::Paused);

    // The opponent comes back and either side resumes explicitly.
    let returning = TestClient::connect(&state, SECOND);
    liveness_service::on_joined_group(&state, returning.id, created.id).await;
    assert_eq!(status_of(&state, created.id).await, MatchStatus::Paused);

    let resumed = match_service::resume_match(&state, created.id, CREATOR)
        .await
        .unwrap();
    assert_eq!(resumed.status, MatchStatus::InProgress);
}

#[tokio::test]
async fn creator_leaving_a_waiting_match_abandons_it() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();

    let creator = TestClient::connect(&state, CREATOR);
    liveness_service::on_joined_group(&state, creator.id, created.id).await;
    liveness_service::on_left_group(&state, creator.id).await;
    assert_eq!(status_of(&state, created.id).await, MatchStatus::Abandoned);

    let result = match_service::join_match(&state, created.id, SECOND, second_cards()).await;
    assert!(matches!(result, Err(ServiceError::InvalidState(_))));
}

#[tokio::test]
async fn switching_channels_leaves_the_previous_match() {
    let state = ready_state().await;
    let first = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    let second = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();

    let creator = TestClient::connect(&state, CREATOR);
    liveness_service::on_joined_group(&state, creator.id, first.id).await;
    liveness_service::on_joined_group(&state, creator.id, second.id).await;

    assert_eq!(status_of(&state, first.id).await, MatchStatus::Abandoned);
    assert_eq!(
        status_of(&state, second.id).await,
        MatchStatus::WaitingForSecondPlayer
    );
}

#[tokio::test]
async fn finished_matches_ignore_disconnects() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    let joined = match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();

    let creator = TestClient::connect(&state, CREATOR);
    let second = TestClient::connect(&state, SECOND);
    liveness_service::on_joined_group(&state, creator.id, created.id).await;
    liveness_service::on_joined_group(&state, second.id, created.id).await;

    for card in &joined.second_board_layout[..5] {
        match_service::check_cell(&state, created.id, SECOND, *card)
            .await
            .unwrap();
    }
    assert_eq!(status_of(&state, created.id).await, MatchStatus::SecondPlayerWon);

    liveness_service::on_connection_closed(&state, creator.id).await;
    liveness_service::on_connection_closed(&state, second.id).await;
    assert_eq!(status_of(&state, created.id).await, MatchStatus::SecondPlayerWon);
    assert_eq!(state.liveness().connection_count(), 0);
}

#[tokio::test]
async fn moves_are_broadcast_to_the_channel() {
    let state = ready_state().await;
    let created = match_service::create_match(&state, CREATOR, creator_cards())
        .await
        .unwrap();
    let mut watcher = TestClient::connect(&state, CREATOR);
    liveness_service::on_joined_group(&state, watcher.id, created.id).await;
    watcher.drain();

    match_service::join_match(&state, created.id, SECOND, second_cards())
        .await
        .unwrap();
    match_service::check_cell(&state, created.id, SECOND, second_cards()[3])
        .await
        .unwrap();

    let updates: Vec<MatchStatus> = watcher
        .drain()
        .into_iter()
        .filter_map(|message| match message {
            ServerMessage::MatchUpdated { game } => Some(game.status),
            _ => None,
        })
        .collect();
    assert_eq!(updates, vec![MatchStatus::InProgress, MatchStatus::InProgress]);
}

//! DTO definitions used by the match REST API, the WebSocket channel and the documentation layer.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dto::{format_system_time, validation::validate_card_selection},
    state::{
        bingo::{CardId, Match, ParticipantId, PlayerBoard},
        directory::ParticipantDirectory,
        match_machine::MatchStatus,
    },
};

/// Payload used to open a new match.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CreateMatchRequest {
    /// The 24 distinct cards the creator picked.
    pub selected_card_ids: Vec<CardId>,
}

/// Payload used to take the second seat of a match.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct JoinMatchRequest {
    /// The 24 distinct cards the joiner picked.
    pub selected_card_ids: Vec<CardId>,
}

impl Validate for CreateMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        selection_errors(&self.selected_card_ids)
    }
}

impl Validate for JoinMatchRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        selection_errors(&self.selected_card_ids)
    }
}

fn selection_errors(cards: &[CardId]) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::new();
    if let Err(e) = validate_card_selection(cards) {
        errors.add("selected_card_ids", e);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Request to toggle one cell of the caller's own board.
#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
pub struct CheckCellRequest {
    /// Card to check or uncheck; must be one of the caller's 24.
    pub card_id: CardId,
}

/// Read projection of a match sent to both participants.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct MatchView {
    /// Match identifier.
    pub id: Uuid,
    /// Participant who opened the match.
    pub creator_participant_id: ParticipantId,
    /// Configured name of the creator, if any.
    pub creator_display_name: Option<String>,
    /// Participant holding the second seat, once someone joined.
    pub second_participant_id: Option<ParticipantId>,
    /// Configured name of the second participant, if any.
    pub second_display_name: Option<String>,
    /// Cards the creator picked, ascending.
    pub creator_selected_card_ids: Vec<CardId>,
    /// Cards the second participant picked, ascending. Empty while waiting.
    pub second_selected_card_ids: Vec<CardId>,
    /// Creator cells currently checked.
    pub creator_checked_card_ids: Vec<CardId>,
    /// Second participant cells currently checked.
    pub second_checked_card_ids: Vec<CardId>,
    /// Creator's cards in row-major order, skipping the free center cell.
    pub creator_board_layout: Vec<CardId>,
    /// Joiner's cards in row-major order, skipping the free center cell.
    pub second_board_layout: Vec<CardId>,
    pub status: MatchStatus,
    /// RFC 3339 timestamp.
    pub created_at: String,
    /// When the second participant joined.
    pub started_at: Option<String>,
    /// Last pause or resume.
    pub last_activity_at: Option<String>,
}

impl MatchView {
    /// Project `game`, resolving display names through `directory`.
    pub fn project(game: &Match, directory: &dyn ParticipantDirectory) -> Self {
        let (second_selected, second_checked, second_layout) = game
            .second
            .as_ref()
            .map(board_parts)
            .unwrap_or_default();
        let (creator_selected, creator_checked, creator_layout) = board_parts(&game.creator);
        let second_participant_id = game.second.as_ref().map(|board| board.participant_id);

        Self {
            id: game.id,
            creator_participant_id: game.creator.participant_id,
            creator_display_name: directory.display_name(game.creator.participant_id),
            second_participant_id,
            second_display_name: second_participant_id.and_then(|id| directory.display_name(id)),
            creator_selected_card_ids: creator_selected,
            second_selected_card_ids: second_selected,
            creator_checked_card_ids: creator_checked,
            second_checked_card_ids: second_checked,
            creator_board_layout: creator_layout,
            second_board_layout: second_layout,
            status: game.status,
            created_at: format_system_time(game.created_at),
            started_at: game.started_at.map(format_system_time),
            last_activity_at: game.last_activity_at.map(format_system_time),
        }
    }
}

fn board_parts(board: &PlayerBoard) -> (Vec<CardId>, Vec<CardId>, Vec<CardId>) {
    (
        board.selected_card_ids.iter().copied().collect(),
        board.checked_card_ids.iter().copied().collect(),
        board.board_layout.clone(),
    )
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::state::directory::ConfiguredDirectory;

    #[test]
    fn create_request_requires_a_full_selection() {
        let ok = CreateMatchRequest {
            selected_card_ids: (1..=24).collect(),
        };
        assert!(ok.validate().is_ok());

        let short = CreateMatchRequest {
            selected_card_ids: (1..=10).collect(),
        };
        let errors = short.validate().unwrap_err();
        assert!(errors.field_errors().contains_key("selected_card_ids"));
    }

    #[test]
    fn projection_resolves_names_and_empty_second_seat() {
        let directory = ConfiguredDirectory::new([(1, "Ada".to_string())]);
        let mut rng = StdRng::seed_from_u64(2);
        let game = Match::new(PlayerBoard::new(1, (1..=24).collect(), &mut rng));

        let view = MatchView::project(&game, &directory);
        assert_eq!(view.creator_display_name.as_deref(), Some("Ada"));
        assert_eq!(view.second_participant_id, None);
        assert!(view.second_board_layout.is_empty());
        assert_eq!(view.creator_board_layout, game.creator.board_layout);
        assert_eq!(view.status, MatchStatus::WaitingForSecondPlayer);
        assert!(view.started_at.is_none());
    }
}

use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use uuid::Uuid;

use crate::state::match_machine::MatchStatus;

/// One player's board as persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerBoardEntity {
    /// Owner of the board.
    pub participant_id: i64,
    /// The 24 card ids picked before the match, ascending.
    pub selected_card_ids: Vec<u32>,
    /// Placement of the selected cards, written once.
    pub board_layout: Vec<u32>,
    /// Cards currently checked, ascending.
    pub checked_card_ids: Vec<u32>,
}

/// Aggregate match entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MatchEntity {
    /// Primary key of the match.
    pub id: Uuid,
    /// Board of the participant who created the match.
    pub creator: PlayerBoardEntity,
    /// Board of the participant who joined, once joined.
    pub second: Option<PlayerBoardEntity>,
    /// Lifecycle status.
    pub status: MatchStatus,
    /// Creation timestamp.
    pub created_at: SystemTime,
    /// Time the second participant joined.
    pub started_at: Option<SystemTime>,
    /// Time of the last pause/resume/abandon transition.
    pub last_activity_at: Option<SystemTime>,
    /// Revision, bumped by one on every successful update.
    pub version: u64,
}

impl MatchEntity {
    /// Whether `participant` owns one of the two boards.
    pub fn involves(&self, participant: i64) -> bool {
        self.creator.participant_id == participant
            || self
                .second
                .as_ref()
                .is_some_and(|board| board.participant_id == participant)
    }
}

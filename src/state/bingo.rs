use std::{collections::BTreeSet, time::SystemTime};

use rand::{Rng, seq::SliceRandom};
use uuid::Uuid;

use crate::{
    dao::models::{MatchEntity, PlayerBoardEntity},
    state::match_machine::{InvalidTransition, MatchEvent, MatchStatus, Seat, next_status},
};

/// Identifier of a bingo card (a phrase tile a player picked).
pub type CardId = u32;
/// Verified identity of a player, as handed in by the identity provider.
pub type ParticipantId = i64;
/// Identifier of a match.
pub type MatchId = Uuid;

/// Number of cards each player picks before a match.
pub const SELECTION_SIZE: usize = 24;
/// Width and height of the board grid.
pub const BOARD_SIDE: usize = 5;
const FREE_CELL: (usize, usize) = (2, 2);

/// Produce a uniformly random placement of `selected` on the board.
///
/// The random source is injected so tests can pass a seeded generator; the
/// engine uses the thread-local generator.
pub fn generate_layout<R>(selected: &BTreeSet<CardId>, rng: &mut R) -> Vec<CardId>
where
    R: Rng + ?Sized,
{
    let mut layout: Vec<CardId> = selected.iter().copied().collect();
    layout.shuffle(rng);
    layout
}

/// Whether any row, column or diagonal of the board is fully satisfied.
///
/// `layout` fills the 5x5 grid row by row, skipping the free center cell which
/// always counts as satisfied. Cells without a layout entry are never satisfied.
pub fn has_bingo(layout: &[CardId], checked: &BTreeSet<CardId>) -> bool {
    let grid = satisfied_grid(layout, checked);

    let any_row = (0..BOARD_SIDE).any(|row| (0..BOARD_SIDE).all(|col| grid[row][col]));
    let any_col = (0..BOARD_SIDE).any(|col| (0..BOARD_SIDE).all(|row| grid[row][col]));
    let main_diagonal = (0..BOARD_SIDE).all(|i| grid[i][i]);
    let anti_diagonal = (0..BOARD_SIDE).all(|i| grid[i][BOARD_SIDE - 1 - i]);

    any_row || any_col || main_diagonal || anti_diagonal
}

fn satisfied_grid(layout: &[CardId], checked: &BTreeSet<CardId>) -> [[bool; BOARD_SIDE]; BOARD_SIDE] {
    let mut grid = [[false; BOARD_SIDE]; BOARD_SIDE];
    let mut cards = layout.iter();

    for (row, cells) in grid.iter_mut().enumerate() {
        for (col, cell) in cells.iter_mut().enumerate() {
            *cell = if (row, col) == FREE_CELL {
                true
            } else {
                cards.next().is_some_and(|card| checked.contains(card))
            };
        }
    }

    grid
}

/// One player's side of a match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerBoard {
    /// Owner of this board.
    pub participant_id: ParticipantId,
    /// The 24 cards picked before the match.
    pub selected_card_ids: BTreeSet<CardId>,
    /// Placement of the selected cards, fixed once generated.
    pub board_layout: Vec<CardId>,
    /// Cards currently marked by the owner.
    pub checked_card_ids: BTreeSet<CardId>,
}

impl PlayerBoard {
    /// Build a fresh board, laying out the selection once.
    pub fn new<R>(participant_id: ParticipantId, selected: BTreeSet<CardId>, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let board_layout = generate_layout(&selected, rng);
        Self {
            participant_id,
            selected_card_ids: selected,
            board_layout,
            checked_card_ids: BTreeSet::new(),
        }
    }

    /// Flip the checked state of `card`, returning whether it is now checked.
    pub fn toggle(&mut self, card: CardId) -> bool {
        if self.checked_card_ids.remove(&card) {
            false
        } else {
            self.checked_card_ids.insert(card);
            true
        }
    }

    /// Run the win detector over this board.
    pub fn has_bingo(&self) -> bool {
        has_bingo(&self.board_layout, &self.checked_card_ids)
    }
}

/// Aggregate root for a two-player bingo match.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Match {
    /// Identifier generated at creation.
    pub id: MatchId,
    /// The creator's board.
    pub creator: PlayerBoard,
    /// The joiner's board, once somebody joined.
    pub second: Option<PlayerBoard>,
    /// Current lifecycle status.
    pub status: MatchStatus,
    /// Creation time.
    pub created_at: SystemTime,
    /// Time the second participant joined.
    pub started_at: Option<SystemTime>,
    /// Time of the last pause, resume or abandon transition.
    pub last_activity_at: Option<SystemTime>,
    /// Store revision used for optimistic concurrency.
    pub version: u64,
}

impl Match {
    /// Start a new match waiting for a second participant.
    pub fn new(creator: PlayerBoard) -> Self {
        Self {
            id: Uuid::new_v4(),
            creator,
            second: None,
            status: MatchStatus::WaitingForSecondPlayer,
            created_at: SystemTime::now(),
            started_at: None,
            last_activity_at: None,
            version: 0,
        }
    }

    /// Seat held by `participant`, if any.
    pub fn seat_of(&self, participant: ParticipantId) -> Option<Seat> {
        if self.creator.participant_id == participant {
            Some(Seat::Creator)
        } else if self
            .second
            .as_ref()
            .is_some_and(|board| board.participant_id == participant)
        {
            Some(Seat::Second)
        } else {
            None
        }
    }

    /// Whether `participant` is one of the (at most two) players.
    pub fn is_participant(&self, participant: ParticipantId) -> bool {
        self.seat_of(participant).is_some()
    }

    /// Identities of the attached participants.
    pub fn participants(&self) -> Vec<ParticipantId> {
        std::iter::once(self.creator.participant_id)
            .chain(self.second.as_ref().map(|board| board.participant_id))
            .collect()
    }

    /// Mutable access to the board behind `seat`.
    pub fn board_mut(&mut self, seat: Seat) -> Option<&mut PlayerBoard> {
        match seat {
            Seat::Creator => Some(&mut self.creator),
            Seat::Second => self.second.as_mut(),
        }
    }

    /// Apply a status event, leaving the match untouched when it is illegal.
    pub fn apply(&mut self, event: MatchEvent) -> Result<MatchStatus, InvalidTransition> {
        self.status = next_status(self.status, event)?;
        Ok(self.status)
    }
}

impl From<PlayerBoardEntity> for PlayerBoard {
    fn from(value: PlayerBoardEntity) -> Self {
        Self {
            participant_id: value.participant_id,
            selected_card_ids: value.selected_card_ids.into_iter().collect(),
            board_layout: value.board_layout,
            checked_card_ids: value.checked_card_ids.into_iter().collect(),
        }
    }
}

impl From<PlayerBoard> for PlayerBoardEntity {
    fn from(value: PlayerBoard) -> Self {
        Self {
            participant_id: value.participant_id,
            selected_card_ids: value.selected_card_ids.into_iter().collect(),
            board_layout: value.board_layout,
            checked_card_ids: value.checked_card_ids.into_iter().collect(),
        }
    }
}

impl From<MatchEntity> for Match {
    fn from(value: MatchEntity) -> Self {
        Self {
            id: value.id,
            creator: value.creator.into(),
            second: value.second.map(Into::into),
            status: value.status,
            created_at: value.created_at,
            started_at: value.started_at,
            last_activity_at: value.last_activity_at,
            version: value.version,
        }
    }
}

impl From<Match> for MatchEntity {
    fn from(value: Match) -> Self {
        Self {
            id: value.id,
            creator: value.creator.into(),
            second: value.second.map(Into::into),
            status: value.status,
            created_at: value.created_at,
            started_at: value.started_at,
            last_activity_at: value.last_activity_at,
            version: value.version,
        }
    }
}

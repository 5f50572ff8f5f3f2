use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

/// Which of the two boards of a match an action refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum Seat {
    /// The participant who created the match.
    Creator,
    /// The participant who joined the match.
    Second,
}

/// Authoritative lifecycle status of a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
pub enum MatchStatus {
    /// Created; only the creator is attached.
    WaitingForSecondPlayer,
    /// Both participants attached and at least one of them reachable.
    InProgress,
    /// One participant dropped while the match was running.
    Paused,
    /// The creator completed a line.
    CreatorWon,
    /// The second participant completed a line.
    SecondPlayerWon,
    /// Nobody is left to play.
    Abandoned,
}

impl MatchStatus {
    /// Statuses that are never left again.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            MatchStatus::CreatorWon | MatchStatus::SecondPlayerWon | MatchStatus::Abandoned
        )
    }

    /// Stable name, identical to the serialized form.
    pub fn as_str(self) -> &'static str {
        match self {
            MatchStatus::WaitingForSecondPlayer => "WaitingForSecondPlayer",
            MatchStatus::InProgress => "InProgress",
            MatchStatus::Paused => "Paused",
            MatchStatus::CreatorWon => "CreatorWon",
            MatchStatus::SecondPlayerWon => "SecondPlayerWon",
            MatchStatus::Abandoned => "Abandoned",
        }
    }

    /// Every status a match can still be mutated from.
    pub const ACTIVE: [MatchStatus; 3] = [
        MatchStatus::WaitingForSecondPlayer,
        MatchStatus::InProgress,
        MatchStatus::Paused,
    ];
}

/// Events that move a match between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchEvent {
    /// A second participant joined the match.
    SecondPlayerJoined,
    /// A checked cell completed a line on the given seat's board.
    BingoCalled(Seat),
    /// Exactly one participant is still reachable.
    ParticipantLost,
    /// A participant asked to continue after a pause.
    Resumed,
    /// No participant is reachable anymore.
    Abandoned,
}

/// Error returned when an event cannot be applied from the current status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid transition: {event:?} cannot be applied while {from:?}")]
pub struct InvalidTransition {
    /// Status the match was in when the event arrived.
    pub from: MatchStatus,
    /// The rejected event.
    pub event: MatchEvent,
}

/// Compute the status reached by applying `event` from `from`.
pub fn next_status(from: MatchStatus, event: MatchEvent) -> Result<MatchStatus, InvalidTransition> {
    let next = match (from, event) {
        (MatchStatus::WaitingForSecondPlayer, MatchEvent::SecondPlayerJoined) => {
            MatchStatus::InProgress
        }
        (MatchStatus::InProgress, MatchEvent::BingoCalled(Seat::Creator)) => {
            MatchStatus::CreatorWon
        }
        (MatchStatus::InProgress, MatchEvent::BingoCalled(Seat::Second)) => {
            MatchStatus::SecondPlayerWon
        }
        (MatchStatus::InProgress, MatchEvent::ParticipantLost) => MatchStatus::Paused,
        (MatchStatus::Paused, MatchEvent::Resumed) => MatchStatus::InProgress,
        (
            MatchStatus::WaitingForSecondPlayer | MatchStatus::InProgress | MatchStatus::Paused,
            MatchEvent::Abandoned,
        ) => MatchStatus::Abandoned,
        (from, event) => return Err(InvalidTransition { from, event }),
    };

    Ok(next)
}

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    dto::matches::MatchView,
    state::bingo::{CardId, ParticipantId},
};

#[derive(Debug, Deserialize, Serialize, ToSchema)]
/// Messages accepted from match WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Announce the caller identity when the upgrade request carried none.
    Identify {
        /// Identity to bind to this connection.
        participant_id: ParticipantId,
    },
    /// Subscribe this connection to a match channel.
    JoinMatch {
        /// Channel to join.
        match_id: Uuid,
    },
    /// Unsubscribe this connection from its match channel.
    LeaveMatch,
    /// Toggle one cell of the caller's board.
    CheckCell {
        /// Match the move belongs to.
        match_id: Uuid,
        /// Card to toggle.
        card_id: CardId,
    },
    /// Continue a paused match.
    Resume {
        /// Match to resume.
        match_id: Uuid,
    },
    /// Any message type this server does not know.
    #[serde(other)]
    Unknown,
}

impl ClientMessage {
    /// Parse one text frame.
    pub fn from_json_str(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }
}

/// Kind of membership change announced on a match channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    /// A connection of a participant joined the channel.
    ParticipantJoined,
    /// A connection left the channel or closed.
    ParticipantLeft,
}

#[derive(Debug, Clone, Deserialize, Serialize, ToSchema)]
/// Messages pushed to match WebSocket clients.
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Acknowledges the identity bound to this connection.
    Identified {
        /// Identity now bound to this connection.
        participant_id: ParticipantId,
    },
    /// Full state of a match after a change.
    MatchUpdated {
        /// Current match state.
        #[serde(rename = "match")]
        game: MatchView,
    },
    /// Best-effort membership notice; carries no state.
    Notice {
        /// Channel the notice concerns.
        match_id: Uuid,
        /// What happened.
        kind: NoticeKind,
        /// Participant behind the connection, when known.
        participant_id: Option<ParticipantId>,
    },
    /// The match ended because nobody was left to play.
    MatchAbandoned {
        /// Final match state.
        #[serde(rename = "match")]
        game: MatchView,
    },
    /// A request from this connection was refused.
    Error {
        /// Reason for the refusal.
        message: String,
    },
}

//! Connection bookkeeping used to decide which participants of a match are reachable.

use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

use crate::state::bingo::{MatchId, ParticipantId};

/// Identifier of one live real-time connection.
pub type ConnectionId = Uuid;

/// What a closing connection was attached to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Departure {
    /// The connection that went away.
    pub connection_id: ConnectionId,
    /// Identity the connection was opened with, if any.
    pub participant_id: Option<ParticipantId>,
    /// Match group the connection had joined, if any.
    pub match_id: Option<MatchId>,
}

/// Concurrent maps from live connections to participants and match groups.
///
/// A participant may hold several connections at once; reachability is always
/// evaluated over distinct participant ids.
#[derive(Debug, Default)]
pub struct LivenessTracker {
    participants: DashMap<ConnectionId, ParticipantId>,
    groups: DashMap<ConnectionId, MatchId>,
}

impl LivenessTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember the identity behind `connection_id`.
    pub fn record_participant(&self, connection_id: ConnectionId, participant_id: ParticipantId) {
        self.participants.insert(connection_id, participant_id);
    }

    /// Identity behind `connection_id`, if known.
    pub fn participant_of(&self, connection_id: ConnectionId) -> Option<ParticipantId> {
        self.participants.get(&connection_id).map(|entry| *entry)
    }

    /// Attach `connection_id` to the group of `match_id`, returning the group it left.
    pub fn join_group(&self, connection_id: ConnectionId, match_id: MatchId) -> Option<MatchId> {
        self.groups
            .insert(connection_id, match_id)
            .filter(|previous| *previous != match_id)
    }

    /// Detach `connection_id` from its group.
    pub fn leave_group(&self, connection_id: ConnectionId) -> Option<MatchId> {
        self.groups.remove(&connection_id).map(|(_, match_id)| match_id)
    }

    /// Group `connection_id` has joined, if any.
    pub fn match_of(&self, connection_id: ConnectionId) -> Option<MatchId> {
        self.groups.get(&connection_id).map(|entry| *entry)
    }

    /// Forget `connection_id` entirely.
    pub fn connection_closed(&self, connection_id: ConnectionId) -> Departure {
        let participant_id = self
            .participants
            .remove(&connection_id)
            .map(|(_, participant)| participant);
        let match_id = self.leave_group(connection_id);
        Departure {
            connection_id,
            participant_id,
            match_id,
        }
    }

    /// Connections currently joined to `match_id`.
    pub fn connections_in(&self, match_id: MatchId) -> Vec<ConnectionId> {
        self.groups
            .iter()
            .filter(|entry| *entry.value() == match_id)
            .map(|entry| *entry.key())
            .collect()
    }

    /// Distinct identified participants with at least one connection in `match_id`.
    pub fn connected_participants(&self, match_id: MatchId) -> HashSet<ParticipantId> {
        // Collect first so no shard of `groups` is held while reading `participants`.
        self.connections_in(match_id)
            .into_iter()
            .filter_map(|connection_id| self.participant_of(connection_id))
            .collect()
    }

    /// Number of tracked connections.
    pub fn connection_count(&self) -> usize {
        self.participants.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distinct_participants_are_counted_once() {
        let tracker = LivenessTracker::new();
        let game = Uuid::new_v4();
        let (tab_a, tab_b, other) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        tracker.record_participant(tab_a, 1);
        tracker.record_participant(tab_b, 1);
        tracker.record_participant(other, 2);
        tracker.join_group(tab_a, game);
        tracker.join_group(tab_b, game);
        tracker.join_group(other, game);

        assert_eq!(tracker.connections_in(game).len(), 3);
        assert_eq!(tracker.connected_participants(game), HashSet::from([1, 2]));

        tracker.connection_closed(tab_a);
        assert_eq!(tracker.connected_participants(game), HashSet::from([1, 2]));

        tracker.connection_closed(tab_b);
        assert_eq!(tracker.connected_participants(game), HashSet::from([2]));
    }

    #[test]
    fn closing_reports_what_the_connection_held() {
        let tracker = LivenessTracker::new();
        let game = Uuid::new_v4();
        let connection = Uuid::new_v4();
        tracker.record_participant(connection, 7);
        tracker.join_group(connection, game);

        let departure = tracker.connection_closed(connection);
        assert_eq!(departure.participant_id, Some(7));
        assert_eq!(departure.match_id, Some(game));
        assert_eq!(tracker.connection_count(), 0);
        assert!(tracker.match_of(connection).is_none());
    }

    #[test]
    fn anonymous_connections_are_not_participants() {
        let tracker = LivenessTracker::new();
        let game = Uuid::new_v4();
        let anonymous = Uuid::new_v4();
        tracker.join_group(anonymous, game);

        assert_eq!(tracker.connections_in(game), vec![anonymous]);
        assert!(tracker.connected_participants(game).is_empty());

        let departure = tracker.connection_closed(anonymous);
        assert_eq!(departure.participant_id, None);
        assert_eq!(departure.match_id, Some(game));
    }

    #[test]
    fn switching_groups_reports_the_previous_one() {
        let tracker = LivenessTracker::new();
        let (first, second) = (Uuid::new_v4(), Uuid::new_v4());
        let connection = Uuid::new_v4();

        assert_eq!(tracker.join_group(connection, first), None);
        assert_eq!(tracker.join_group(connection, first), None);
        assert_eq!(tracker.join_group(connection, second), Some(first));
        assert!(tracker.connections_in(first).is_empty());
        assert_eq!(tracker.leave_group(connection), Some(second));
    }
}

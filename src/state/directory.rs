use std::collections::HashMap;

use crate::state::bingo::ParticipantId;

/// Resolves display names for participants when projecting match views.
pub trait ParticipantDirectory: Send + Sync {
    /// Display name for `participant`, if known.
    fn display_name(&self, participant: ParticipantId) -> Option<String>;
}

/// Directory backed by the participants listed in the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ConfiguredDirectory {
    names: HashMap<ParticipantId, String>,
}

impl ConfiguredDirectory {
    /// Build a directory from `(id, name)` pairs; later duplicates win.
    pub fn new(entries: impl IntoIterator<Item = (ParticipantId, String)>) -> Self {
        Self {
            names: entries.into_iter().collect(),
        }
    }
}

impl ParticipantDirectory for ConfiguredDirectory {
    fn display_name(&self, participant: ParticipantId) -> Option<String> {
        self.names.get(&participant).cloned()
    }
}

//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

use crate::state::bingo::ParticipantId;

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "BINGO_DUEL_BACK_CONFIG_PATH";
const DEFAULT_MUTATION_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_CONFLICT_RETRIES: u32 = 3;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    mutation_timeout: Duration,
    conflict_retries: u32,
    participants: Vec<(ParticipantId, String)>,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        participants = app_config.participants.len(),
                        timeout_ms = app_config.mutation_timeout.as_millis() as u64,
                        "loaded configuration"
                    );
                    app_config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Upper bound for one read-modify-write of a match.
    pub fn mutation_timeout(&self) -> Duration {
        self.mutation_timeout
    }

    /// How many times a mutation is re-validated after a version conflict.
    pub fn conflict_retries(&self) -> u32 {
        self.conflict_retries
    }

    /// Known participants and their display names.
    pub fn participants(&self) -> &[(ParticipantId, String)] {
        &self.participants
    }

    /// Replace the mutation timeout.
    pub fn with_mutation_timeout(mut self, timeout: Duration) -> Self {
        self.mutation_timeout = timeout;
        self
    }

    /// Replace the participant directory entries.
    pub fn with_participants(
        mut self,
        participants: impl IntoIterator<Item = (ParticipantId, String)>,
    ) -> Self {
        self.participants = participants.into_iter().collect();
        self
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            mutation_timeout: Duration::from_millis(DEFAULT_MUTATION_TIMEOUT_MS),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            participants: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    mutation_timeout_ms: u64,
    conflict_retries: u32,
    participants: Vec<RawParticipant>,
}

impl Default for RawConfig {
    fn default() -> Self {
        Self {
            mutation_timeout_ms: DEFAULT_MUTATION_TIMEOUT_MS,
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            participants: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of a single directory entry.
struct RawParticipant {
    id: ParticipantId,
    display_name: String,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            mutation_timeout: Duration::from_millis(value.mutation_timeout_ms.max(1)),
            conflict_retries: value.conflict_retries,
            participants: value
                .participants
                .into_iter()
                .map(|entry| (entry.id, entry.display_name))
                .collect(),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}

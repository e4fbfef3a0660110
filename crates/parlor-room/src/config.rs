//! Room configuration and the match status state machine.

use std::time::Duration;

use parlor_timer::ThinkDelay;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RoomConfig
// ---------------------------------------------------------------------------

/// When a waiting room turns into a running match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StartPolicy {
    /// Start as soon as `min_players` seats have joined.
    #[default]
    AutoOnMinPlayers,
    /// Start once at least `min_players` seats joined and every one of them
    /// sent `ready`. Bot seats are always ready.
    AllReady,
}

/// Configuration for a match room.
///
/// Rules strategies override these defaults through
/// `RulesStrategy::room_config()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    /// Minimum seats required to start.
    pub min_players: usize,

    /// Maximum initial (turn-taking) seats.
    pub max_players: usize,

    pub start: StartPolicy,

    /// Whether seats joining after the start are admitted as spectators.
    pub allow_spectators: bool,

    /// Maximum number of spectators (0 = unlimited when allowed).
    pub max_spectators: usize,

    /// How long a finished room stays readable before teardown.
    pub teardown_grace: Duration,

    /// How long a new room waits for its first initial seat before it
    /// disposes itself.
    pub idle_timeout: Duration,

    /// Think delay applied before every bot move.
    pub bot_think: ThinkDelay,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            min_players: 2,
            max_players: 4,
            start: StartPolicy::default(),
            allow_spectators: true,
            max_spectators: 0,
            teardown_grace: Duration::from_secs(10),
            idle_timeout: Duration::from_secs(30),
            bot_think: ThinkDelay::default(),
        }
    }
}

// ---------------------------------------------------------------------------
// MatchStatus
// ---------------------------------------------------------------------------

/// Lifecycle of a match.
///
/// ```text
/// Waiting → InProgress → Finished
/// ```
///
/// `Finished` is terminal: the only thing left to happen is teardown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStatus {
    Waiting,
    InProgress,
    Finished,
}

impl MatchStatus {
    /// Returns `true` if new seats join as turn-taking players.
    pub fn is_joinable(&self) -> bool {
        matches!(self, Self::Waiting)
    }

    pub fn is_active(&self) -> bool {
        matches!(self, Self::InProgress)
    }

    /// The only status reachable from this one, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Waiting => Some(Self::InProgress),
            Self::InProgress => Some(Self::Finished),
            Self::Finished => None,
        }
    }

    pub fn can_transition_to(self, target: Self) -> bool {
        self.next() == Some(target)
    }
}

impl std::fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Waiting => write!(f, "waiting"),
            Self::InProgress => write!(f, "in_progress"),
            Self::Finished => write!(f, "finished"),
        }
    }
}

//! Turn rotation, the current phase, and the match status.

use std::collections::HashSet;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use parlor_protocol::{Phase, PlayerId};
use tokio::time::Instant;

use crate::MatchStatus;

/// Phase reported while the room is still waiting for players.
pub const LOBBY_PHASE: &str = "lobby";

/// Owns the status state machine and the rotation over initial players.
///
/// The rotation is fixed at [`start`](Self::start) and never shrinks.
/// Forfeited seats stay in it but are skipped by [`advance`](Self::advance).
#[derive(Debug)]
pub struct TurnScheduler {
    status: MatchStatus,
    rotation: Vec<PlayerId>,
    cursor: usize,
    phase: Phase,
    turn_number: u64,
    turn_started_at_ms: Option<u64>,
    forfeited: HashSet<PlayerId>,
    winner: Option<PlayerId>,
    is_draw: bool,
    started_at: Option<Instant>,
    finished_at: Option<Instant>,
}

impl Default for TurnScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnScheduler {
    pub fn new() -> Self {
        Self {
            status: MatchStatus::Waiting,
            rotation: Vec::new(),
            cursor: 0,
            phase: Phase::new(LOBBY_PHASE),
            turn_number: 0,
            turn_started_at_ms: None,
            forfeited: HashSet::new(),
            winner: None,
            is_draw: false,
            started_at: None,
            finished_at: None,
        }
    }

    /// Moves `Waiting → InProgress` with the first seat of `rotation` to act.
    ///
    /// Returns the first turn holder, or `None` if the match cannot start
    /// (already started, or nobody to play).
    pub fn start(&mut self, rotation: Vec<PlayerId>, phase: Phase) -> Option<PlayerId> {
        if !self.status.can_transition_to(MatchStatus::InProgress) {
            return None;
        }
        let first = *rotation.first()?;
        self.rotation = rotation;
        self.cursor = 0;
        self.phase = phase;
        self.turn_number = 1;
        self.turn_started_at_ms = Some(unix_millis());
        self.status = MatchStatus::InProgress;
        self.started_at = Some(Instant::now());
        Some(first)
    }

    /// Passes the turn to the next non-forfeited seat, wrapping around.
    /// Returns the new turn holder.
    pub fn advance(&mut self) -> Option<PlayerId> {
        if self.status != MatchStatus::InProgress || self.rotation.is_empty() {
            return None;
        }
        let len = self.rotation.len();
        for step in 1..=len {
            let index = (self.cursor + step) % len;
            let seat = self.rotation[index];
            if !self.forfeited.contains(&seat) {
                self.cursor = index;
                self.turn_number += 1;
                self.turn_started_at_ms = Some(unix_millis());
                return Some(seat);
            }
        }
        None
    }

    /// Sets the phase. Returns `true` if it changed.
    pub fn set_phase(&mut self, phase: Phase) -> bool {
        if self.phase == phase {
            return false;
        }
        self.phase = phase;
        true
    }

    /// Moves `InProgress → Finished`. Returns `false` if the match was not
    /// running, so a result is recorded at most once.
    pub fn finish(&mut self, winner: Option<PlayerId>, is_draw: bool) -> bool {
        if !self.status.can_transition_to(MatchStatus::Finished) {
            return false;
        }
        self.status = MatchStatus::Finished;
        self.winner = winner;
        self.is_draw = is_draw;
        self.finished_at = Some(Instant::now());
        true
    }

    /// Takes `seat` out of contention. Returns `false` if it was not in the
    /// rotation or already forfeited.
    pub fn forfeit(&mut self, seat: PlayerId) -> bool {
        self.rotation.contains(&seat) && self.forfeited.insert(seat)
    }

    pub fn is_forfeited(&self, seat: PlayerId) -> bool {
        self.forfeited.contains(&seat)
    }

    /// Seats of the rotation still in contention, in turn order.
    pub fn contenders(&self) -> Vec<PlayerId> {
        self.rotation
            .iter()
            .copied()
            .filter(|seat| !self.forfeited.contains(seat))
            .collect()
    }

    /// The turn holder. `None` before the match starts.
    pub fn current(&self) -> Option<PlayerId> {
        if self.status == MatchStatus::Waiting {
            return None;
        }
        self.rotation.get(self.cursor).copied()
    }

    pub fn status(&self) -> MatchStatus {
        self.status
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn rotation(&self) -> &[PlayerId] {
        &self.rotation
    }

    pub fn turn_number(&self) -> u64 {
        self.turn_number
    }

    /// Unix milliseconds at which the current turn began. Display only.
    pub fn turn_started_at_ms(&self) -> Option<u64> {
        self.turn_started_at_ms
    }

    pub fn winner(&self) -> Option<PlayerId> {
        self.winner
    }

    pub fn is_draw(&self) -> bool {
        self.is_draw
    }

    /// Time from start to finish, or to now while running.
    pub fn duration(&self) -> Duration {
        match (self.started_at, self.finished_at) {
            (Some(start), Some(end)) => end.duration_since(start),
            (Some(start), None) => start.elapsed(),
            _ => Duration::ZERO,
        }
    }
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

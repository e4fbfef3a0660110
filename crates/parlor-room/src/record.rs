//! Match history persistence.
//!
//! When a match finishes, the room hands one [`MatchRecord`] to its
//! [`MatchRecorder`]. Recording runs in a spawned task: a slow or failing
//! store is logged and never delays teardown.

use std::sync::Mutex;

use async_trait::async_trait;
use parlor_protocol::{PlayerId, RoomId};
use serde::{Deserialize, Serialize};

/// An initial player as stored in match history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    pub seat: PlayerId,
    pub identity: String,
    pub display_name: String,
    pub is_bot: bool,
}

/// The result of one finished match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub room_id: RoomId,
    pub game_type: String,
    pub winner: Option<PlayerId>,
    /// Stable identity of the winner, if there is one.
    pub winner_identity: Option<String>,
    pub is_draw: bool,
    pub participants: Vec<Participant>,
    /// At least one participant was a bot.
    pub vs_bot: bool,
    pub duration_ms: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("record store unavailable: {0}")]
    Unavailable(String),

    #[error("record rejected: {0}")]
    Rejected(String),
}

/// Stores finished-match results.
///
/// Object safe, so a manager can share one `Arc<dyn MatchRecorder>` across
/// every room it creates.
#[async_trait]
pub trait MatchRecorder: Send + Sync {
    async fn record_match(&self, record: MatchRecord) -> Result<(), RecordError>;
}

/// Writes each record to the log and keeps nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingRecorder;

#[async_trait]
impl MatchRecorder for TracingRecorder {
    async fn record_match(&self, record: MatchRecord) -> Result<(), RecordError> {
        tracing::info!(
            room_id = %record.room_id,
            game_type = %record.game_type,
            winner = ?record.winner,
            is_draw = record.is_draw,
            vs_bot = record.vs_bot,
            duration_ms = record.duration_ms,
            participants = record.participants.len(),
            "match recorded"
        );
        Ok(())
    }
}

/// Keeps records in memory. Useful for tests and single-process demos.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<MatchRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of everything recorded so far, oldest first.
    pub fn records(&self) -> Vec<MatchRecord> {
        self.records
            .lock()
            .map(|records| records.clone())
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().map(|records| records.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl MatchRecorder for MemoryRecorder {
    async fn record_match(&self, record: MatchRecord) -> Result<(), RecordError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| RecordError::Unavailable("record store poisoned".into()))?;
        records.push(record);
        Ok(())
    }
}

//! Core protocol types for Parlor's wire format.
//!
//! Everything in this module travels between a match room and its clients:
//! seat and room identifiers, the inbound [`Command`] set, the outbound
//! [`Event`] set, and the data carried by the pending-action protocol.
//!
//! Game-specific payloads are generic parameters. A room for a card game
//! instantiates `Command<CardMove>` and `Event<CardEvent>`; the framework
//! never looks inside them.

use serde::{Deserialize, Serialize};

use std::fmt;

// ---------------------------------------------------------------------------
// Identity types
// ---------------------------------------------------------------------------

/// A seat in a match room, keyed by the transport session handle.
///
/// Serialized as a plain number (`#[serde(transparent)]`), so `PlayerId(42)`
/// is `42` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

/// A unique identifier for one match room.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(pub u64);

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R-{}", self.0)
    }
}

/// Identifies one entry of a room's pending-action stack.
///
/// Ids are allocated per room and never reused within it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ActionId(pub u64);

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "A-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Recipient
// ---------------------------------------------------------------------------

/// Who should receive an outbound event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Recipient {
    /// Every seat in the room, spectators included.
    All,
    /// One specific seat.
    Player(PlayerId),
    /// Everyone except the given seat.
    AllExcept(PlayerId),
}

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// A game-defined sub-state of an in-progress match (`draw`, `play`, ...).
///
/// The framework itself only ever sets two phases: [`Phase::RESPOND`] while
/// a pending action awaits its responder, and [`Phase::PAY`] while debts
/// created by a resolved action are outstanding. Everything else is chosen
/// by the rules strategy.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Phase(String);

impl Phase {
    /// Response-gated phase entered while the action stack is non-empty.
    pub const RESPOND: &'static str = "respond";
    /// Debt-settlement phase entered after a resolution created debts.
    pub const PAY: &'static str = "pay";

    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn respond() -> Self {
        Self::new(Self::RESPOND)
    }

    pub fn pay() -> Self {
        Self::new(Self::PAY)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns `true` for the two phases owned by the framework.
    pub fn is_reserved(&self) -> bool {
        self.0 == Self::RESPOND || self.0 == Self::PAY
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Phase {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

// ---------------------------------------------------------------------------
// Pending actions
// ---------------------------------------------------------------------------

/// What a stack entry does once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ActionKind {
    /// A contingent game effect, named by the rules strategy
    /// (`"rent"`, `"steal"`, ...).
    Effect { name: String },
    /// A counter played against the entry with id `negates`. Counters have
    /// no effect of their own beyond negation.
    Counter { negates: ActionId },
}

/// Lifecycle of a stack entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionStatus {
    Pending,
    Resolved,
}

/// One entry of a room's pending-action stack.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingAction {
    pub id: ActionId,
    pub kind: ActionKind,
    pub source: PlayerId,
    pub target: PlayerId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_ref: Option<String>,
    pub status: ActionStatus,
}

impl PendingAction {
    pub fn is_counter(&self) -> bool {
        matches!(self.kind, ActionKind::Counter { .. })
    }

    /// The effect name, or `None` for counters.
    pub fn effect_name(&self) -> Option<&str> {
        match &self.kind {
            ActionKind::Effect { name } => Some(name),
            ActionKind::Counter { .. } => None,
        }
    }
}

/// An amount one seat owes another after an effect resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Debt {
    pub debtor: PlayerId,
    pub creditor: PlayerId,
    pub amount: u64,
    /// The stack entry whose resolution created this debt.
    pub origin: ActionId,
}

// ---------------------------------------------------------------------------
// Inbound commands
// ---------------------------------------------------------------------------

/// A seat's answer to the pending action it is responding to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    /// Let the pending action (and everything above it) resolve.
    Accept,
    /// Pay a counter and push a canceling entry.
    Counter {
        #[serde(default)]
        card_ref: Option<String>,
    },
}

/// Everything a seat can send to its room.
///
/// ```text
/// { "type": "move", "payload": { ...game specific... } }
/// { "type": "respond", "response": { "type": "counter", "card_ref": "no-7" } }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Command<M> {
    Ready,
    Surrender,
    Chat { message: String },
    Move { payload: M },
    Respond { response: Response },
}

impl<M> Command<M> {
    /// Short name used in logs and rejection messages.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Ready => "ready",
            Self::Surrender => "surrender",
            Self::Chat { .. } => "chat",
            Self::Move { .. } => "move",
            Self::Respond { .. } => "respond",
        }
    }
}

/// Options presented when joining a room.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinOptions {
    /// Name shown to other seats. Defaults to the seat id.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Stable identity used for match history (account id, etc.).
    #[serde(default)]
    pub identity: Option<String>,
    /// Token issued on first join; presenting it resumes the original seat.
    #[serde(default)]
    pub reconnect_token: Option<String>,
}

// ---------------------------------------------------------------------------
// Outbound events
// ---------------------------------------------------------------------------

/// Why a match ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EndReason {
    /// The rules strategy reported a winner or a draw.
    Rules,
    /// A seat left with consent or surrendered.
    Forfeit { seat: PlayerId },
}

/// Everything a room sends to its seats.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event<E> {
    PlayerJoined {
        seat: PlayerId,
        display_name: String,
        spectator: bool,
    },
    PlayerReconnected { seat: PlayerId },
    PlayerDisconnected { seat: PlayerId },
    PlayerLeft { seat: PlayerId },
    PlayerReady { seat: PlayerId },
    GameStarted {
        players: Vec<PlayerId>,
        first_turn: PlayerId,
        phase: Phase,
    },
    PhaseChanged { phase: Phase, actor: PlayerId },
    TurnEnded {
        previous: PlayerId,
        next: PlayerId,
        turn_number: u64,
        /// Unix milliseconds; for client-side countdown display only.
        turn_started_at_ms: u64,
    },
    ActionPending {
        action: PendingAction,
        responder: PlayerId,
    },
    ActionCountered {
        counter: PendingAction,
        responder: PlayerId,
    },
    ActionResolved {
        action: PendingAction,
        applied: bool,
    },
    DebtCreated { debt: Debt },
    DebtSettled { debt: Debt },
    Chat { seat: PlayerId, message: String },
    GameEnded {
        winner: Option<PlayerId>,
        is_draw: bool,
        reason: EndReason,
    },
    /// A rules-strategy specific event.
    Domain { event: E },
    /// Sent only to the seat whose command was rejected.
    Error { message: String },
}

// ---------------------------------------------------------------------------
// Envelopes
// ---------------------------------------------------------------------------

/// What a client connection can ask for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame<M> {
    Join {
        room_id: RoomId,
        #[serde(default)]
        options: JoinOptions,
    },
    /// Leave with consent. A mid-match leave forfeits.
    Leave,
    Command { command: Command<M> },
}

/// Top-level inbound wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientEnvelope<M> {
    pub seq: u64,
    pub frame: ClientFrame<M>,
}

/// What the server sends down a connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerFrame<S, E> {
    /// Acknowledges a join or reconnect.
    Joined {
        room_id: RoomId,
        seat: PlayerId,
        reconnect_token: String,
        spectator: bool,
    },
    /// Full match snapshot, sent on join, reconnect, and game start.
    Snapshot { snapshot: S },
    Event { event: Event<E> },
    /// Connection-level failure (unknown room, undecodable frame, ...).
    Error { code: u16, message: String },
}

/// Top-level outbound wrapper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerEnvelope<S, E> {
    pub seq: u64,
    /// Milliseconds since the gateway started.
    pub timestamp: u64,
    pub body: ServerFrame<S, E>,
}

// =========================================================================
// Tests
// =========================================================================

//! The `RulesStrategy` trait: everything game-specific a match room needs.
//!
//! A room knows about seats, turns, phases, the pending-action stack, and
//! debts. It knows nothing about cards, boards, or scores. Each game plugs
//! those in by implementing [`RulesStrategy`]; the room calls it at fixed
//! points and applies whatever [`Effect`] the strategy asks for.

use std::fmt::Debug;

use parlor_protocol::{Debt, PendingAction, Phase, PlayerId, Recipient};
use serde::{de::DeserializeOwned, Serialize};

use crate::{MatchStatus, RoomConfig};

/// Read-only view of the room-owned match state, passed to every rules call.
#[derive(Debug, Clone, Copy)]
pub struct MatchView<'a> {
    pub status: MatchStatus,
    pub phase: &'a Phase,
    /// The seat whose turn it is (not necessarily the one acting).
    pub current_turn: Option<PlayerId>,
    /// The only seat allowed to move right now: the active responder, then
    /// the front debtor, then the turn holder.
    pub acting: Option<PlayerId>,
    /// Turn order, fixed at match start.
    pub initial_players: &'a [PlayerId],
    pub turn_number: u64,
    /// Top entry of the pending-action stack.
    pub pending: Option<&'a PendingAction>,
    pub responder: Option<PlayerId>,
    /// The debt currently being paid.
    pub debt: Option<&'a Debt>,
}

impl MatchView<'_> {
    pub fn is_turn_of(&self, seat: PlayerId) -> bool {
        self.current_turn == Some(seat)
    }
}

/// One contingent effect: a targeted action the target may counter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Contingent {
    pub target: PlayerId,
    /// Effect name, interpreted only by the rules strategy.
    pub effect: String,
    pub amount: Option<u64>,
    pub card_ref: Option<String>,
}

impl Contingent {
    pub fn new(target: PlayerId, effect: impl Into<String>) -> Self {
        Self {
            target,
            effect: effect.into(),
            amount: None,
            card_ref: None,
        }
    }

    pub fn with_amount(mut self, amount: u64) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_card(mut self, card_ref: impl Into<String>) -> Self {
        self.card_ref = Some(card_ref.into());
        self
    }
}

/// What the room should do after a move was applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Nothing changes: same phase, same actor.
    Stay,
    /// Switch the current turn holder to a new phase.
    Phase(Phase),
    /// Pass the turn to the next seat in rotation.
    EndTurn,
    /// Open one counterable chain per target, resolved one at a time.
    Contingent(Vec<Contingent>),
    /// The mover just paid the debt at the front of the queue.
    Settled,
}

/// Result of [`RulesStrategy::apply`].
#[derive(Debug, Clone)]
pub struct Applied<E> {
    pub events: Vec<(Recipient, E)>,
    pub effect: Effect,
}

impl<E> Applied<E> {
    pub fn new(effect: Effect) -> Self {
        Self {
            events: Vec::new(),
            effect,
        }
    }

    pub fn stay() -> Self {
        Self::new(Effect::Stay)
    }

    pub fn end_turn() -> Self {
        Self::new(Effect::EndTurn)
    }

    pub fn with_event(mut self, recipient: Recipient, event: E) -> Self {
        self.events.push((recipient, event));
        self
    }
}

/// Result of [`RulesStrategy::resolve`].
#[derive(Debug, Clone)]
pub struct Resolution<E> {
    pub events: Vec<(Recipient, E)>,
    /// Debts created by the effect, paid in order.
    pub debts: Vec<Debt>,
}

impl<E> Default for Resolution<E> {
    fn default() -> Self {
        Self {
            events: Vec::new(),
            debts: Vec::new(),
        }
    }
}

/// Outcome of a win check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Winner(PlayerId),
    Draw,
}

/// The game-specific half of a match room.
///
/// Every method runs inside the room actor, so implementations are plain
/// synchronous functions over `State`. Methods that mutate `State` are only
/// called after the corresponding validation passed.
pub trait RulesStrategy: Send + Sync + 'static {
    /// Game-specific settings (deck size, target score, ...).
    type Config: Send + Sync + Clone + Default + 'static;

    /// The game's canonical state. Sent to clients inside snapshots.
    type State: Send + Sync + Clone + Debug + Serialize + 'static;

    /// What a seat submits as `Command::Move { payload }`.
    type Move: Send + Sync + Clone + Debug + Serialize + DeserializeOwned + 'static;

    /// Domain events, broadcast as `Event::Domain { event }`.
    type Event: Send + Sync + Clone + Debug + Serialize + DeserializeOwned + 'static;

    /// Short name recorded in match history, e.g. `"rent-duel"`.
    fn game_type(&self) -> &str;

    fn room_config(&self) -> RoomConfig {
        RoomConfig::default()
    }

    /// Builds the initial state. `players` is the turn order.
    fn init(&self, config: &Self::Config, players: &[PlayerId]) -> Self::State;

    /// Phase a seat's turn starts in.
    fn opening_phase(&self, state: &Self::State, seat: PlayerId) -> Phase;

    /// Whether `mv` may only be made by the turn holder. Moves that return
    /// `false` (emotes, out-of-turn claims) skip the turn check but still
    /// go through [`validate`](Self::validate).
    fn is_turn_gated(&self, _mv: &Self::Move) -> bool {
        true
    }

    fn validate(
        &self,
        state: &Self::State,
        view: &MatchView<'_>,
        seat: PlayerId,
        mv: &Self::Move,
    ) -> Result<(), String>;

    fn apply(
        &self,
        state: &mut Self::State,
        view: &MatchView<'_>,
        seat: PlayerId,
        mv: Self::Move,
    ) -> Applied<Self::Event>;

    /// Called after every applied mutation while the match is running.
    fn check_win(&self, state: &Self::State, view: &MatchView<'_>) -> Verdict;

    /// Whether `seat` holds a counter against `action`.
    fn can_counter(&self, _state: &Self::State, _seat: PlayerId, _action: &PendingAction) -> bool {
        false
    }

    /// Consumes the counter resource. Only called after
    /// [`can_counter`](Self::can_counter) returned `true`.
    fn pay_counter(
        &self,
        _state: &mut Self::State,
        _seat: PlayerId,
        _card_ref: Option<&str>,
        _action: &PendingAction,
    ) -> Result<Vec<(Recipient, Self::Event)>, String> {
        Err("this game has no counters".into())
    }

    /// Applies an effect that survived its counter chain.
    fn resolve(
        &self,
        _state: &mut Self::State,
        _action: &PendingAction,
    ) -> Resolution<Self::Event> {
        Resolution::default()
    }

    /// Decides the match after `leaver` forfeited. `remaining` are the
    /// initial players still in contention.
    ///
    /// On [`Verdict::Continue`] the room drops queued effects from or
    /// against the leaver and every debt the leaver owes or is owed.
    fn forfeit(&self, _state: &Self::State, _leaver: PlayerId, remaining: &[PlayerId]) -> Verdict {
        match remaining {
            [] => Verdict::Draw,
            [only] => Verdict::Winner(*only),
            _ => Verdict::Continue,
        }
    }

    /// A move the room can apply for a bot seat whose own decision failed.
    fn default_move(
        &self,
        _state: &Self::State,
        _view: &MatchView<'_>,
        _seat: PlayerId,
    ) -> Option<Self::Move> {
        None
    }

    /// The state as `viewer` may see it, used for every snapshot a seat
    /// receives. Override to hide other seats' hands.
    fn redact(&self, state: &Self::State, _viewer: PlayerId) -> Self::State {
        state.clone()
    }
}

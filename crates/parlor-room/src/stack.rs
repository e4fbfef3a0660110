//! The pending-action stack and the debt queue.
//!
//! A contingent effect does not apply immediately. It is pushed as a
//! pending entry and its target becomes the responder, who may accept or
//! push a counter. A counter flips the responder to the other party of the
//! chain. When someone accepts, the whole chain resolves top-down:
//!
//! ```text
//! top    Counter(negates A-3)   ← resolves first, cancels A-3
//!        Counter(negates A-1)   ← A-3, cancelled: does nothing
//! bottom Effect A-1             ← not cancelled: applies
//! ```
//!
//! so an effect applies iff an even number of counters sit above it.
//!
//! Effects that survive can create [`Debt`]s. Debts are paid one at a time
//! in creation order, and while any remain only the front debtor may act.

use std::collections::{HashSet, VecDeque};

use parlor_protocol::{ActionId, ActionKind, ActionStatus, Debt, PendingAction, Phase, PlayerId};

use crate::rules::Contingent;

/// Errors from [`PendingActionStack`] operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StackError {
    /// A chain or debt is already outstanding.
    #[error("pending actions are still outstanding")]
    Busy,

    #[error("no pending action")]
    Empty,

    #[error("seat {seat} is not the responder")]
    NotResponder { seat: PlayerId },
}

/// An effect entry popped off the stack by [`PendingActionStack::accept`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    pub action: PendingAction,
    /// Whether the effect survived its counter chain.
    pub applied: bool,
}

/// Who opened the current batch of contingent effects, and where play
/// returns once everything is settled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Origin {
    pub actor: PlayerId,
    pub phase: Phase,
}

#[derive(Debug, Default)]
pub struct PendingActionStack {
    entries: Vec<PendingAction>,
    queued: VecDeque<Contingent>,
    debts: VecDeque<Debt>,
    responder: Option<PlayerId>,
    origin: Option<Origin>,
    next_id: u64,
}

impl PendingActionStack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues one chain per contingent effect. Call
    /// [`open_next`](Self::open_next) to push the first.
    pub fn begin(
        &mut self,
        actor: PlayerId,
        return_phase: Phase,
        effects: Vec<Contingent>,
    ) -> Result<(), StackError> {
        if self.is_busy() {
            return Err(StackError::Busy);
        }
        self.queued.extend(effects);
        self.origin = Some(Origin {
            actor,
            phase: return_phase,
        });
        Ok(())
    }

    /// Pushes the next queued effect onto the empty stack and makes its
    /// target the responder.
    pub fn open_next(&mut self) -> Option<PendingAction> {
        if !self.entries.is_empty() {
            return None;
        }
        let effect = self.queued.pop_front()?;
        let actor = self.origin.as_ref()?.actor;
        let action = PendingAction {
            id: self.allocate_id(),
            kind: ActionKind::Effect {
                name: effect.effect,
            },
            source: actor,
            target: effect.target,
            amount: effect.amount,
            card_ref: effect.card_ref,
            status: ActionStatus::Pending,
        };
        self.responder = Some(action.target);
        self.entries.push(action.clone());
        Some(action)
    }

    /// Pushes a counter against the top entry. The responder becomes the
    /// party the counter is aimed at.
    pub fn counter(
        &mut self,
        seat: PlayerId,
        card_ref: Option<String>,
    ) -> Result<PendingAction, StackError> {
        let top = self.entries.last().ok_or(StackError::Empty)?;
        if self.responder != Some(seat) {
            return Err(StackError::NotResponder { seat });
        }
        // The counter targets whoever put the entry it cancels there.
        let (negates, target) = (top.id, top.source);
        let counter = PendingAction {
            id: self.allocate_id(),
            kind: ActionKind::Counter { negates },
            source: seat,
            target,
            amount: None,
            card_ref,
            status: ActionStatus::Pending,
        };
        self.responder = Some(target);
        self.entries.push(counter.clone());
        Ok(counter)
    }

    /// Resolves the whole chain top-down. Returns every effect entry with
    /// whether it applied. Counters are consumed silently.
    pub fn accept(&mut self, seat: PlayerId) -> Result<Vec<Resolved>, StackError> {
        if self.entries.is_empty() {
            return Err(StackError::Empty);
        }
        if self.responder != Some(seat) {
            return Err(StackError::NotResponder { seat });
        }

        let mut cancelled: HashSet<ActionId> = HashSet::new();
        let mut resolved = Vec::new();
        while let Some(mut entry) = self.entries.pop() {
            entry.status = ActionStatus::Resolved;
            let negated = cancelled.contains(&entry.id);
            match entry.kind {
                ActionKind::Counter { negates } => {
                    if !negated {
                        cancelled.insert(negates);
                    }
                }
                ActionKind::Effect { .. } => resolved.push(Resolved {
                    action: entry,
                    applied: !negated,
                }),
            }
        }
        self.responder = None;
        Ok(resolved)
    }

    pub fn push_debt(&mut self, debt: Debt) {
        self.debts.push_back(debt);
    }

    /// Removes and returns the front debt.
    pub fn settle_front(&mut self) -> Option<Debt> {
        self.debts.pop_front()
    }

    /// Drops every debt `seat` owes or is owed.
    pub fn forgive(&mut self, seat: PlayerId) -> Vec<Debt> {
        let (forgiven, kept): (Vec<_>, Vec<_>) = self
            .debts
            .drain(..)
            .partition(|d| d.debtor == seat || d.creditor == seat);
        self.debts = kept.into();
        forgiven
    }

    /// Drops queued effects aimed at `seat`, or the whole queue when `seat`
    /// opened the batch. The chain already on the stack is left alone.
    pub fn withdraw(&mut self, seat: PlayerId) {
        if self.origin.as_ref().is_some_and(|o| o.actor == seat) {
            self.queued.clear();
        } else {
            self.queued.retain(|c| c.target != seat);
        }
    }

    /// Ends the batch once nothing is outstanding, returning where play
    /// resumes.
    pub fn finish(&mut self) -> Option<Origin> {
        if self.is_busy() {
            return None;
        }
        self.origin.take()
    }

    /// Drops everything. Used when the match ends mid-chain.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.queued.clear();
        self.debts.clear();
        self.responder = None;
        self.origin = None;
    }

    /// An entry is waiting for a response.
    pub fn is_active(&self) -> bool {
        !self.entries.is_empty()
    }

    /// A chain, a queued effect, or a debt is outstanding.
    pub fn is_busy(&self) -> bool {
        !self.entries.is_empty() || !self.queued.is_empty() || !self.debts.is_empty()
    }

    pub fn top(&self) -> Option<&PendingAction> {
        self.entries.last()
    }

    pub fn entries(&self) -> &[PendingAction] {
        &self.entries
    }

    pub fn responder(&self) -> Option<PlayerId> {
        self.responder
    }

    pub fn front_debt(&self) -> Option<&Debt> {
        self.debts.front()
    }

    pub fn debts(&self) -> impl Iterator<Item = &Debt> {
        self.debts.iter()
    }

    pub fn origin(&self) -> Option<&Origin> {
        self.origin.as_ref()
    }

    fn allocate_id(&mut self) -> ActionId {
        self.next_id += 1;
        ActionId(self.next_id)
    }
}

/// Whether a payment of `offered` settles `debt` for a debtor whose whole
/// estate is worth `estate`.
///
/// Paying everything you have always settles, even when it falls short.
pub fn settles(debt: &Debt, offered: u64, estate: u64) -> bool {
    offered >= debt.amount || offered >= estate
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const A: PlayerId = PlayerId(1);
    const B: PlayerId = PlayerId(2);
    const C: PlayerId = PlayerId(3);

    fn opened(targets: &[PlayerId]) -> PendingActionStack {
        let mut stack = PendingActionStack::new();
        let effects = targets
            .iter()
            .map(|t| Contingent::new(*t, "charge").with_amount(3))
            .collect();
        stack.begin(A, Phase::new("play"), effects).unwrap();
        stack.open_next().unwrap();
        stack
    }

    /// Pushes `n` counters, alternating B and A, then has the current
    /// responder accept.
    fn chain_of(n: usize) -> Vec<Resolved> {
        let mut stack = opened(&[B]);
        for _ in 0..n {
            let responder = stack.responder().unwrap();
            stack.counter(responder, None).unwrap();
        }
        let responder = stack.responder().unwrap();
        stack.accept(responder).unwrap()
    }

    #[test]
    fn test_open_makes_target_the_responder() {
        let stack = opened(&[B]);
        let top = stack.top().unwrap();
        assert_eq!(top.source, A);
        assert_eq!(top.target, B);
        assert_eq!(top.amount, Some(3));
        assert_eq!(top.status, ActionStatus::Pending);
        assert_eq!(stack.responder(), Some(B));
    }

    #[test]
    fn test_counter_flips_responder_back_and_forth() {
        let mut stack = opened(&[B]);
        let first = stack.counter(B, Some("no-1".into())).unwrap();
        assert_eq!(first.target, A);
        assert_eq!(stack.responder(), Some(A));

        let second = stack.counter(A, None).unwrap();
        assert_eq!(second.kind, ActionKind::Counter { negates: first.id });
        assert_eq!(stack.responder(), Some(B));
        assert_eq!(stack.entries().len(), 3);
    }

    #[test]
    fn test_only_responder_may_answer() {
        let mut stack = opened(&[B]);
        assert_eq!(stack.counter(A, None), Err(StackError::NotResponder { seat: A }));
        assert_eq!(stack.accept(C), Err(StackError::NotResponder { seat: C }));
        assert!(stack.is_active());
    }

    #[test]
    fn test_parity_decides_whether_effect_applies() {
        for n in 0..6 {
            let resolved = chain_of(n);
            assert_eq!(resolved.len(), 1, "only the effect entry is reported");
            assert_eq!(resolved[0].applied, n % 2 == 0, "{n} counters");
            assert_eq!(resolved[0].action.status, ActionStatus::Resolved);
        }
    }

    #[test]
    fn test_accept_empties_the_stack() {
        let mut stack = opened(&[B]);
        stack.counter(B, None).unwrap();
        stack.accept(A).unwrap();
        assert!(!stack.is_active());
        assert_eq!(stack.responder(), None);
        assert_eq!(stack.accept(A), Err(StackError::Empty));
    }

    #[test]
    fn test_action_ids_are_never_reused() {
        let mut stack = opened(&[B, C]);
        let first = stack.top().unwrap().id;
        stack.counter(B, None).unwrap();
        stack.accept(A).unwrap();
        let second = stack.open_next().unwrap().id;
        assert!(second.0 > first.0 + 1);
    }

    #[test]
    fn test_multi_target_chains_open_one_at_a_time() {
        let mut stack = opened(&[B, C]);
        assert_eq!(stack.open_next(), None, "stack already has a chain");
        stack.accept(B).unwrap();

        let next = stack.open_next().unwrap();
        assert_eq!(next.target, C);
        assert_eq!(stack.responder(), Some(C));
        stack.accept(C).unwrap();
        assert_eq!(stack.open_next(), None);
        assert!(!stack.is_busy());
    }

    #[test]
    fn test_begin_while_busy_is_rejected() {
        let mut stack = opened(&[B]);
        let again = stack.begin(B, Phase::new("play"), vec![Contingent::new(A, "charge")]);
        assert_eq!(again, Err(StackError::Busy));
    }

    #[test]
    fn test_debts_are_fifo_and_block_finish() {
        let mut stack = opened(&[B]);
        stack.accept(B).unwrap();
        stack.push_debt(debt(B, A, 3));
        stack.push_debt(debt(C, A, 2));
        assert_eq!(stack.finish(), None);

        assert_eq!(stack.front_debt().unwrap().debtor, B);
        assert_eq!(stack.settle_front().unwrap().debtor, B);
        assert_eq!(stack.front_debt().unwrap().debtor, C);
        stack.settle_front();

        let origin = stack.finish().unwrap();
        assert_eq!(origin.actor, A);
        assert_eq!(origin.phase, Phase::new("play"));
        assert_eq!(stack.finish(), None, "origin handed out once");
    }

    fn debt(debtor: PlayerId, creditor: PlayerId, amount: u64) -> Debt {
        Debt {
            debtor,
            creditor,
            amount,
            origin: ActionId(1),
        }
    }

    #[test]
    fn test_forgive_drops_debts_owed_by_the_seat() {
        let mut stack = PendingActionStack::new();
        stack.push_debt(debt(B, A, 3));
        stack.push_debt(debt(C, A, 2));
        stack.push_debt(debt(B, C, 1));

        let forgiven = stack.forgive(B);
        assert_eq!(forgiven.len(), 2);
        assert_eq!(stack.debts().count(), 1);
        assert_eq!(stack.front_debt().unwrap().debtor, C);
    }

    #[test]
    fn test_forgive_drops_debts_owed_to_the_seat() {
        let mut stack = PendingActionStack::new();
        stack.push_debt(debt(B, A, 3));
        stack.push_debt(debt(C, B, 2));

        let forgiven = stack.forgive(A);
        assert_eq!(forgiven, vec![debt(B, A, 3)]);
        assert_eq!(stack.front_debt(), Some(&debt(C, B, 2)));
    }

    #[test]
    fn test_withdraw_target_keeps_other_queued_chains() {
        let mut stack = opened(&[B, C]);
        stack.withdraw(B);
        stack.accept(B).unwrap();
        assert_eq!(stack.open_next().unwrap().target, C);
    }

    #[test]
    fn test_withdraw_source_drops_the_whole_queue() {
        let mut stack = opened(&[B, C]);
        stack.withdraw(A);
        assert_eq!(stack.responder(), Some(B), "open chain stays");
        stack.accept(B).unwrap();
        assert_eq!(stack.open_next(), None);
        assert!(!stack.is_busy());
    }

    #[test]
    fn test_settles_on_full_amount_or_full_estate() {
        let debt = debt(B, A, 5);
        assert!(settles(&debt, 5, 10));
        assert!(settles(&debt, 7, 10));
        assert!(!settles(&debt, 4, 10), "partial payment with assets left");
        assert!(settles(&debt, 3, 3), "everything the debtor has");
        assert!(settles(&debt, 0, 0), "nothing to give");
    }

    #[test]
    fn test_clear_resets_everything() {
        let mut stack = opened(&[B, C]);
        stack.push_debt(debt(B, A, 1));
        stack.clear();
        assert!(!stack.is_busy());
        assert_eq!(stack.origin(), None);
    }
}

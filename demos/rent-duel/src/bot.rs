//! A greedy Rent Duel bot.

use parlor::prelude::*;

use crate::game::{liquidate, Card, DuelMove, RentDuel, DRAW};

/// Builds first, charges when the opponent has money, banks otherwise.
/// Always refuses a charge when it holds a Just Say No.
#[derive(Debug, Default)]
pub struct GreedyBot;

impl GreedyBot {
    fn pick(view: &BotView<'_, RentDuel>) -> Option<usize> {
        let hand = view.state.hand(view.seat);
        let opponent_cash: u64 = view
            .view
            .initial_players
            .iter()
            .filter(|p| **p != view.seat)
            .map(|p| view.state.bank(*p))
            .sum();

        let rank = |card: &Card| match card {
            Card::Property { value, .. } => Some(100 + *value),
            Card::Rent { amount } if opponent_cash > 0 => Some(50 + *amount),
            Card::Birthday if opponent_cash > 0 => Some(40),
            Card::Money { value } => Some(*value),
            _ => None,
        };
        hand.iter()
            .enumerate()
            .filter_map(|(i, card)| rank(card).map(|r| (r, i)))
            .max()
            .map(|(_, i)| i)
    }
}

impl BotAgent<RentDuel> for GreedyBot {
    fn decide(&mut self, view: &BotView<'_, RentDuel>) -> Result<BotMove<DuelMove>, BotError> {
        if view.is_responding() {
            let response = if view.can_counter() {
                Response::Counter {
                    card_ref: Some("just-say-no".into()),
                }
            } else {
                Response::Accept
            };
            return Ok(BotMove::Respond(response));
        }
        if let Some(debt) = view.owed() {
            return Ok(BotMove::Play(liquidate(view.state, view.seat, debt.amount)));
        }
        if !view.view.is_turn_of(view.seat) {
            return Err(BotError::NoMove);
        }
        if view.view.phase.as_str() == DRAW {
            return Ok(BotMove::Play(DuelMove::Draw));
        }
        if view.state.plays_left == 0 {
            return Ok(BotMove::Play(DuelMove::EndTurn));
        }
        let mv = match Self::pick(view) {
            Some(card) => DuelMove::Play { card },
            None => DuelMove::EndTurn,
        };
        Ok(BotMove::Play(mv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::{DuelConfig, DuelState, PLAY};

    const ME: PlayerId = PlayerId(2);
    const THEM: PlayerId = PlayerId(1);
    const PLAYERS: [PlayerId; 2] = [THEM, ME];

    fn table() -> (RentDuel, DuelState) {
        let rules = RentDuel::default();
        let config = DuelConfig {
            seed: Some(11),
            ..Default::default()
        };
        let mut state = rules.init(&config, &PLAYERS);
        state.hands.insert(ME, Vec::new());
        (rules, state)
    }

    fn decide(
        rules: &RentDuel,
        state: &DuelState,
        phase: &Phase,
        pending: Option<&PendingAction>,
        debt: Option<&Debt>,
    ) -> BotMove<DuelMove> {
        let view = BotView {
            seat: ME,
            rules,
            state,
            view: MatchView {
                status: MatchStatus::InProgress,
                phase,
                current_turn: Some(ME),
                acting: Some(ME),
                initial_players: &PLAYERS,
                turn_number: 2,
                pending,
                responder: pending.map(|_| ME),
                debt,
            },
        };
        GreedyBot.decide(&view).unwrap()
    }

    fn rent_on_me() -> PendingAction {
        PendingAction {
            id: ActionId(1),
            kind: ActionKind::Effect { name: "rent".into() },
            source: THEM,
            target: ME,
            amount: Some(4),
            card_ref: Some("rent".into()),
            status: ActionStatus::Pending,
        }
    }

    #[test]
    fn test_counters_with_just_say_no() {
        let (rules, mut state) = table();
        let action = rent_on_me();
        let respond = Phase::respond();

        let mv = decide(&rules, &state, &respond, Some(&action), None);
        assert_eq!(mv, BotMove::Respond(Response::Accept));

        state.hands.insert(ME, vec![Card::JustSayNo]);
        let mv = decide(&rules, &state, &respond, Some(&action), None);
        assert!(matches!(mv, BotMove::Respond(Response::Counter { .. })));
    }

    #[test]
    fn test_pays_what_the_bank_covers() {
        let (rules, mut state) = table();
        state.banks.insert(ME, 10);
        let debt = Debt {
            debtor: ME,
            creditor: THEM,
            amount: 4,
            origin: ActionId(1),
        };
        let pay = Phase::pay();

        let mv = decide(&rules, &state, &pay, None, Some(&debt));
        assert_eq!(
            mv,
            BotMove::Play(DuelMove::Pay {
                amount: 4,
                properties: Vec::new(),
            })
        );

        state.banks.insert(ME, 3);
        state.properties.insert(
            ME,
            vec![
                Card::Property {
                    name: "Boardwalk".into(),
                    value: 4,
                },
                Card::Property {
                    name: "Baltic Avenue".into(),
                    value: 1,
                },
            ],
        );
        let mv = decide(&rules, &state, &pay, None, Some(&debt));
        assert_eq!(
            mv,
            BotMove::Play(DuelMove::Pay {
                amount: 3,
                properties: vec![1],
            }),
            "cheapest property covers the shortfall"
        );
    }

    #[test]
    fn test_ends_turn_without_plays_left() {
        let (rules, mut state) = table();
        state.hands.insert(ME, vec![Card::Money { value: 5 }]);
        let play = Phase::new(PLAY);

        state.plays_left = 0;
        assert_eq!(decide(&rules, &state, &play, None, None), BotMove::Play(DuelMove::EndTurn));

        state.plays_left = 1;
        assert_eq!(
            decide(&rules, &state, &play, None, None),
            BotMove::Play(DuelMove::Play { card: 0 })
        );
    }

    #[test]
    fn test_draws_first() {
        let (rules, state) = table();
        let draw = Phase::new(DRAW);
        assert_eq!(decide(&rules, &state, &draw, None, None), BotMove::Play(DuelMove::Draw));
    }
}

//! Two greedy bots play one match of Rent Duel while a spectator seat
//! narrates it through the log.
//!
//! ```text
//! cargo run -p rent-duel -- 42        # fixed shuffle seed
//! RUST_LOG=debug cargo run -p rent-duel
//! ```

mod bot;
mod game;

use std::sync::Arc;
use std::time::Duration;

use parlor::prelude::*;
use tokio::sync::mpsc;

use crate::bot::GreedyBot;
use crate::game::{DuelConfig, DuelEvent, RentDuel};

const THINK: ThinkDelay = ThinkDelay {
    min: Duration::from_millis(50),
    max: Duration::from_millis(150),
};
const MATCH_TIMEOUT: Duration = Duration::from_secs(120);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing("info")?;
    let seed = std::env::args().nth(1).map(|s| s.parse::<u64>()).transpose()?;

    let recorder = Arc::new(MemoryRecorder::new());
    let mut rooms = RoomManager::<RentDuel>::new(recorder.clone());
    let room_id = rooms.create_room(
        RentDuel::new(THINK),
        DuelConfig {
            seed,
            ..Default::default()
        },
    );

    rooms.add_bot(room_id, PlayerId(1), "Ada", Box::new(GreedyBot)).await?;
    rooms.add_bot(room_id, PlayerId(2), "Brunel", Box::new(GreedyBot)).await?;

    let (tx, mut rx) = mpsc::unbounded_channel();
    let ack = rooms
        .join_room(
            PlayerId(100),
            room_id,
            JoinOptions {
                display_name: Some("narrator".into()),
                ..Default::default()
            },
            tx,
        )
        .await?;
    tracing::info!(%room_id, spectator = ack.spectator, "watching");

    let ended = tokio::time::timeout(MATCH_TIMEOUT, async {
        while let Some(msg) = rx.recv().await {
            let Outbound::Event(event) = msg else {
                continue;
            };
            narrate(&event);
            if let Event::GameEnded { winner, is_draw, .. } = event {
                return Some((winner, is_draw));
            }
        }
        None
    })
    .await;

    match ended {
        Ok(Some((winner, is_draw))) => {
            // Recording runs on its own task.
            tokio::time::sleep(Duration::from_millis(50)).await;
            for record in recorder.records() {
                tracing::info!(
                    winner = ?record.winner_identity,
                    is_draw,
                    duration_ms = record.duration_ms,
                    "match recorded"
                );
            }
            if winner.is_none() && !is_draw {
                tracing::warn!("match ended without a result");
            }
        }
        Ok(None) => tracing::warn!("room closed before the match ended"),
        Err(_) => tracing::warn!(timeout = ?MATCH_TIMEOUT, "match did not finish in time"),
    }

    rooms.destroy_room(room_id).await?;
    Ok(())
}

fn narrate(event: &Event<DuelEvent>) {
    match event {
        Event::TurnEnded { next, turn_number, .. } => tracing::info!(%next, turn_number, "turn"),
        Event::ActionCountered { counter, .. } => {
            tracing::info!(seat = %counter.source, "just say no!")
        }
        Event::ActionResolved { action, applied } => {
            tracing::info!(effect = ?action.effect_name(), applied, "resolved")
        }
        Event::Domain { event } => match event {
            DuelEvent::Built { seat, name, value } => {
                tracing::info!(%seat, %name, value, "built")
            }
            DuelEvent::Banked { seat, value } => tracing::info!(%seat, value, "banked"),
            DuelEvent::Charged {
                seat,
                effect,
                amount,
            } => tracing::info!(%seat, %effect, amount, "charged"),
            DuelEvent::Paid { from, to, amount } => {
                tracing::info!(%from, %to, amount, "paid")
            }
            DuelEvent::Surrendered {
                from,
                to,
                name,
                value,
            } => tracing::info!(%from, %to, %name, value, "property surrendered"),
            DuelEvent::DeckExhausted => tracing::info!("deck exhausted"),
            other => tracing::debug!(?other, "domain event"),
        },
        Event::GameEnded { winner, is_draw, reason } => {
            tracing::info!(winner = ?winner, is_draw, ?reason, "game over")
        }
        other => tracing::debug!(?other, "event"),
    }
}

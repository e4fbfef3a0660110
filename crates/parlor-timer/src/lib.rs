//! One-shot cancellable timers for Parlor room actors.
//!
//! A match room only suspends on artificial delays: a bot's think time,
//! pacing between reveals, and the grace period before a finished room is
//! torn down. Each of those is a [`TimerSet`] entry.
//!
//! # Integration
//!
//! Timers never touch room state. A firing is delivered as a [`Fired`]
//! message on a channel the room actor polls next to its command inbox:
//!
//! ```ignore
//! let (mut timers, mut fired_rx) = TimerSet::new();
//! loop {
//!     tokio::select! {
//!         biased;
//!         Some(cmd) = inbox.recv() => { /* handle command */ }
//!         Some(fired) = fired_rx.recv() => {
//!             if timers.claim(&fired) {
//!                 // still current: re-check preconditions, then act
//!             }
//!         }
//!     }
//! }
//! ```
//!
//! # Cancellation
//!
//! Three layers make a stale firing harmless:
//!
//! 1. [`TimerSet::cancel`] and [`TimerSet::cancel_all`] abort the sleeping
//!    task.
//! 2. Every task also races its sleep against the set's [`CancelToken`],
//!    which [`TimerSet::shutdown`] (or dropping the set) trips.
//! 3. Each schedule gets a fresh generation; [`TimerSet::claim`] rejects a
//!    firing whose generation is no longer the pending one, which covers a
//!    message already queued when the timer was replaced.

use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::time::Duration;

use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

// ---------------------------------------------------------------------------
// Cancellation token
// ---------------------------------------------------------------------------

/// Trips a set of [`CancelToken`]s at once.
///
/// Dropping the source counts as cancellation.
#[derive(Debug)]
pub struct CancelSource {
    tx: watch::Sender<bool>,
}

impl CancelSource {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self { tx }
    }

    /// Returns a token observing this source.
    pub fn token(&self) -> CancelToken {
        CancelToken {
            rx: self.tx.subscribe(),
        }
    }

    /// Cancels every token. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for CancelSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observes a [`CancelSource`].
#[derive(Debug, Clone)]
pub struct CancelToken {
    rx: watch::Receiver<bool>,
}

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        *self.rx.borrow() || self.rx.has_changed().is_err()
    }

    /// Resolves once the source cancels or is dropped.
    pub async fn cancelled(&self) {
        let mut rx = self.rx.clone();
        // Err means the source is gone, which is cancellation too.
        let _ = rx.wait_for(|cancelled| *cancelled).await;
    }
}

// ---------------------------------------------------------------------------
// Timer set
// ---------------------------------------------------------------------------

/// A timer firing, delivered on the receiver returned by [`TimerSet::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fired<K> {
    pub key: K,
    pub generation: u64,
}

struct PendingTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

/// Keyed one-shot timers owned by a single actor.
///
/// At most one timer is pending per key; scheduling a key again replaces
/// (and aborts) the previous one.
pub struct TimerSet<K> {
    sink: mpsc::UnboundedSender<Fired<K>>,
    source: CancelSource,
    pending: HashMap<K, PendingTimer>,
    next_generation: u64,
}

impl<K> TimerSet<K>
where
    K: Clone + Eq + Hash + Debug + Send + 'static,
{
    /// Creates an empty set and the receiver its firings arrive on.
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Fired<K>>) {
        let (sink, rx) = mpsc::unbounded_channel();
        let set = Self {
            sink,
            source: CancelSource::new(),
            pending: HashMap::new(),
            next_generation: 1,
        };
        (set, rx)
    }

    /// Schedules `key` to fire after `delay`, replacing any pending timer
    /// with the same key. Returns the generation of the new timer, or
    /// `None` after [`shutdown`](Self::shutdown).
    pub fn schedule(&mut self, key: K, delay: Duration) -> Option<u64> {
        if self.source.is_cancelled() {
            debug!(?key, "timer set shut down, schedule ignored");
            return None;
        }

        let generation = self.next_generation;
        self.next_generation += 1;

        let sink = self.sink.clone();
        let token = self.source.token();
        let fired = Fired {
            key: key.clone(),
            generation,
        };
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = token.cancelled() => {
                    trace!(key = ?fired.key, "timer cancelled before firing");
                }
                _ = tokio::time::sleep(delay) => {
                    // The receiver is gone once the owning actor stopped.
                    let _ = sink.send(fired);
                }
            }
        });

        let timer = PendingTimer { generation, handle };
        if let Some(previous) = self.pending.insert(key.clone(), timer) {
            previous.handle.abort();
            trace!(?key, replaced = previous.generation, "timer replaced");
        }
        trace!(?key, generation, delay_ms = delay.as_millis() as u64, "timer scheduled");
        Some(generation)
    }

    /// Cancels the pending timer for `key`. Returns `true` if one existed.
    pub fn cancel(&mut self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some(timer) => {
                timer.handle.abort();
                trace!(?key, generation = timer.generation, "timer cancelled");
                true
            }
            None => false,
        }
    }

    /// Cancels every pending timer. The set stays usable.
    pub fn cancel_all(&mut self) {
        let count = self.pending.len();
        for (_, timer) in self.pending.drain() {
            timer.handle.abort();
        }
        if count > 0 {
            debug!(count, "all timers cancelled");
        }
    }

    /// Cancels everything and trips the cancel token. Later calls to
    /// [`schedule`](Self::schedule) are ignored.
    pub fn shutdown(&mut self) {
        self.cancel_all();
        self.source.cancel();
    }

    pub fn is_shut_down(&self) -> bool {
        self.source.is_cancelled()
    }

    /// Accepts a firing if it belongs to the currently pending timer for
    /// its key, removing that entry. Stale firings return `false`.
    pub fn claim(&mut self, fired: &Fired<K>) -> bool {
        if self.source.is_cancelled() {
            return false;
        }
        match self.pending.get(&fired.key) {
            Some(timer) if timer.generation == fired.generation => {
                self.pending.remove(&fired.key);
                true
            }
            _ => {
                trace!(
                    key = ?fired.key,
                    generation = fired.generation,
                    "stale timer firing dropped"
                );
                false
            }
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of pending timers.
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// A token tripped when this set shuts down or is dropped.
    pub fn token(&self) -> CancelToken {
        self.source.token()
    }
}

impl<K> Drop for TimerSet<K> {
    fn drop(&mut self) {
        for timer in self.pending.values() {
            timer.handle.abort();
        }
        self.source.cancel();
    }
}

// ---------------------------------------------------------------------------
// Think delay
// ---------------------------------------------------------------------------

/// Randomized pause before a bot acts, so bot turns read like human ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkDelay {
    pub min: Duration,
    pub max: Duration,
}

impl Default for ThinkDelay {
    fn default() -> Self {
        Self {
            min: Duration::from_millis(600),
            max: Duration::from_millis(1800),
        }
    }
}

impl ThinkDelay {
    /// A delay that is always exactly `delay`.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            min: delay,
            max: delay,
        }
    }

    /// Draws a delay uniformly from `min..=max`. A reversed range yields
    /// `min`.
    pub fn sample(&self) -> Duration {
        if self.max <= self.min {
            return self.min;
        }
        let lo = self.min.as_millis() as u64;
        let hi = self.max.as_millis() as u64;
        Duration::from_millis(rand::rng().random_range(lo..=hi))
    }
}

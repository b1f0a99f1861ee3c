#![forbid(unsafe_code)]
#![deny(
    unused_must_use,
    rustdoc::broken_intra_doc_links,
    rustdoc::bare_urls
)]
#![warn(missing_docs, unreachable_pub, clippy::all, clippy::pedantic)]

//! Progress event bus for migration runs.
//!
//! Every published event gets the next sequence number and is kept in a
//! bounded replay ring, so a report writer or a late subscriber can still see
//! how each profile progressed. Live delivery goes through
//! `tokio::sync::broadcast`; once the ring is full the oldest entry is evicted.

mod payloads;

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use tokio::sync::broadcast::{self, Receiver, Sender, error::RecvError};

pub use payloads::{Event, EventEnvelope, EventId};

/// Replay ring size used by [`EventBus::new`].
const DEFAULT_REPLAY_CAPACITY: usize = 1_024;

/// Cloneable handle to the run's progress events.
#[derive(Clone)]
pub struct EventBus {
    live: Sender<EventEnvelope>,
    ring: Arc<Mutex<ReplayRing>>,
    sequence: Arc<AtomicU64>,
}

struct ReplayRing {
    entries: VecDeque<EventEnvelope>,
    capacity: usize,
}

impl ReplayRing {
    fn push(&mut self, envelope: EventEnvelope) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(envelope);
    }
}

impl EventBus {
    /// Bus whose replay ring and live channel both hold `capacity` events (at least one).
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (live, _) = broadcast::channel(capacity);
        Self {
            live,
            ring: Arc::new(Mutex::new(ReplayRing {
                entries: VecDeque::with_capacity(capacity),
                capacity,
            })),
            sequence: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Bus with the default replay capacity.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_REPLAY_CAPACITY)
    }

    /// Stamp and record `event`, then hand it to live subscribers.
    ///
    /// Never blocks; having no subscribers is not an error.
    pub fn publish(&self, event: Event) -> EventId {
        let envelope = EventEnvelope {
            id: self.sequence.fetch_add(1, Ordering::Relaxed) + 1,
            timestamp: Utc::now(),
            event,
        };
        let id = envelope.id;
        self.ring().push(envelope.clone());
        // Err only means nobody is listening.
        let _ = self.live.send(envelope);
        id
    }

    /// Subscribe to live events. With `since_id`, recorded events newer than it
    /// are delivered first.
    #[must_use]
    pub fn subscribe(&self, since_id: Option<EventId>) -> EventStream {
        let replay = since_id.map_or_else(VecDeque::new, |since| {
            self.ring()
                .entries
                .iter()
                .filter(|envelope| envelope.id > since)
                .cloned()
                .collect()
        });
        EventStream {
            replay,
            live: self.live.subscribe(),
        }
    }

    /// Recorded events, oldest first.
    #[must_use]
    pub fn backlog(&self) -> Vec<EventEnvelope> {
        self.ring().entries.iter().cloned().collect()
    }

    /// Recorded events concerning the profile at `source`, oldest first.
    #[must_use]
    pub fn history_for(&self, source: &str) -> Vec<EventEnvelope> {
        self.ring()
            .entries
            .iter()
            .filter(|envelope| envelope.event.source() == Some(source))
            .cloned()
            .collect()
    }

    /// Sequence number of the newest recorded event.
    #[must_use]
    pub fn last_event_id(&self) -> Option<EventId> {
        self.ring().entries.back().map(|envelope| envelope.id)
    }

    fn ring(&self) -> MutexGuard<'_, ReplayRing> {
        match self.ring.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscription that drains its replay queue before reading live events.
pub struct EventStream {
    replay: VecDeque<EventEnvelope>,
    live: Receiver<EventEnvelope>,
}

impl EventStream {
    /// Next event, or `None` once the bus is gone.
    ///
    /// A subscriber that fell behind skips what it missed and continues with
    /// the oldest event still in the channel.
    pub async fn next(&mut self) -> Option<EventEnvelope> {
        if let Some(envelope) = self.replay.pop_front() {
            return Some(envelope);
        }
        loop {
            match self.live.recv().await {
                Ok(envelope) => return Some(envelope),
                Err(RecvError::Lagged(_)) => {}
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

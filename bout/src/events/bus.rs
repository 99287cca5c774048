//! Event Bus - pub/sub for live match events
//!
//! The EventBus uses a tokio broadcast channel so plain OS threads can emit
//! (`send` never blocks) and listeners can drain with `blocking_recv`.

use std::thread;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use super::types::MatchEvent;

/// Default channel capacity (events)
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1_024;

/// Largest channel a bout will allocate (events)
pub const MAX_CHANNEL_CAPACITY: usize = 1 << 20;

/// Channel capacity that holds every event a bout to `threshold` can record
///
/// A match has at most `2 * threshold - 1` strikes and each strike records at
/// most four events (strike, knockdown, stunned, recovered), plus the opening
/// and closing events. Capped at [`MAX_CHANNEL_CAPACITY`].
pub fn capacity_for(threshold: u32) -> usize {
    (threshold as usize)
        .saturating_mul(8)
        .saturating_add(8)
        .min(MAX_CHANNEL_CAPACITY)
}

/// Central event bus for a bout
pub struct EventBus {
    tx: broadcast::Sender<MatchEvent>,
}

impl EventBus {
    /// Create a new event bus with the given capacity
    pub fn new(capacity: usize) -> Self {
        debug!(capacity, "EventBus::new: creating event bus");
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Create a new event bus with default capacity
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CHANNEL_CAPACITY)
    }

    /// Create an event bus that a listener cannot fall behind on
    ///
    /// Every event of a bout to `threshold` fits in the channel, so a slow
    /// listener still sees all of them once it catches up.
    pub fn for_threshold(threshold: u32) -> Self {
        Self::new(capacity_for(threshold))
    }

    /// Subscribe to receive events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<MatchEvent> {
        debug!("EventBus::subscribe: new subscriber");
        self.tx.subscribe()
    }

    /// Create an emitter handle for the arbiter
    pub fn emitter(&self) -> EventEmitter {
        debug!("EventBus::emitter: creating emitter");
        EventEmitter { tx: self.tx.clone() }
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::with_default_capacity()
    }
}

/// Handle for emitting events without owning the bus
#[derive(Clone)]
pub struct EventEmitter {
    tx: broadcast::Sender<MatchEvent>,
}

impl EventEmitter {
    /// Emit an event to all subscribers
    ///
    /// Fire-and-forget: with no subscribers the event is dropped.
    pub fn emit(&self, event: MatchEvent) {
        debug!(event_type = event.event_type(), "EventEmitter::emit");
        let _ = self.tx.send(event);
    }
}

impl std::fmt::Debug for EventEmitter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventEmitter")
            .field("receivers", &self.tx.receiver_count())
            .finish()
    }
}

/// What a listener got through before its channel closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListenerSummary {
    /// Events handed to the handler
    pub seen: usize,

    /// Events lost because the listener fell behind
    pub skipped: u64,
}

impl ListenerSummary {
    pub fn is_lossless(&self) -> bool {
        self.skipped == 0
    }
}

/// Drain a subscription on its own thread until every sender is gone
pub fn spawn_event_listener<F>(
    mut rx: broadcast::Receiver<MatchEvent>,
    mut handler: F,
) -> thread::JoinHandle<ListenerSummary>
where
    F: FnMut(&MatchEvent) + Send + 'static,
{
    debug!("spawn_event_listener: called");
    thread::spawn(move || {
        let mut summary = ListenerSummary::default();
        loop {
            match rx.blocking_recv() {
                Ok(event) => {
                    summary.seen += 1;
                    handler(&event);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "spawn_event_listener: listener lagged, events dropped");
                    summary.skipped += skipped;
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!(?summary, "spawn_event_listener: channel closed");
                    break;
                }
            }
        }
        summary
    })
}

//! Match events for live observability
//!
//! Every strike, knockdown, recovery and the final outcome is a [`MatchEvent`].
//! The arbiter records each one in its transcript while holding its lock, so
//! the transcript order is the order in which things happened, and forwards a
//! copy to the [`EventBus`] for live consumers (the CLI play-by-play).
//!
//! # Usage
//!
//! ```rust,ignore
//! use bout::events::{EventBus, spawn_event_listener};
//!
//! let bus = EventBus::for_threshold(config.threshold);
//! let printer = spawn_event_listener(bus.subscribe(), |event| println!("{}", event));
//! let bout = Bout::with_events(config, bus.emitter())?;
//! let report = bout.run()?;
//! drop(bout);
//! drop(bus);
//! let summary = printer.join();
//! ```

mod bus;
mod types;

pub use bus::{
    DEFAULT_CHANNEL_CAPACITY, EventBus, EventEmitter, ListenerSummary, MAX_CHANNEL_CAPACITY, capacity_for,
    spawn_event_listener,
};
pub use types::MatchEvent;

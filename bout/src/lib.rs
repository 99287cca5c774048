//! Bout - a two-thread boxing match with a strictly alternating arbiter
//!
//! Two participants run on their own OS threads and share one arbiter (the
//! ring). Each asks the arbiter for its turn; the arbiter blocks it until the
//! turn flag names its corner, lets it land one strike, flips the turn and
//! checks whether anyone reached the threshold. A strike may knock the
//! opponent down for a moment, during which its turn is a no-op.
//!
//! # Modules
//!
//! - [`arbiter`] - turn arbitration and termination
//! - [`participant`] - the contestants and their thread loop
//! - [`driver`] - assembling, running and reporting a bout
//! - [`events`] - match events and the live event bus
//! - [`config`] - configuration types and loading
//! - [`cli`] - command-line interface
//!
//! # Example
//!
//! ```ignore
//! use bout::{Bout, MatchConfig};
//!
//! let bout = Bout::new(MatchConfig::default())?;
//! let report = bout.run()?;
//! println!("{:?}", report.outcome);
//! ```

pub mod arbiter;
pub mod cli;
pub mod config;
pub mod corner;
pub mod driver;
pub mod error;
pub mod events;
pub mod participant;
pub mod report;

// Re-export commonly used types
pub use arbiter::{Arbiter, Grant, MatchPhase};
pub use config::{Config, KnockdownConfig, MatchConfig};
pub use corner::Corner;
pub use driver::Bout;
pub use error::{MatchError, MatchResult};
pub use events::{EventBus, EventEmitter, ListenerSummary, MatchEvent, spawn_event_listener};
pub use participant::{Dice, Participant, ParticipantExit, Strike};
pub use report::{CornerReport, MatchOutcome, MatchReport};

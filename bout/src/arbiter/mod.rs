//! Arbiter - the ring both participants share
//!
//! One mutex and one condition variable. A participant asking for a turn
//! sleeps on the condition variable until the turn flag names its corner (or
//! the match ends), re-checking after every wake. The strike, the turn flip and
//! the winner check happen in one critical section, so two participants can
//! never both hold the turn and a winner is declared exactly once.
//!
//! ```text
//!   WAITING_FOR_RED  ⇄  WAITING_FOR_BLUE
//!          │                    │
//!          └──────► MATCH_OVER ◄┘   (decided or abandoned, absorbing)
//! ```

mod core;
mod state;

pub use core::Arbiter;
pub use state::{Grant, MatchPhase};

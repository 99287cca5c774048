//! Participants - one contestant per OS thread
//!
//! A participant owns its strike counter, its knockdown flag and its dice, and
//! holds a non-owning reference to its opponent. Its thread loops asking the
//! arbiter for a turn until the match is over.

mod core;
mod dice;

pub use core::{Participant, ParticipantExit, Strike};
pub use dice::Dice;

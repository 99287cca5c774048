//! State types for the arbiter

use serde::{Deserialize, Serialize};

use crate::corner::Corner;
use crate::events::MatchEvent;
use crate::participant::Strike;

/// Where the match stands
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", rename_all = "snake_case")]
pub enum MatchPhase {
    /// Turns are still being handed out
    InProgress,

    /// A participant reached the threshold
    Decided { winner: Corner },

    /// Ended without a winner; `by` is the withdrawing corner, if any
    Abandoned { by: Option<Corner>, reason: String },
}

impl MatchPhase {
    /// Terminal phases are absorbing
    pub fn is_over(&self) -> bool {
        !matches!(self, MatchPhase::InProgress)
    }
}

/// Answer to a turn request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Grant {
    /// The participant landed a strike and the turn passed to its opponent
    Struck(Strike),

    /// It is the participant's turn but it is knocked down; nothing happened
    Stunned,

    /// The match is over; the participant should stop
    Finished,
}

/// Internal state protected by the arbiter mutex
#[derive(Debug)]
pub(crate) struct RingState {
    /// Corner whose turn it is
    pub turn: Corner,

    /// Current phase
    pub phase: MatchPhase,

    /// Per-corner interruption requests
    pub interrupted: [bool; 2],

    /// Corners whose thread has exited
    pub retired: [bool; 2],

    /// Every event, in the order it happened
    pub transcript: Vec<MatchEvent>,
}

impl RingState {
    pub fn new(first: Corner) -> Self {
        Self {
            turn: first,
            phase: MatchPhase::InProgress,
            interrupted: [false; 2],
            retired: [false; 2],
            transcript: Vec::new(),
        }
    }

    pub fn is_interrupted(&self, corner: Corner) -> bool {
        self.interrupted[corner.index()]
    }

    pub fn all_retired(&self) -> bool {
        self.retired.iter().all(|r| *r)
    }
}

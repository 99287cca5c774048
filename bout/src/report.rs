//! Match report produced by the driver

use serde::{Deserialize, Serialize};

use crate::corner::Corner;
use crate::events::MatchEvent;
use crate::participant::ParticipantExit;

/// How the match ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
    /// A participant reached the threshold
    Decided { winner: Corner, name: String, strikes: u32 },

    /// No winner: withdrawn, cancelled, or past the deadline
    Abandoned { by: Option<Corner>, reason: String },
}

/// Final state of one corner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CornerReport {
    pub corner: Corner,
    pub name: String,
    pub strikes: u32,
    pub knockdowns: u32,
    pub exit: ParticipantExit,
}

/// Everything observable about a finished match
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchReport {
    pub outcome: MatchOutcome,
    pub red: CornerReport,
    pub blue: CornerReport,
    pub transcript: Vec<MatchEvent>,
    #[serde(rename = "duration-ms")]
    pub duration_ms: u64,
}

impl MatchReport {
    /// A winner was decided and both threads ended normally
    pub fn is_complete(&self) -> bool {
        matches!(self.outcome, MatchOutcome::Decided { .. }) && self.red.exit.is_normal() && self.blue.exit.is_normal()
    }

    pub fn corner(&self, corner: Corner) -> &CornerReport {
        match corner {
            Corner::Red => &self.red,
            Corner::Blue => &self.blue,
        }
    }

    pub fn winner(&self) -> Option<&CornerReport> {
        match self.outcome {
            MatchOutcome::Decided { winner, .. } => Some(self.corner(winner)),
            MatchOutcome::Abandoned { .. } => None,
        }
    }

    /// Corners of every strike, in order
    pub fn strike_order(&self) -> Vec<Corner> {
        self.transcript
            .iter()
            .filter_map(|event| match event {
                MatchEvent::Strike { corner, .. } => Some(*corner),
                _ => None,
            })
            .collect()
    }
}

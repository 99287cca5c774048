//! Event types for bout activity
//!
//! These events represent everything observable about a match:
//! - Lifecycle (start, winner, withdrawal, cancellation)
//! - Turns (strikes, and no-op grants while knocked down)
//! - Knockdowns and recoveries

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::corner::Corner;

/// Core event enum - the vocabulary of a bout
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum MatchEvent {
    // === Lifecycle ===
    /// The bell rang
    BoutStarted {
        red: String,
        blue: String,
        first: Corner,
        threshold: u32,
    },
    /// A participant reached the threshold
    Winner { corner: Corner, name: String, total: u32 },
    /// A participant left the match before it was decided
    Withdrawn { corner: Corner, name: String, reason: String },
    /// The match was cancelled from outside
    Cancelled { reason: String },

    // === Turns ===
    /// A granted, non-disrupted turn
    Strike { corner: Corner, name: String, total: u32 },
    /// A turn granted to a knocked-down participant; does not count
    Stunned { corner: Corner, name: String },

    // === Knockdowns ===
    /// A strike knocked the opponent down
    Knockdown {
        corner: Corner,
        name: String,
        recovery_ms: u64,
    },
    /// A knocked-down participant is back on its feet
    Recovered { corner: Corner, name: String },
}

impl MatchEvent {
    /// Short name of the variant, for logs
    pub fn event_type(&self) -> &'static str {
        match self {
            MatchEvent::BoutStarted { .. } => "bout_started",
            MatchEvent::Winner { .. } => "winner",
            MatchEvent::Withdrawn { .. } => "withdrawn",
            MatchEvent::Cancelled { .. } => "cancelled",
            MatchEvent::Strike { .. } => "strike",
            MatchEvent::Stunned { .. } => "stunned",
            MatchEvent::Knockdown { .. } => "knockdown",
            MatchEvent::Recovered { .. } => "recovered",
        }
    }

    /// Corner the event is about, if any
    pub fn corner(&self) -> Option<Corner> {
        match self {
            MatchEvent::Winner { corner, .. }
            | MatchEvent::Withdrawn { corner, .. }
            | MatchEvent::Strike { corner, .. }
            | MatchEvent::Stunned { corner, .. }
            | MatchEvent::Knockdown { corner, .. }
            | MatchEvent::Recovered { corner, .. } => Some(*corner),
            MatchEvent::BoutStarted { .. } | MatchEvent::Cancelled { .. } => None,
        }
    }

    /// Whether this event ends the match
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            MatchEvent::Winner { .. } | MatchEvent::Withdrawn { .. } | MatchEvent::Cancelled { .. }
        )
    }
}

impl fmt::Display for MatchEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchEvent::BoutStarted { red, blue, threshold, .. } => {
                write!(f, "{} vs {}, first to {} strikes", red, blue, threshold)
            }
            MatchEvent::Winner { name, .. } => write!(f, "{} wins!", name),
            MatchEvent::Withdrawn { name, reason, .. } => write!(f, "{} withdraws: {}", name, reason),
            MatchEvent::Cancelled { reason } => write!(f, "Match cancelled: {}", reason),
            MatchEvent::Strike { name, total, .. } => write!(f, "{} strikes! Total: {}", name, total),
            MatchEvent::Stunned { name, .. } => write!(f, "{} is still down", name),
            MatchEvent::Knockdown { name, .. } => write!(f, "{} is knocked down!", name),
            MatchEvent::Recovered { name, .. } => write!(f, "{} is back up", name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serialization_is_tagged() {
        let event = MatchEvent::Strike {
            corner: Corner::Red,
            name: "Ali".to_string(),
            total: 3,
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains(r#""type":"Strike""#));
        assert!(json.contains(r#""corner":"red""#));

        let deserialized: MatchEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(deserialized, event);
    }

    #[test]
    fn test_display_play_by_play() {
        let strike = MatchEvent::Strike {
            corner: Corner::Blue,
            name: "Tyson".to_string(),
            total: 12,
        };
        assert_eq!(strike.to_string(), "Tyson strikes! Total: 12");

        let winner = MatchEvent::Winner {
            corner: Corner::Red,
            name: "Ali".to_string(),
            total: 26,
        };
        assert_eq!(winner.to_string(), "Ali wins!");
    }

    #[test]
    fn test_terminal_events() {
        let cancelled = MatchEvent::Cancelled {
            reason: "deadline".to_string(),
        };
        assert!(cancelled.is_terminal());
        assert_eq!(cancelled.corner(), None);

        let knockdown = MatchEvent::Knockdown {
            corner: Corner::Blue,
            name: "Tyson".to_string(),
            recovery_ms: 120,
        };
        assert!(!knockdown.is_terminal());
        assert_eq!(knockdown.corner(), Some(Corner::Blue));
        assert_eq!(knockdown.event_type(), "knockdown");
    }
}

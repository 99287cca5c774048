//! Match error types

use thiserror::Error;

use crate::corner::Corner;

/// Errors that can occur while assembling or running a bout
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Participant {name} has no opponent wired")]
    Unwired { name: String },

    #[error("Participant {name} already has an opponent")]
    AlreadyWired { name: String },

    #[error("Participant {name} is in the {actual} corner, expected {expected}")]
    CornerMismatch {
        name: String,
        expected: Corner,
        actual: Corner,
    },

    #[error("Wait interrupted for the {corner} corner")]
    Interrupted { corner: Corner },

    #[error("Arbiter lock poisoned by a panicking participant")]
    Poisoned,
}

/// Result alias for match operations
pub type MatchResult<T> = Result<T, MatchError>;

//! Corner identity - which seat a participant occupies and whose turn it is

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the two corners of the ring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Corner {
    #[default]
    Red,
    Blue,
}

impl Corner {
    /// Both corners, red first
    pub const ALL: [Corner; 2] = [Corner::Red, Corner::Blue];

    /// The opposing corner
    pub fn other(self) -> Self {
        match self {
            Corner::Red => Corner::Blue,
            Corner::Blue => Corner::Red,
        }
    }

    /// Stable slot index for per-corner arrays
    pub fn index(self) -> usize {
        match self {
            Corner::Red => 0,
            Corner::Blue => 1,
        }
    }
}

impl fmt::Display for Corner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Corner::Red => "red",
            Corner::Blue => "blue",
        };
        f.pad(label)
    }
}

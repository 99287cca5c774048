//! Per-participant randomness: knockdown rolls and pause lengths

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;
use tracing::debug;

use crate::config::MatchConfig;
use crate::corner::Corner;

/// Random source owned by one participant
#[derive(Debug)]
pub struct Dice {
    rng: StdRng,
    knockdown_chance: f64,
    max_recovery: Duration,
    max_pace: Duration,
}

impl Dice {
    /// Build the dice for one corner
    ///
    /// With a seed, each corner gets its own deterministic stream.
    pub fn new(config: &MatchConfig, corner: Corner) -> Self {
        debug!(%corner, seed = ?config.seed, "Dice::new: called");
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(corner.index() as u64)),
            None => StdRng::from_os_rng(),
        };
        Self {
            rng,
            knockdown_chance: config.knockdown.chance,
            max_recovery: config.knockdown.max_recovery(),
            max_pace: config.max_pace(),
        }
    }

    /// Roll for a knockdown; returns how long it lasts when it lands
    pub fn roll_knockdown(&mut self) -> Option<Duration> {
        if self.knockdown_chance <= 0.0 {
            return None;
        }
        if self.rng.random::<f64>() < self.knockdown_chance {
            let max = self.max_recovery;
            Some(self.bounded(max))
        } else {
            None
        }
    }

    /// Pause taken after a strike
    pub fn pace(&mut self) -> Duration {
        let max = self.max_pace;
        self.bounded(max)
    }

    fn bounded(&mut self, max: Duration) -> Duration {
        let max_ms = u64::try_from(max.as_millis()).unwrap_or(u64::MAX);
        Duration::from_millis(self.rng.random_range(0..=max_ms))
    }
}

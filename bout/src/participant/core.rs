//! Participant implementation

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, Weak};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::arbiter::{Arbiter, Grant};
use crate::config::MatchConfig;
use crate::corner::Corner;
use crate::error::{MatchError, MatchResult};

use super::dice::Dice;

/// Result of one granted turn, produced under the arbiter lock
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Strike {
    /// Strike count after this strike
    pub total: u32,
    /// How long the opponent stays down, if it was knocked down
    pub knockdown: Option<Duration>,
    /// Pause the striker takes before asking for its next turn
    pub pace: Duration,
}

/// How a participant's thread ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ParticipantExit {
    /// Loop ended because the match was over
    Completed,
    /// A wait or pause was interrupted
    Interrupted,
    /// The loop hit an error other than an interruption
    Failed { reason: String },
    /// The thread panicked
    Panicked,
}

impl ParticipantExit {
    pub fn is_normal(&self) -> bool {
        matches!(self, ParticipantExit::Completed)
    }
}

/// One contestant
///
/// The strike counter and the knockdown flag are only written while the
/// arbiter lock is held; atomics make them readable from the opponent's thread.
#[derive(Debug)]
pub struct Participant {
    name: String,
    corner: Corner,
    strikes: AtomicU32,
    knocked_down: AtomicBool,
    knockdowns: AtomicU32,
    opponent: OnceLock<Weak<Participant>>,
    dice: Mutex<Dice>,
}

impl Participant {
    /// Create a participant with its own dice
    pub fn new(name: impl Into<String>, corner: Corner, dice: Dice) -> Self {
        let name = name.into();
        debug!(%name, %corner, "Participant::new: called");
        Self {
            name,
            corner,
            strikes: AtomicU32::new(0),
            knocked_down: AtomicBool::new(false),
            knockdowns: AtomicU32::new(0),
            opponent: OnceLock::new(),
            dice: Mutex::new(dice),
        }
    }

    /// Create the participant for a corner from match parameters
    pub fn from_config(config: &MatchConfig, corner: Corner) -> Self {
        Self::new(config.name(corner), corner, Dice::new(config, corner))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn corner(&self) -> Corner {
        self.corner
    }

    /// Strikes landed so far
    pub fn strikes(&self) -> u32 {
        self.strikes.load(Ordering::Acquire)
    }

    /// Whether the participant is currently down
    pub fn is_knocked_down(&self) -> bool {
        self.knocked_down.load(Ordering::Acquire)
    }

    /// Knockdowns suffered so far
    pub fn knockdowns(&self) -> u32 {
        self.knockdowns.load(Ordering::Acquire)
    }

    /// Wire the opponent; allowed exactly once
    pub fn link(&self, opponent: &Arc<Participant>) -> MatchResult<()> {
        debug!(name = %self.name, opponent = %opponent.name, "Participant::link: called");
        if opponent.corner == self.corner {
            return Err(MatchError::CornerMismatch {
                name: opponent.name.clone(),
                expected: self.corner.other(),
                actual: opponent.corner,
            });
        }
        self.opponent
            .set(Arc::downgrade(opponent))
            .map_err(|_| MatchError::AlreadyWired {
                name: self.name.clone(),
            })
    }

    /// The wired opponent
    pub fn opponent(&self) -> MatchResult<Arc<Participant>> {
        self.opponent
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| MatchError::Unwired {
                name: self.name.clone(),
            })
    }

    /// Whether `other` is the participant this one is wired to
    pub fn is_wired_to(&self, other: &Arc<Participant>) -> bool {
        self.opponent
            .get()
            .is_some_and(|weak| std::ptr::eq(weak.as_ptr(), Arc::as_ptr(other)))
    }

    /// Land one strike: count it, then try to knock the opponent down
    ///
    /// Only the arbiter calls this, with its lock held and after checking that
    /// this participant is on its feet.
    pub(crate) fn act(&self) -> MatchResult<Strike> {
        let opponent = self.opponent()?;
        let total = self.strikes.fetch_add(1, Ordering::AcqRel) + 1;
        let knockdown = opponent.disrupt()?;
        let pace = self.dice()?.pace();
        debug!(name = %self.name, total, ?knockdown, ?pace, "Participant::act: landed");
        Ok(Strike { total, knockdown, pace })
    }

    /// Take a hit: maybe go down, returning how long for
    ///
    /// Called on the striker's thread under the arbiter lock. The recovery
    /// pause itself happens after the lock is released.
    pub(crate) fn disrupt(&self) -> MatchResult<Option<Duration>> {
        if self.is_knocked_down() {
            return Ok(None);
        }
        let recovery = self.dice()?.roll_knockdown();
        if recovery.is_some() {
            self.knocked_down.store(true, Ordering::Release);
            self.knockdowns.fetch_add(1, Ordering::AcqRel);
        }
        Ok(recovery)
    }

    /// Back on its feet; returns whether it was down
    pub(crate) fn clear_knockdown(&self) -> bool {
        self.knocked_down.swap(false, Ordering::AcqRel)
    }

    /// Thread main loop
    ///
    /// Never panics on interruption: the participant withdraws through the
    /// arbiter so the opponent is released, and reports how it ended.
    pub fn run(&self, arbiter: &Arbiter) -> ParticipantExit {
        debug!(name = %self.name, corner = %self.corner, "Participant::run: called");
        match self.fight(arbiter) {
            Ok(()) => {
                debug!(name = %self.name, strikes = self.strikes(), "Participant::run: completed");
                ParticipantExit::Completed
            }
            Err(MatchError::Interrupted { corner }) => {
                warn!(name = %self.name, %corner, "Participant::run: interrupted, withdrawing");
                arbiter.withdraw(self, "interrupted");
                ParticipantExit::Interrupted
            }
            Err(e) => {
                error!(name = %self.name, error = %e, "Participant::run: failed, withdrawing");
                let reason = e.to_string();
                arbiter.withdraw(self, &reason);
                ParticipantExit::Failed { reason }
            }
        }
    }

    fn fight(&self, arbiter: &Arbiter) -> MatchResult<()> {
        let opponent = self.opponent()?;
        let threshold = arbiter.threshold();
        loop {
            if self.strikes() >= threshold || opponent.strikes() >= threshold || arbiter.is_over()? {
                return Ok(());
            }
            match arbiter.request_turn(self)? {
                Grant::Struck(strike) => {
                    if let Some(recovery) = strike.knockdown {
                        let _down = KnockdownGuard {
                            arbiter,
                            victim: &opponent,
                        };
                        arbiter.pause(self.corner, recovery)?;
                    }
                    arbiter.pause(self.corner, strike.pace)?;
                }
                Grant::Stunned => arbiter.await_recovery(self)?,
                Grant::Finished => return Ok(()),
            }
        }
    }

    fn dice(&self) -> MatchResult<MutexGuard<'_, Dice>> {
        self.dice.lock().map_err(|_| MatchError::Poisoned)
    }
}

/// Puts a knocked-down opponent back on its feet when dropped
struct KnockdownGuard<'a> {
    arbiter: &'a Arbiter,
    victim: &'a Participant,
}

impl Drop for KnockdownGuard<'_> {
    fn drop(&mut self) {
        self.arbiter.recover(self.victim);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KnockdownConfig;

    fn config(chance: f64) -> MatchConfig {
        MatchConfig {
            knockdown: KnockdownConfig {
                chance,
                max_recovery_ms: 0,
            },
            max_pace_ms: 0,
            seed: Some(3),
            ..Default::default()
        }
    }

    fn pair(chance: f64) -> (Arc<Participant>, Arc<Participant>) {
        let config = config(chance);
        let red = Arc::new(Participant::from_config(&config, Corner::Red));
        let blue = Arc::new(Participant::from_config(&config, Corner::Blue));
        red.link(&blue).unwrap();
        blue.link(&red).unwrap();
        (red, blue)
    }

    #[test]
    fn test_new_participant_starts_fresh() {
        let participant = Participant::from_config(&MatchConfig::default(), Corner::Blue);
        assert_eq!(participant.name(), "Tyson");
        assert_eq!(participant.corner(), Corner::Blue);
        assert_eq!(participant.strikes(), 0);
        assert_eq!(participant.knockdowns(), 0);
        assert!(!participant.is_knocked_down());
    }

    #[test]
    fn test_unwired_opponent_is_an_error() {
        let participant = Participant::from_config(&MatchConfig::default(), Corner::Red);
        assert!(matches!(participant.opponent(), Err(MatchError::Unwired { .. })));
    }

    #[test]
    fn test_link_only_once() {
        let (red, blue) = pair(0.0);
        assert!(red.is_wired_to(&blue));
        assert!(matches!(red.link(&blue), Err(MatchError::AlreadyWired { .. })));
    }

    #[test]
    fn test_link_rejects_same_corner() {
        let config = MatchConfig::default();
        let red = Participant::from_config(&config, Corner::Red);
        let other_red = Arc::new(Participant::new("Frazier", Corner::Red, Dice::new(&config, Corner::Red)));
        assert!(matches!(red.link(&other_red), Err(MatchError::CornerMismatch { .. })));
    }

    #[test]
    fn test_opponent_reference_does_not_own() {
        let config = MatchConfig::default();
        let red = Participant::from_config(&config, Corner::Red);
        let blue = Arc::new(Participant::from_config(&config, Corner::Blue));
        red.link(&blue).unwrap();
        drop(blue);
        assert!(matches!(red.opponent(), Err(MatchError::Unwired { .. })));
    }

    #[test]
    fn test_act_counts_without_knockdown() {
        let (red, blue) = pair(0.0);
        let strike = red.act().unwrap();
        assert_eq!(strike.total, 1);
        assert_eq!(strike.knockdown, None);
        assert_eq!(strike.pace, Duration::ZERO);
        assert_eq!(red.strikes(), 1);
        assert!(!blue.is_knocked_down());
    }

    #[test]
    fn test_act_knocks_opponent_down() {
        let (red, blue) = pair(1.0);
        let strike = red.act().unwrap();
        assert_eq!(strike.knockdown, Some(Duration::ZERO));
        assert!(blue.is_knocked_down());
        assert_eq!(blue.knockdowns(), 1);

        assert!(blue.clear_knockdown());
        assert!(!blue.is_knocked_down());
        assert!(!blue.clear_knockdown());
    }

    #[test]
    fn test_disrupt_does_not_stack() {
        let (_red, blue) = pair(1.0);
        assert!(blue.disrupt().unwrap().is_some());
        assert!(blue.disrupt().unwrap().is_none());
        assert_eq!(blue.knockdowns(), 1);
    }

    #[test]
    fn test_exit_normality() {
        assert!(ParticipantExit::Completed.is_normal());
        assert!(!ParticipantExit::Interrupted.is_normal());
        assert!(!ParticipantExit::Panicked.is_normal());
        assert!(
            !ParticipantExit::Failed {
                reason: "x".to_string()
            }
            .is_normal()
        );
    }
}

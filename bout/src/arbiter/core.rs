//! Arbiter implementation

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::corner::Corner;
use crate::error::{MatchError, MatchResult};
use crate::events::{EventEmitter, MatchEvent};
use crate::participant::Participant;

use super::state::{Grant, MatchPhase, RingState};

/// The shared synchronization point of a bout
///
/// Hands out turns in strict alternation, one participant at a time, and
/// decides the match. Every read and write of the turn, the phase and the
/// participants' counters and knockdown flags happens under `state`; `bell`
/// wakes anyone whose wait condition may have changed.
#[derive(Debug)]
pub struct Arbiter {
    threshold: u32,
    state: Mutex<RingState>,
    bell: Condvar,
    events: Option<EventEmitter>,
}

impl Arbiter {
    /// Create an arbiter; `first` holds the opening turn
    pub fn new(threshold: u32, first: Corner) -> Self {
        debug!(threshold, %first, "Arbiter::new: called");
        Self {
            threshold,
            state: Mutex::new(RingState::new(first)),
            bell: Condvar::new(),
            events: None,
        }
    }

    /// Forward every recorded event to a live emitter
    pub fn with_events(mut self, emitter: EventEmitter) -> Self {
        debug!("Arbiter::with_events: called");
        self.events = Some(emitter);
        self
    }

    /// Strike count that wins the match
    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    /// Record an event that is not tied to a turn (e.g. the opening bell)
    pub fn announce(&self, event: MatchEvent) -> MatchResult<()> {
        debug!(event_type = event.event_type(), "Arbiter::announce: called");
        let mut state = self.lock()?;
        self.record(&mut state, event);
        Ok(())
    }

    /// Block until it is this participant's turn, then take it
    pub fn request_turn(&self, participant: &Participant) -> MatchResult<Grant> {
        let corner = participant.corner();
        debug!(name = participant.name(), %corner, "Arbiter::request_turn: called");

        let state = self.lock()?;
        let mut state = self
            .bell
            .wait_while(state, |s| {
                s.turn != corner && !s.phase.is_over() && !s.is_interrupted(corner)
            })
            .map_err(|_| MatchError::Poisoned)?;

        if state.is_interrupted(corner) {
            debug!(%corner, "Arbiter::request_turn: interrupted while waiting");
            return Err(MatchError::Interrupted { corner });
        }
        if state.phase.is_over() {
            debug!(%corner, "Arbiter::request_turn: match already over");
            return Ok(Grant::Finished);
        }

        // A winner may have been declared while this participant waited
        let opponent = participant.opponent()?;
        if participant.strikes() >= self.threshold || opponent.strikes() >= self.threshold {
            debug!(%corner, "Arbiter::request_turn: threshold already reached");
            return Ok(Grant::Finished);
        }

        if participant.is_knocked_down() {
            debug!(%corner, "Arbiter::request_turn: participant is down, no-op grant");
            self.record(
                &mut state,
                MatchEvent::Stunned {
                    corner,
                    name: participant.name().to_string(),
                },
            );
            return Ok(Grant::Stunned);
        }

        let strike = participant.act()?;
        self.record(
            &mut state,
            MatchEvent::Strike {
                corner,
                name: participant.name().to_string(),
                total: strike.total,
            },
        );
        if let Some(recovery) = strike.knockdown {
            self.record(
                &mut state,
                MatchEvent::Knockdown {
                    corner: opponent.corner(),
                    name: opponent.name().to_string(),
                    recovery_ms: u64::try_from(recovery.as_millis()).unwrap_or(u64::MAX),
                },
            );
        }

        state.turn = corner.other();
        self.bell.notify_all();

        self.check_winner(&mut state, participant, &opponent);
        Ok(Grant::Struck(strike))
    }

    /// Block until a knocked-down participant is back up
    pub fn await_recovery(&self, participant: &Participant) -> MatchResult<()> {
        let corner = participant.corner();
        debug!(name = participant.name(), %corner, "Arbiter::await_recovery: called");

        let state = self.lock()?;
        let state = self
            .bell
            .wait_while(state, |s| {
                participant.is_knocked_down() && !s.phase.is_over() && !s.is_interrupted(corner)
            })
            .map_err(|_| MatchError::Poisoned)?;

        if state.is_interrupted(corner) {
            return Err(MatchError::Interrupted { corner });
        }
        Ok(())
    }

    /// Put a knocked-down participant back on its feet
    ///
    /// Called from drop guards, so it must work even if the lock is poisoned.
    pub fn recover(&self, participant: &Participant) {
        debug!(name = participant.name(), "Arbiter::recover: called");
        let mut state = self.lock_unpoisoned();
        if participant.clear_knockdown() {
            self.record(
                &mut state,
                MatchEvent::Recovered {
                    corner: participant.corner(),
                    name: participant.name().to_string(),
                },
            );
        }
        self.bell.notify_all();
    }

    /// Sleep on behalf of a participant without holding the lock
    ///
    /// Returns early with `Interrupted` if the corner is interrupted.
    pub fn pause(&self, corner: Corner, duration: Duration) -> MatchResult<()> {
        debug!(%corner, ?duration, "Arbiter::pause: called");
        let state = self.lock()?;
        let (state, _timeout) = self
            .bell
            .wait_timeout_while(state, duration, |s| !s.is_interrupted(corner))
            .map_err(|_| MatchError::Poisoned)?;

        if state.is_interrupted(corner) {
            return Err(MatchError::Interrupted { corner });
        }
        Ok(())
    }

    /// Interrupt one participant's waits and pauses
    pub fn interrupt(&self, corner: Corner) {
        info!(%corner, "Arbiter::interrupt: called");
        let mut state = self.lock_unpoisoned();
        state.interrupted[corner.index()] = true;
        self.bell.notify_all();
    }

    /// End the match from outside, without a winner
    pub fn cancel(&self, reason: &str) {
        info!(%reason, "Arbiter::cancel: called");
        let mut state = self.lock_unpoisoned();
        state.interrupted = [true; 2];
        if !state.phase.is_over() {
            state.phase = MatchPhase::Abandoned {
                by: None,
                reason: reason.to_string(),
            };
            self.record(
                &mut state,
                MatchEvent::Cancelled {
                    reason: reason.to_string(),
                },
            );
        }
        self.bell.notify_all();
    }

    /// A participant leaves the match; its opponent is released
    ///
    /// No-op once the match is over.
    pub fn withdraw(&self, participant: &Participant, reason: &str) {
        let corner = participant.corner();
        debug!(name = participant.name(), %corner, %reason, "Arbiter::withdraw: called");
        let mut state = self.lock_unpoisoned();
        if state.phase.is_over() {
            debug!(%corner, "Arbiter::withdraw: match already over, ignoring");
        } else {
            warn!(name = participant.name(), %reason, "Arbiter::withdraw: participant withdrew");
            state.phase = MatchPhase::Abandoned {
                by: Some(corner),
                reason: reason.to_string(),
            };
            self.record(
                &mut state,
                MatchEvent::Withdrawn {
                    corner,
                    name: participant.name().to_string(),
                    reason: reason.to_string(),
                },
            );
        }
        self.bell.notify_all();
    }

    /// Mark a corner's thread as gone
    pub fn retire(&self, corner: Corner) {
        debug!(%corner, "Arbiter::retire: called");
        let mut state = self.lock_unpoisoned();
        state.retired[corner.index()] = true;
        self.bell.notify_all();
    }

    /// Block until the match is over, both threads are gone, or `timeout` elapses
    ///
    /// Returns false only on timeout.
    pub fn await_finish(&self, timeout: Duration) -> MatchResult<bool> {
        debug!(?timeout, "Arbiter::await_finish: called");
        let state = self.lock()?;
        let (_state, result) = self
            .bell
            .wait_timeout_while(state, timeout, |s| !s.phase.is_over() && !s.all_retired())
            .map_err(|_| MatchError::Poisoned)?;
        Ok(!result.timed_out())
    }

    /// Whether the match has reached a terminal phase
    pub fn is_over(&self) -> MatchResult<bool> {
        Ok(self.lock()?.phase.is_over())
    }

    /// Whether a corner's thread has exited
    pub fn is_retired(&self, corner: Corner) -> bool {
        self.lock_unpoisoned().retired[corner.index()]
    }

    /// Corner whose turn it is
    pub fn turn(&self) -> MatchResult<Corner> {
        Ok(self.lock()?.turn)
    }

    /// Current phase, readable after a participant panicked
    pub fn phase(&self) -> MatchPhase {
        self.lock_unpoisoned().phase.clone()
    }

    /// Copy of every event recorded so far
    pub fn transcript(&self) -> Vec<MatchEvent> {
        self.lock_unpoisoned().transcript.clone()
    }

    fn check_winner(&self, state: &mut RingState, striker: &Participant, opponent: &Participant) {
        if state.phase.is_over() {
            return;
        }
        for candidate in [striker, opponent] {
            let total = candidate.strikes();
            if total >= self.threshold {
                info!(name = candidate.name(), total, "Arbiter::check_winner: match decided");
                state.phase = MatchPhase::Decided {
                    winner: candidate.corner(),
                };
                self.record(
                    state,
                    MatchEvent::Winner {
                        corner: candidate.corner(),
                        name: candidate.name().to_string(),
                        total,
                    },
                );
                self.bell.notify_all();
                return;
            }
        }
    }

    fn record(&self, state: &mut RingState, event: MatchEvent) {
        debug!(event = %event, "Arbiter::record");
        if let Some(events) = &self.events {
            events.emit(event.clone());
        }
        state.transcript.push(event);
    }

    fn lock(&self) -> MatchResult<MutexGuard<'_, RingState>> {
        self.state.lock().map_err(|_| MatchError::Poisoned)
    }

    fn lock_unpoisoned(&self) -> MutexGuard<'_, RingState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{KnockdownConfig, MatchConfig};
    use std::sync::Arc;
    use std::thread;
    use std::time::Instant;

    fn pair(chance: f64) -> (Arc<Participant>, Arc<Participant>) {
        let config = MatchConfig {
            knockdown: KnockdownConfig {
                chance,
                max_recovery_ms: 0,
            },
            max_pace_ms: 0,
            seed: Some(5),
            ..Default::default()
        };
        let red = Arc::new(Participant::from_config(&config, Corner::Red));
        let blue = Arc::new(Participant::from_config(&config, Corner::Blue));
        red.link(&blue).unwrap();
        blue.link(&red).unwrap();
        (red, blue)
    }

    fn count(transcript: &[MatchEvent], event_type: &str) -> usize {
        transcript.iter().filter(|e| e.event_type() == event_type).count()
    }

    #[test]
    fn test_turns_alternate() {
        let (red, blue) = pair(0.0);
        let arbiter = Arbiter::new(10, Corner::Red);

        assert!(matches!(arbiter.request_turn(&red).unwrap(), Grant::Struck(_)));
        assert_eq!(arbiter.turn().unwrap(), Corner::Blue);
        assert!(matches!(arbiter.request_turn(&blue).unwrap(), Grant::Struck(_)));
        assert_eq!(arbiter.turn().unwrap(), Corner::Red);

        assert_eq!(red.strikes(), 1);
        assert_eq!(blue.strikes(), 1);
        assert_eq!(count(&arbiter.transcript(), "strike"), 2);
    }

    #[test]
    fn test_configured_first_turn() {
        let (_red, blue) = pair(0.0);
        let arbiter = Arbiter::new(10, Corner::Blue);
        assert_eq!(arbiter.turn().unwrap(), Corner::Blue);
        assert!(matches!(arbiter.request_turn(&blue).unwrap(), Grant::Struck(_)));
    }

    #[test]
    fn test_winner_declared_once() {
        let (red, blue) = pair(0.0);
        let arbiter = Arbiter::new(1, Corner::Red);

        assert!(matches!(arbiter.request_turn(&red).unwrap(), Grant::Struck(_)));
        assert_eq!(arbiter.phase(), MatchPhase::Decided { winner: Corner::Red });
        assert!(arbiter.is_over().unwrap());

        // Blue holds the turn now but the match is over
        assert_eq!(arbiter.request_turn(&blue).unwrap(), Grant::Finished);
        assert_eq!(blue.strikes(), 0);

        let transcript = arbiter.transcript();
        assert_eq!(count(&transcript, "winner"), 1);
        assert!(transcript.last().unwrap().is_terminal());
    }

    #[test]
    fn test_knocked_down_turn_is_a_noop() {
        let (red, blue) = pair(1.0);
        let arbiter = Arbiter::new(10, Corner::Red);

        match arbiter.request_turn(&red).unwrap() {
            Grant::Struck(strike) => assert!(strike.knockdown.is_some()),
            other => panic!("expected a strike, got {:?}", other),
        }
        assert!(blue.is_knocked_down());

        assert_eq!(arbiter.request_turn(&blue).unwrap(), Grant::Stunned);
        assert_eq!(blue.strikes(), 0);
        assert_eq!(arbiter.turn().unwrap(), Corner::Blue);

        arbiter.recover(&blue);
        assert!(!blue.is_knocked_down());
        arbiter.await_recovery(&blue).unwrap();

        assert!(matches!(arbiter.request_turn(&blue).unwrap(), Grant::Struck(_)));
        assert_eq!(blue.strikes(), 1);

        let types: Vec<_> = arbiter.transcript().iter().map(|e| e.event_type()).collect();
        assert_eq!(
            types,
            vec!["strike", "knockdown", "stunned", "recovered", "strike", "knockdown"]
        );
    }

    #[test]
    fn test_request_blocks_until_turn() {
        let (red, blue) = pair(0.0);
        let arbiter = Arbiter::new(10, Corner::Red);

        thread::scope(|s| {
            let waiting = s.spawn(|| arbiter.request_turn(&blue));
            thread::sleep(Duration::from_millis(50));
            assert!(!waiting.is_finished());
            assert!(matches!(arbiter.request_turn(&red).unwrap(), Grant::Struck(_)));
            assert!(matches!(waiting.join().unwrap().unwrap(), Grant::Struck(_)));
        });

        let corners: Vec<_> = arbiter.transcript().iter().filter_map(|e| e.corner()).collect();
        assert_eq!(corners, vec![Corner::Red, Corner::Blue]);
    }

    #[test]
    fn test_interrupt_wakes_waiting_participant() {
        let (_red, blue) = pair(0.0);
        let arbiter = Arbiter::new(10, Corner::Red);

        thread::scope(|s| {
            let waiting = s.spawn(|| arbiter.request_turn(&blue));
            thread::sleep(Duration::from_millis(20));
            arbiter.interrupt(Corner::Blue);
            let result = waiting.join().unwrap();
            assert!(matches!(result, Err(MatchError::Interrupted { corner: Corner::Blue })));
        });
        assert!(!arbiter.is_over().unwrap());
    }

    #[test]
    fn test_interrupt_cuts_pause_short() {
        let arbiter = Arbiter::new(10, Corner::Red);
        let started = Instant::now();

        thread::scope(|s| {
            let sleeper = s.spawn(|| arbiter.pause(Corner::Red, Duration::from_secs(30)));
            thread::sleep(Duration::from_millis(20));
            arbiter.interrupt(Corner::Red);
            assert!(sleeper.join().unwrap().is_err());
        });
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[test]
    fn test_pause_runs_to_completion() {
        let arbiter = Arbiter::new(10, Corner::Red);
        let started = Instant::now();
        arbiter.pause(Corner::Blue, Duration::from_millis(30)).unwrap();
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[test]
    fn test_cancel_is_terminal_and_once() {
        let arbiter = Arbiter::new(10, Corner::Red);
        arbiter.cancel("deadline");
        arbiter.cancel("again");

        assert!(matches!(arbiter.phase(), MatchPhase::Abandoned { by: None, .. }));
        assert_eq!(count(&arbiter.transcript(), "cancelled"), 1);
        assert!(arbiter.pause(Corner::Red, Duration::from_secs(30)).is_err());
    }

    #[test]
    fn test_withdraw_releases_opponent() {
        let (red, blue) = pair(0.0);
        let arbiter = Arbiter::new(10, Corner::Red);

        thread::scope(|s| {
            let waiting = s.spawn(|| arbiter.request_turn(&blue));
            thread::sleep(Duration::from_millis(20));
            arbiter.withdraw(&red, "interrupted");
            assert_eq!(waiting.join().unwrap().unwrap(), Grant::Finished);
        });
        assert_eq!(
            arbiter.phase(),
            MatchPhase::Abandoned {
                by: Some(Corner::Red),
                reason: "interrupted".to_string()
            }
        );
    }

    #[test]
    fn test_withdraw_after_decision_is_ignored() {
        let (red, blue) = pair(0.0);
        let arbiter = Arbiter::new(1, Corner::Red);
        arbiter.request_turn(&red).unwrap();
        arbiter.withdraw(&blue, "late");

        assert_eq!(arbiter.phase(), MatchPhase::Decided { winner: Corner::Red });
        assert_eq!(count(&arbiter.transcript(), "withdrawn"), 0);
    }

    #[test]
    fn test_await_finish() {
        let (red, _blue) = pair(0.0);
        let arbiter = Arbiter::new(1, Corner::Red);
        assert!(!arbiter.await_finish(Duration::from_millis(10)).unwrap());

        arbiter.request_turn(&red).unwrap();
        assert!(arbiter.await_finish(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_await_finish_when_all_retired() {
        let arbiter = Arbiter::new(10, Corner::Red);
        arbiter.retire(Corner::Red);
        arbiter.retire(Corner::Blue);
        assert!(arbiter.await_finish(Duration::from_millis(10)).unwrap());
    }

    #[test]
    fn test_events_forwarded_to_bus() {
        let bus = crate::events::EventBus::new(16);
        let mut rx = bus.subscribe();
        let (red, _blue) = pair(0.0);
        let arbiter = Arbiter::new(1, Corner::Red).with_events(bus.emitter());

        arbiter.request_turn(&red).unwrap();

        assert_eq!(rx.try_recv().unwrap().event_type(), "strike");
        assert_eq!(rx.try_recv().unwrap().event_type(), "winner");
    }
}

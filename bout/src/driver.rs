//! Match driver - assembles a bout, runs both participants, reports

use std::sync::Arc;
use std::thread;
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::arbiter::{Arbiter, MatchPhase};
use crate::config::MatchConfig;
use crate::corner::Corner;
use crate::error::{MatchError, MatchResult};
use crate::events::{EventEmitter, MatchEvent};
use crate::participant::{Participant, ParticipantExit};
use crate::report::{CornerReport, MatchOutcome, MatchReport};

/// One match: the arbiter and the two participants it mediates
///
/// The bout holds the only strong references to the participants; their
/// opponent links are weak and their threads borrow them for the duration of
/// [`Bout::run`].
#[derive(Debug)]
pub struct Bout {
    config: MatchConfig,
    arbiter: Arbiter,
    red: Arc<Participant>,
    blue: Arc<Participant>,
}

impl Bout {
    /// Build a bout from validated parameters, wiring both opponents
    pub fn new(config: MatchConfig) -> MatchResult<Self> {
        debug!("Bout::new: called");
        Self::build(config, None)
    }

    /// Like [`Bout::new`], forwarding every event to a live emitter
    pub fn with_events(config: MatchConfig, emitter: EventEmitter) -> MatchResult<Self> {
        debug!("Bout::with_events: called");
        Self::build(config, Some(emitter))
    }

    fn build(config: MatchConfig, events: Option<EventEmitter>) -> MatchResult<Self> {
        config.validate()?;
        let red = Arc::new(Participant::from_config(&config, Corner::Red));
        let blue = Arc::new(Participant::from_config(&config, Corner::Blue));
        red.link(&blue)?;
        blue.link(&red)?;
        Self::assemble(config, red, blue, events)
    }

    /// Build a bout around participants created elsewhere
    ///
    /// Both must already be wired to each other; a bout never starts with
    /// incomplete wiring.
    pub fn assemble(
        config: MatchConfig,
        red: Arc<Participant>,
        blue: Arc<Participant>,
        events: Option<EventEmitter>,
    ) -> MatchResult<Self> {
        debug!(red = red.name(), blue = blue.name(), "Bout::assemble: called");
        config.validate()?;

        for (participant, expected) in [(&red, Corner::Red), (&blue, Corner::Blue)] {
            if participant.corner() != expected {
                return Err(MatchError::CornerMismatch {
                    name: participant.name().to_string(),
                    expected,
                    actual: participant.corner(),
                });
            }
        }
        if red.name() == blue.name() {
            return Err(MatchError::InvalidConfig(format!(
                "participant names must be unique, both are '{}'",
                red.name()
            )));
        }
        if !red.is_wired_to(&blue) {
            return Err(MatchError::Unwired {
                name: red.name().to_string(),
            });
        }
        if !blue.is_wired_to(&red) {
            return Err(MatchError::Unwired {
                name: blue.name().to_string(),
            });
        }

        let mut arbiter = Arbiter::new(config.threshold, config.first);
        if let Some(emitter) = events {
            arbiter = arbiter.with_events(emitter);
        }

        Ok(Self {
            config,
            arbiter,
            red,
            blue,
        })
    }

    pub fn config(&self) -> &MatchConfig {
        &self.config
    }

    pub fn arbiter(&self) -> &Arbiter {
        &self.arbiter
    }

    pub fn participant(&self, corner: Corner) -> &Participant {
        match corner {
            Corner::Red => &self.red,
            Corner::Blue => &self.blue,
        }
    }

    /// Interrupt one participant; callable while `run` blocks
    pub fn interrupt(&self, corner: Corner) {
        self.arbiter.interrupt(corner);
    }

    /// Cancel the whole match; callable while `run` blocks
    pub fn cancel(&self, reason: &str) {
        self.arbiter.cancel(reason);
    }

    /// Ring the bell: run both participants to the end and report
    pub fn run(&self) -> MatchResult<MatchReport> {
        info!(
            red = self.red.name(),
            blue = self.blue.name(),
            threshold = self.config.threshold,
            first = %self.config.first,
            "Bout::run: starting"
        );
        let started = Instant::now();

        self.arbiter.announce(MatchEvent::BoutStarted {
            red: self.red.name().to_string(),
            blue: self.blue.name().to_string(),
            first: self.config.first,
            threshold: self.config.threshold,
        })?;

        let (red_exit, blue_exit) = thread::scope(|s| {
            let red = thread::Builder::new()
                .name(format!("bout-{}", Corner::Red))
                .spawn_scoped(s, || self.corner_loop(&self.red));
            let blue = thread::Builder::new()
                .name(format!("bout-{}", Corner::Blue))
                .spawn_scoped(s, || self.corner_loop(&self.blue));

            if let Some(deadline) = self.config.deadline() {
                s.spawn(move || match self.arbiter.await_finish(deadline) {
                    Ok(true) => debug!("Bout::run: watchdog released"),
                    Ok(false) => {
                        warn!(?deadline, "Bout::run: deadline exceeded, cancelling");
                        self.arbiter.cancel("deadline exceeded");
                    }
                    Err(e) => error!(error = %e, "Bout::run: watchdog failed"),
                });
            }

            (
                Self::join(Corner::Red, red, &self.arbiter),
                Self::join(Corner::Blue, blue, &self.arbiter),
            )
        });

        let report = self.report(red_exit, blue_exit, started);
        info!(complete = report.is_complete(), outcome = ?report.outcome, "Bout::run: finished");
        Ok(report)
    }

    fn corner_loop(&self, participant: &Participant) -> ParticipantExit {
        let _seat = Seat {
            arbiter: &self.arbiter,
            participant,
        };
        participant.run(&self.arbiter)
    }

    fn join(
        corner: Corner,
        spawned: std::io::Result<thread::ScopedJoinHandle<'_, ParticipantExit>>,
        arbiter: &Arbiter,
    ) -> ParticipantExit {
        match spawned {
            Ok(handle) => handle.join().unwrap_or_else(|_| {
                error!(%corner, "Bout::join: participant thread panicked");
                ParticipantExit::Panicked
            }),
            Err(e) => {
                error!(%corner, error = %e, "Bout::join: failed to spawn participant thread");
                arbiter.cancel("failed to spawn participant thread");
                arbiter.retire(corner);
                ParticipantExit::Failed { reason: e.to_string() }
            }
        }
    }

    fn report(&self, red_exit: ParticipantExit, blue_exit: ParticipantExit, started: Instant) -> MatchReport {
        let outcome = match self.arbiter.phase() {
            MatchPhase::Decided { winner } => {
                let participant = self.participant(winner);
                MatchOutcome::Decided {
                    winner,
                    name: participant.name().to_string(),
                    strikes: participant.strikes(),
                }
            }
            MatchPhase::Abandoned { by, reason } => MatchOutcome::Abandoned { by, reason },
            MatchPhase::InProgress => MatchOutcome::Abandoned {
                by: None,
                reason: "both participants stopped without a decision".to_string(),
            },
        };

        MatchReport {
            outcome,
            red: Self::corner_report(&self.red, red_exit),
            blue: Self::corner_report(&self.blue, blue_exit),
            transcript: self.arbiter.transcript(),
            duration_ms: u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
        }
    }

    fn corner_report(participant: &Participant, exit: ParticipantExit) -> CornerReport {
        CornerReport {
            corner: participant.corner(),
            name: participant.name().to_string(),
            strikes: participant.strikes(),
            knockdowns: participant.knockdowns(),
            exit,
        }
    }
}

/// Held by a participant's thread for its whole life
///
/// On exit the corner is retired; on a panic the participant also withdraws
/// so its opponent is not left waiting for a turn that never comes.
struct Seat<'a> {
    arbiter: &'a Arbiter,
    participant: &'a Participant,
}

impl Drop for Seat<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.arbiter.withdraw(self.participant, "panicked");
        }
        self.arbiter.retire(self.participant.corner());
    }
}

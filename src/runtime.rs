//! Event serialization for the round machine: subject presses and timer
//! fires are funneled through one loop in strict arrival order, so a timeout
//! superseded by an earlier press can never double-record a round.

use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::time::{Duration, Instant};

use crate::machine::{Advance, MachineError, RoundMachine};
use crate::summary::ExitCode;

/// Unified event type consumed by the runner.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GameEvent {
    /// Button press at a location 1..=6.
    Press(u8),
    Quit,
}

/// Source of subject input events.
pub trait SubjectEventSource: Send + 'static {
    /// Block for up to `timeout` waiting for an event.
    /// Returns Ok(event) if an event arrives before the timeout, or
    /// Err(Timeout) if it expires.
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError>;
}

/// Channel-backed event source, used by tests and by collaborators that
/// forward presses from their own input loop.
pub struct ChannelEventSource {
    rx: Receiver<GameEvent>,
}

impl ChannelEventSource {
    pub fn new(rx: Receiver<GameEvent>) -> Self {
        Self { rx }
    }
}

impl SubjectEventSource for ChannelEventSource {
    fn recv_timeout(&self, timeout: Duration) -> Result<GameEvent, RecvTimeoutError> {
        self.rx.recv_timeout(timeout)
    }
}

/// Drives a machine against real time: waits for subject input only until
/// the machine's next armed deadline, synthesizing the due timer fire when
/// the wait expires.
pub struct Runner<E: SubjectEventSource> {
    event_source: E,
}

impl<E: SubjectEventSource> Runner<E> {
    pub fn new(event_source: E) -> Self {
        Self { event_source }
    }

    /// Run the machine to termination. Returns the exit code the test ended
    /// with; the report stays on the machine.
    pub fn drive(&self, machine: &mut RoundMachine) -> Result<ExitCode, MachineError> {
        let origin = Instant::now();
        machine.start(Some(0.0))?;

        loop {
            let now = elapsed_ms(origin);
            let Some((_, deadline)) = machine.next_deadline() else {
                // No armed timers while unfinished cannot happen; treat it
                // as an abandoned run rather than spinning.
                machine.stop(ExitCode::Abandoned, Some(now));
                return Ok(ExitCode::Abandoned);
            };
            let wait = Duration::from_secs_f64(((deadline - now).max(0.0)) / 1000.0);

            let advance = match self.event_source.recv_timeout(wait) {
                Ok(GameEvent::Press(location)) => {
                    let at = elapsed_ms(origin);
                    match machine.record_response(Some(location), Some(at)) {
                        Ok(advance) => advance,
                        // A stray press outside 1..=6 is the caller's
                        // problem, not a transition; keep serving events.
                        Err(MachineError::InvalidLocation(_)) => continue,
                        Err(e) => return Err(e),
                    }
                }
                Ok(GameEvent::Quit) | Err(RecvTimeoutError::Disconnected) => {
                    machine.stop(ExitCode::Abandoned, Some(elapsed_ms(origin)));
                    return Ok(ExitCode::Abandoned);
                }
                Err(RecvTimeoutError::Timeout) => {
                    let at = elapsed_ms(origin);
                    match machine.due(at) {
                        Some(slot) => machine.fire_timer(slot, Some(at))?,
                        // Raced with a press that rearmed the deadline.
                        None => continue,
                    }
                }
            };

            if let Advance::Finished(code) = advance {
                return Ok(code);
            }
        }
    }
}

fn elapsed_ms(origin: Instant) -> f64 {
    origin.elapsed().as_secs_f64() * 1000.0
}

//! Deadline bookkeeping for the round machine. Two logical slots exist: the
//! per-round no-response timer (rearmed every round) and the global
//! max-test-duration timer (armed once at start). Arming a slot atomically
//! replaces whatever deadline it held, so a stale timeout can never
//! double-record a round.

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TimerSlot {
    NoResponse,
    MaxDuration,
}

#[derive(Debug, Default, Clone)]
pub struct TimerManager {
    no_response: Option<f64>,
    max_duration: Option<f64>,
}

impl TimerManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedule `slot` to fire `duration_ms` after `now_ms`, replacing any
    /// deadline already armed in the same slot.
    pub fn arm(&mut self, slot: TimerSlot, duration_ms: f64, now_ms: f64) {
        *self.slot_mut(slot) = Some(now_ms + duration_ms);
    }

    pub fn cancel(&mut self, slot: TimerSlot) {
        *self.slot_mut(slot) = None;
    }

    pub fn cancel_all(&mut self) {
        self.no_response = None;
        self.max_duration = None;
    }

    pub fn deadline(&self, slot: TimerSlot) -> Option<f64> {
        match slot {
            TimerSlot::NoResponse => self.no_response,
            TimerSlot::MaxDuration => self.max_duration,
        }
    }

    /// The earliest armed deadline, if any.
    pub fn next_deadline(&self) -> Option<(TimerSlot, f64)> {
        let candidates = [
            self.no_response.map(|d| (TimerSlot::NoResponse, d)),
            self.max_duration.map(|d| (TimerSlot::MaxDuration, d)),
        ];
        candidates
            .into_iter()
            .flatten()
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// The earliest slot whose deadline has passed.
    pub fn due(&self, now_ms: f64) -> Option<TimerSlot> {
        self.next_deadline()
            .filter(|(_, deadline)| *deadline <= now_ms)
            .map(|(slot, _)| slot)
    }

    fn slot_mut(&mut self, slot: TimerSlot) -> &mut Option<f64> {
        match slot {
            TimerSlot::NoResponse => &mut self.no_response,
            TimerSlot::MaxDuration => &mut self.max_duration,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn arm_replaces_prior_deadline_in_the_same_slot() {
        let mut timers = TimerManager::new();
        timers.arm(TimerSlot::NoResponse, 1000.0, 0.0);
        timers.arm(TimerSlot::NoResponse, 500.0, 100.0);
        assert_eq!(timers.deadline(TimerSlot::NoResponse), Some(600.0));
    }

    #[test]
    fn next_deadline_picks_the_earliest_slot() {
        let mut timers = TimerManager::new();
        timers.arm(TimerSlot::MaxDuration, 60_000.0, 0.0);
        timers.arm(TimerSlot::NoResponse, 800.0, 0.0);
        assert_eq!(
            timers.next_deadline(),
            Some((TimerSlot::NoResponse, 800.0))
        );
    }

    #[test]
    fn due_respects_the_clock() {
        let mut timers = TimerManager::new();
        timers.arm(TimerSlot::NoResponse, 800.0, 0.0);
        assert_eq!(timers.due(799.0), None);
        assert_eq!(timers.due(800.0), Some(TimerSlot::NoResponse));
    }

    #[test]
    fn cancel_all_disarms_everything() {
        let mut timers = TimerManager::new();
        timers.arm(TimerSlot::NoResponse, 800.0, 0.0);
        timers.arm(TimerSlot::MaxDuration, 60_000.0, 0.0);
        timers.cancel_all();
        assert_eq!(timers.next_deadline(), None);
    }

    #[test]
    fn max_duration_survives_no_response_rearms() {
        let mut timers = TimerManager::new();
        timers.arm(TimerSlot::MaxDuration, 60_000.0, 0.0);
        for round in 0..10 {
            timers.arm(TimerSlot::NoResponse, 700.0, f64::from(round) * 700.0);
        }
        assert_eq!(timers.deadline(TimerSlot::MaxDuration), Some(60_000.0));
    }
}

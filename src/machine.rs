//! The round state machine: the single writer of the answer log and the only
//! component that decides what round comes next, how long the subject has to
//! respond, and when the test ends.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::answer::{Answer, AnswerStatus, RoundPresentation, RoundType, UNPACED};
use crate::config::{CogSpeedConfig, ConfigError};
use crate::stats;
use crate::stimulus::StimulusGenerator;
use crate::summary::{ExitCode, Report};
use crate::timer::{TimerManager, TimerSlot};

/// Caller errors on the entry points. Events arriving after the test stopped
/// are not errors; they are ignored (see [`Advance::Ignored`]).
#[derive(Debug, PartialEq, Eq)]
pub enum MachineError {
    InvalidLocation(u8),
    NotStarted,
    AlreadyStarted,
}

impl fmt::Display for MachineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MachineError::InvalidLocation(loc) => {
                write!(f, "location {loc} is outside the valid range 1..=6")
            }
            MachineError::NotStarted => write!(f, "the test has not been started"),
            MachineError::AlreadyStarted => write!(f, "the test is already running"),
        }
    }
}

impl std::error::Error for MachineError {}

/// What happened as a result of one serialized event.
#[derive(Debug, Clone, PartialEq)]
pub enum Advance {
    /// A new round is on display.
    Next(RoundPresentation),
    /// The test terminated; the report is available via [`RoundMachine::report`].
    Finished(ExitCode),
    /// The machine is already stopped; the event was a guaranteed no-op.
    Ignored,
}

enum Step {
    Continue,
    Stop(ExitCode),
}

#[derive(Debug)]
pub struct RoundMachine {
    config: CogSpeedConfig,
    stimuli: StimulusGenerator,
    round: RoundType,
    /// The live adaptive deadline; [`UNPACED`] until machine pacing is seeded.
    current_timeout_ms: f64,
    answers: Vec<Answer>,
    /// Timeout values recorded at each detected block, seeded with -1.
    blocking_durations: Vec<f64>,
    restart_count: u32,
    current: Option<RoundPresentation>,
    timers: TimerManager,
    started_at_ms: Option<f64>,
    last_event_ms: f64,
    report: Option<Report>,
}

impl RoundMachine {
    /// Validates the config up front; a bad config refuses to construct.
    pub fn new(config: CogSpeedConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let stimuli = StimulusGenerator::new(config.rng_seed);
        Ok(Self {
            config,
            stimuli,
            round: RoundType::Training,
            current_timeout_ms: UNPACED,
            answers: Vec::new(),
            blocking_durations: vec![UNPACED],
            restart_count: 0,
            current: None,
            timers: TimerManager::new(),
            started_at_ms: None,
            last_event_ms: 0.0,
            report: None,
        })
    }

    /// Begin the test. `resume_timestamp` shifts the elapsed-time origin when
    /// resuming after an external screen.
    pub fn start(
        &mut self,
        resume_timestamp: Option<f64>,
    ) -> Result<RoundPresentation, MachineError> {
        if self.started_at_ms.is_some() {
            return Err(MachineError::AlreadyStarted);
        }
        let now = resume_timestamp.unwrap_or_else(now_ms);
        self.started_at_ms = Some(now);
        self.last_event_ms = now;
        self.timers.arm(
            TimerSlot::MaxDuration,
            self.config.timeouts.max_test_duration_ms,
            now,
        );
        Ok(self.present_round(now))
    }

    /// The single mutation entry point. `None` location denotes a no-response
    /// (the per-round timer fired). Timestamps default to the wall clock.
    pub fn record_response(
        &mut self,
        location: Option<u8>,
        timestamp: Option<f64>,
    ) -> Result<Advance, MachineError> {
        if self.report.is_some() {
            return Ok(Advance::Ignored);
        }
        let Some(started) = self.started_at_ms else {
            return Err(MachineError::NotStarted);
        };
        if let Some(loc) = location {
            if !(1..=6).contains(&loc) {
                return Err(MachineError::InvalidLocation(loc));
            }
        }
        let Some(current) = self.current.clone() else {
            return Err(MachineError::NotStarted);
        };

        let now = timestamp.unwrap_or_else(now_ms);
        if now - started >= self.config.timeouts.max_test_duration_ms {
            self.finish(ExitCode::TimedOut, now);
            return Ok(Advance::Finished(ExitCode::TimedOut));
        }

        let mut time_taken = now - self.last_event_ms;
        let mut status = match location {
            None => AnswerStatus::NoResponse,
            Some(loc) if loc == current.answer_location => AnswerStatus::Correct,
            Some(_) => AnswerStatus::Incorrect,
        };

        // Late-press tie-break: a press landing shortly after the previous
        // round timed out is judged against that round's stimulus, and its
        // elapsed time absorbs the missed round. Applies only to the round
        // immediately following a no-response.
        let mut carryover = None;
        if let (Some(loc), Some(prev)) = (location, self.answers.last()) {
            if prev.status == AnswerStatus::NoResponse
                && prev.carryover_classification.is_none()
                && time_taken <= self.config.machine_paced.minimum_response_time_ms
            {
                status = if loc == prev.answer_location {
                    AnswerStatus::Correct
                } else {
                    AnswerStatus::Incorrect
                };
                carryover = Some(status);
                time_taken += prev.time_taken_ms;
            }
        }

        let timeout_allowed = if self.round.is_paced() {
            self.current_timeout_ms
        } else {
            UNPACED
        };
        let ratio = if timeout_allowed > 0.0 {
            time_taken / timeout_allowed
        } else {
            0.0
        };

        self.answers.push(Answer {
            status,
            round_type: self.round,
            answer_location: current.answer_location,
            location_clicked: location,
            query: current.query,
            timeout_allowed_ms: timeout_allowed,
            time_taken_ms: time_taken,
            carryover_classification: carryover,
            ratio,
            correct_rolling_mean_ratio: None,
            timestamp_ms: now,
        });
        if self.round == RoundType::MachinePaced {
            let rolling = stats::rolling_correct_ratio(
                &self.answers,
                self.config.machine_paced.rolling_average.mean_size,
            );
            if let Some(last) = self.answers.last_mut() {
                last.correct_rolling_mean_ratio = Some(rolling);
            }
        }
        self.last_event_ms = now;

        match self.transition() {
            Step::Stop(code) => {
                self.finish(code, now);
                Ok(Advance::Finished(code))
            }
            Step::Continue => Ok(Advance::Next(self.present_round(now))),
        }
    }

    /// Timer-fire entry: the no-response slot is equivalent to a `None`
    /// response; the max-duration slot terminates the test. A fire for a
    /// slot that is disarmed or not yet due is ignored, so a timeout
    /// superseded by an earlier press can never double-record a round.
    pub fn fire_timer(
        &mut self,
        slot: TimerSlot,
        timestamp: Option<f64>,
    ) -> Result<Advance, MachineError> {
        if self.report.is_some() {
            return Ok(Advance::Ignored);
        }
        let now = timestamp.unwrap_or_else(now_ms);
        match self.timers.deadline(slot) {
            Some(deadline) if deadline <= now => {}
            _ => return Ok(Advance::Ignored),
        }
        match slot {
            TimerSlot::NoResponse => self.record_response(None, Some(now)),
            TimerSlot::MaxDuration => {
                self.finish(ExitCode::TimedOut, now);
                Ok(Advance::Finished(ExitCode::TimedOut))
            }
        }
    }

    /// Terminate immediately. Idempotent: the report is compiled exactly once
    /// and later calls return the same one.
    pub fn stop(&mut self, code: ExitCode, timestamp: Option<f64>) -> &Report {
        let now = timestamp.unwrap_or_else(now_ms);
        self.finish(code, now);
        // finish() always leaves a report behind.
        self.report.as_ref().expect("report compiled by finish")
    }

    pub fn round_type(&self) -> RoundType {
        self.round
    }

    pub fn current_timeout_ms(&self) -> f64 {
        self.current_timeout_ms
    }

    /// The round currently on display, if the test is running.
    pub fn current_round(&self) -> Option<&RoundPresentation> {
        self.current.as_ref()
    }

    pub fn answers(&self) -> &[Answer] {
        &self.answers
    }

    pub fn blocking_durations(&self) -> &[f64] {
        &self.blocking_durations
    }

    pub fn restart_count(&self) -> u32 {
        self.restart_count
    }

    pub fn report(&self) -> Option<&Report> {
        self.report.as_ref()
    }

    pub fn next_deadline(&self) -> Option<(TimerSlot, f64)> {
        self.timers.next_deadline()
    }

    pub fn due(&self, now_ms: f64) -> Option<TimerSlot> {
        self.timers.due(now_ms)
    }

    fn finish(&mut self, code: ExitCode, now: f64) {
        self.timers.cancel_all();
        if self.report.is_some() {
            return;
        }
        let duration = self
            .started_at_ms
            .map_or(0.0, |started| now - started);
        self.report = Some(Report::compile(
            code,
            &self.answers,
            &self.blocking_durations,
            self.restart_count,
            duration,
            &self.config.cpi,
        ));
        self.current = None;
    }

    fn present_round(&mut self, now: f64) -> RoundPresentation {
        let previous = self.current.take();
        let prev_location = previous.as_ref().map(|p| p.answer_location);
        let prev_query = previous.as_ref().map(|p| p.query);

        let answer_location = self.stimuli.next_location(prev_location);
        let query = self.stimuli.next_query(prev_query);
        let decoys = self.stimuli.decoys(query);
        let timeout_ms = self.round_timeout_ms();

        let presentation = RoundPresentation {
            round_type: self.round,
            answer_location,
            query,
            decoys,
            timeout_ms,
        };
        self.current = Some(presentation.clone());
        self.timers.arm(TimerSlot::NoResponse, timeout_ms, now);
        presentation
    }

    /// Deadline for the round about to be shown: the adaptive timeout for
    /// paced rounds, the configured no-response ceiling otherwise.
    fn round_timeout_ms(&self) -> f64 {
        match self.round {
            RoundType::Training => self.config.training.no_response_timeout_ms,
            RoundType::Practice => self.config.practice.no_response_timeout_ms,
            RoundType::SelfPacedStartup => self.config.self_paced.no_response_timeout_ms,
            RoundType::PostBlock => self.config.post_block.no_response_timeout_ms,
            RoundType::SelfPacedRestart => self.config.restart.no_response_timeout_ms,
            RoundType::MachinePaced | RoundType::Final => self.current_timeout_ms,
        }
    }

    /// The transition table, evaluated once after every appended answer.
    fn transition(&mut self) -> Step {
        match self.round {
            RoundType::Training => {
                let completed = self.count_of(RoundType::Training);
                if completed >= self.config.training.number_of_rounds as usize {
                    self.round = RoundType::Practice;
                }
                Step::Continue
            }
            RoundType::Practice => self.practice_step(),
            RoundType::SelfPacedStartup => self.self_paced_step(),
            RoundType::MachinePaced => self.machine_paced_step(),
            RoundType::PostBlock => self.cooldown_step(RoundType::PostBlock),
            RoundType::SelfPacedRestart => self.cooldown_step(RoundType::SelfPacedRestart),
            RoundType::Final => {
                if self.count_of(RoundType::Final)
                    >= self.config.endmode.number_of_rounds as usize
                {
                    Step::Stop(ExitCode::Success)
                } else {
                    Step::Continue
                }
            }
        }
    }

    fn practice_step(&mut self) -> Step {
        let practice: Vec<&Answer> = self
            .answers
            .iter()
            .filter(|a| a.round_type == RoundType::Practice)
            .collect();
        let streak = self.config.practice.required_correct_streak as usize;

        if practice.len() >= streak {
            let tail = &practice[practice.len() - streak..];
            let all_correct = tail.iter().all(|a| a.status == AnswerStatus::Correct);
            let times: Vec<f64> = tail.iter().map(|a| a.time_taken_ms).collect();
            if all_correct {
                if let Some(mean_rt) = stats::mean(&times) {
                    if mean_rt < self.config.practice.max_mean_response_time_ms {
                        self.round = RoundType::SelfPacedStartup;
                        return Step::Continue;
                    }
                }
            }
        }

        if practice.len() >= self.config.practice.max_rounds as usize {
            return Step::Stop(ExitCode::PracticeCapExceeded);
        }
        Step::Continue
    }

    fn self_paced_step(&mut self) -> Step {
        let cfg = &self.config.self_paced;
        let startup: Vec<&Answer> = self
            .answers
            .iter()
            .filter(|a| a.round_type == RoundType::SelfPacedStartup)
            .collect();

        let wrong = startup
            .iter()
            .filter(|a| a.status == AnswerStatus::Incorrect)
            .count();
        if wrong >= cfg.max_wrong_count as usize {
            return Step::Stop(ExitCode::SelfPacedWrongLimit);
        }

        let slow_corrects = startup
            .iter()
            .filter(|a| {
                a.status == AnswerStatus::Correct && a.time_taken_ms > cfg.slow_response_ms
            })
            .count();
        if slow_corrects >= cfg.slow_correct_limit as usize {
            return Step::Stop(ExitCode::SelfPacedSlowLimit);
        }

        let streak = cfg.required_correct_streak as usize;
        if startup.len() >= streak {
            let tail = &startup[startup.len() - streak..];
            if tail.iter().all(|a| a.status == AnswerStatus::Correct) {
                let times: Vec<f64> = tail.iter().map(|a| a.time_taken_ms).collect();
                if let Some(mean_rt) = stats::mean(&times) {
                    self.current_timeout_ms =
                        mean_rt.min(cfg.max_start_duration_ms) - cfg.initial_speedup_ms;
                    self.round = RoundType::MachinePaced;
                }
            }
        }
        Step::Continue
    }

    fn machine_paced_step(&mut self) -> Step {
        let mp = self.config.machine_paced.clone();

        // Block detection comes first: a run of silent rounds marks the
        // subject's limit regardless of what the rolling ratio says.
        let window = mp.blocking.no_input_count as usize;
        let blocked = self.answers.len() >= window
            && self.answers[self.answers.len() - window..].iter().all(|a| {
                a.round_type == RoundType::MachinePaced
                    && a.status == AnswerStatus::NoResponse
            });
        if blocked {
            self.current_timeout_ms += mp.blocking.slow_down_ms;
            self.blocking_durations.push(self.current_timeout_ms);

            let len = self.blocking_durations.len();
            let newest = self.blocking_durations[len - 1];
            let prior = self.blocking_durations[len - 2];
            if (newest - prior).abs() < mp.blocking.duration_delta_ms {
                self.round = RoundType::Final;
                return Step::Continue;
            }
            if len - 1 >= mp.blocking.max_block_count as usize {
                return Step::Stop(ExitCode::BlockLimit);
            }
            self.round = RoundType::PostBlock;
            return Step::Continue;
        }

        let rolling = self
            .answers
            .last()
            .and_then(|a| a.correct_rolling_mean_ratio)
            .unwrap_or(1.0);
        if rolling < mp.rolling_average.threshold {
            self.restart_count += 1;
            self.round = RoundType::SelfPacedRestart;
            return Step::Continue;
        }

        if let Some(last) = self.answers.last() {
            match (last.carryover_classification, last.status) {
                // A late press credited to the previous round leaves the
                // pacing untouched.
                (Some(AnswerStatus::Correct), _) => {}
                (None, AnswerStatus::Correct) => {
                    let delta = -(1.0 - last.ratio) * mp.speedup.weight_ms;
                    self.current_timeout_ms += delta
                        .clamp(-mp.speedup.max_speedup_ms, mp.slowdown.max_slowdown_ms);
                }
                _ => {
                    // Wrong, missed, or debited answers all pay the fixed
                    // slow-down penalty.
                    self.current_timeout_ms += mp.slowdown.base_duration_ms;
                }
            }
        }
        Step::Continue
    }

    fn cooldown_step(&mut self, round: RoundType) -> Step {
        let (cfg, fail_code) = match round {
            RoundType::PostBlock => (&self.config.post_block, ExitCode::PostBlockWrongLimit),
            _ => (&self.config.restart, ExitCode::RestartWrongLimit),
        };
        let stint = self.trailing_stint(round);

        let streak = cfg.min_correct_answers as usize;
        if stint.len() >= streak
            && stint[stint.len() - streak..]
                .iter()
                .all(|a| a.status == AnswerStatus::Correct)
        {
            if round == RoundType::SelfPacedRestart {
                // Re-enter pacing one slow-down step easier than where the
                // subject fell off.
                self.current_timeout_ms += self.config.machine_paced.slowdown.base_duration_ms;
            }
            self.round = RoundType::MachinePaced;
            return Step::Continue;
        }

        let wrong = stint
            .iter()
            .filter(|a| a.status == AnswerStatus::Incorrect)
            .count();
        if wrong >= cfg.max_wrong_answers as usize {
            return Step::Stop(fail_code);
        }
        Step::Continue
    }

    fn count_of(&self, round: RoundType) -> usize {
        self.answers
            .iter()
            .filter(|a| a.round_type == round)
            .count()
    }

    /// Answers since the machine most recently entered `round`: the trailing
    /// run of the log with that round type.
    fn trailing_stint(&self, round: RoundType) -> &[Answer] {
        let start = self
            .answers
            .iter()
            .rposition(|a| a.round_type != round)
            .map_or(0, |idx| idx + 1);
        &self.answers[start..]
    }
}

fn now_ms() -> f64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs_f64() * 1000.0)
        .unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;

    fn machine() -> RoundMachine {
        let mut cfg = CogSpeedConfig::builtin();
        cfg.rng_seed = Some(1234);
        RoundMachine::new(cfg).unwrap()
    }

    /// Respond correctly to the current round `count` times, `dt_ms` apart.
    fn answer_correctly(m: &mut RoundMachine, count: usize, dt_ms: f64, clock: &mut f64) {
        for _ in 0..count {
            let loc = m.current_round().unwrap().answer_location;
            *clock += dt_ms;
            m.record_response(Some(loc), Some(*clock)).unwrap();
        }
    }

    fn answer_incorrectly(m: &mut RoundMachine, dt_ms: f64, clock: &mut f64) {
        let loc = m.current_round().unwrap().answer_location;
        let wrong = if loc == 6 { 1 } else { loc + 1 };
        *clock += dt_ms;
        m.record_response(Some(wrong), Some(*clock)).unwrap();
    }

    #[test]
    fn bad_config_refuses_to_construct() {
        let mut cfg = CogSpeedConfig::builtin();
        cfg.endmode.number_of_rounds = 0;
        assert!(RoundMachine::new(cfg).is_err());
    }

    #[test]
    fn record_before_start_is_an_error() {
        let mut m = machine();
        assert_matches!(
            m.record_response(Some(3), Some(0.0)),
            Err(MachineError::NotStarted)
        );
    }

    #[test]
    fn double_start_is_an_error() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        assert_matches!(m.start(Some(0.0)), Err(MachineError::AlreadyStarted));
    }

    #[test]
    fn out_of_range_location_is_rejected_without_a_transition() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        assert_matches!(
            m.record_response(Some(7), Some(100.0)),
            Err(MachineError::InvalidLocation(7))
        );
        assert_matches!(
            m.record_response(Some(0), Some(100.0)),
            Err(MachineError::InvalidLocation(0))
        );
        assert!(m.answers().is_empty());
    }

    #[test]
    fn training_completes_into_practice() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        let n = 3;
        let mut clock = 0.0;
        for _ in 0..n {
            assert_eq!(m.round_type(), RoundType::Training);
            clock += 500.0;
            // Arbitrary locations; training judges nothing.
            m.record_response(Some(1), Some(clock)).unwrap();
        }
        assert_eq!(m.round_type(), RoundType::Practice);
    }

    #[test]
    fn start_arms_the_max_duration_timer_once() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        let deadlines: Vec<_> = [m.next_deadline()].into_iter().flatten().collect();
        assert!(!deadlines.is_empty());
        // The no-response deadline (6s training ceiling) comes first.
        assert_eq!(deadlines[0].0, TimerSlot::NoResponse);
    }

    #[test]
    fn no_response_timer_records_a_no_response_answer() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        let advance = m.fire_timer(TimerSlot::NoResponse, Some(6000.0)).unwrap();
        assert_matches!(advance, Advance::Next(_));
        assert_eq!(m.answers().len(), 1);
        assert_eq!(m.answers()[0].status, AnswerStatus::NoResponse);
        assert_eq!(m.answers()[0].location_clicked, None);
    }

    #[test]
    fn premature_timer_fire_is_ignored() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        // The training deadline sits at 6000 ms; an earlier fire is stale.
        assert_eq!(
            m.fire_timer(TimerSlot::NoResponse, Some(100.0)).unwrap(),
            Advance::Ignored
        );
        assert_eq!(
            m.fire_timer(TimerSlot::MaxDuration, Some(100.0)).unwrap(),
            Advance::Ignored
        );
        assert!(m.answers().is_empty());
        assert!(m.report().is_none());
    }

    #[test]
    fn max_duration_timer_stops_the_test() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        let advance = m
            .fire_timer(TimerSlot::MaxDuration, Some(300_000.0))
            .unwrap();
        assert_matches!(advance, Advance::Finished(ExitCode::TimedOut));
        assert_eq!(m.report().unwrap().status_code, ExitCode::TimedOut.code());
    }

    #[test]
    fn late_timestamp_on_a_press_also_times_out() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        let advance = m.record_response(Some(1), Some(300_001.0)).unwrap();
        assert_matches!(advance, Advance::Finished(ExitCode::TimedOut));
    }

    #[test]
    fn events_after_stop_are_noops() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        m.stop(ExitCode::Abandoned, Some(1000.0));
        let before = m.answers().len();
        let report_id = m.report().unwrap().test_id;

        assert_eq!(
            m.record_response(Some(1), Some(2000.0)).unwrap(),
            Advance::Ignored
        );
        assert_eq!(
            m.fire_timer(TimerSlot::NoResponse, Some(2000.0)).unwrap(),
            Advance::Ignored
        );
        assert_eq!(m.answers().len(), before);
        // The summarizer ran exactly once.
        assert_eq!(m.report().unwrap().test_id, report_id);
        assert_eq!(m.next_deadline(), None);
    }

    #[test]
    fn practice_exit_requires_fast_correct_streak() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();
        let mut clock = 0.0;
        answer_correctly(&mut m, 3, 500.0, &mut clock); // training
        assert_eq!(m.round_type(), RoundType::Practice);

        // A correct streak that is too slow does not qualify.
        answer_correctly(&mut m, 4, 2500.0, &mut clock);
        assert_eq!(m.round_type(), RoundType::Practice);

        // A fast streak does.
        answer_correctly(&mut m, 4, 600.0, &mut clock);
        assert_eq!(m.round_type(), RoundType::SelfPacedStartup);
    }

    #[test]
    fn practice_cap_fails_the_test() {
        let mut cfg = CogSpeedConfig::builtin();
        cfg.rng_seed = Some(7);
        cfg.practice.max_rounds = 5;
        let mut m = RoundMachine::new(cfg).unwrap();
        m.start(Some(0.0)).unwrap();
        let mut clock = 0.0;
        answer_correctly(&mut m, 3, 500.0, &mut clock); // training

        for _ in 0..4 {
            answer_incorrectly(&mut m, 500.0, &mut clock);
        }
        assert_eq!(m.round_type(), RoundType::Practice);
        answer_incorrectly(&mut m, 500.0, &mut clock);
        assert_eq!(
            m.report().unwrap().status_code,
            ExitCode::PracticeCapExceeded.code()
        );
    }

    #[test]
    fn carryover_credits_a_late_press_to_the_previous_round() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();

        // Time out the first training round, note its correct location.
        let missed_location = m.current_round().unwrap().answer_location;
        m.record_response(None, Some(6000.0)).unwrap();

        // Press the missed round's location within the carryover window.
        m.record_response(Some(missed_location), Some(6000.0 + 200.0))
            .unwrap();

        let late = &m.answers()[1];
        assert_eq!(late.status, AnswerStatus::Correct);
        assert_eq!(late.carryover_classification, Some(AnswerStatus::Correct));
        // Elapsed time absorbed the missed round.
        assert_eq!(late.time_taken_ms, 6200.0);
    }

    #[test]
    fn carryover_debits_a_late_press_landing_elsewhere() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();

        let missed_location = m.current_round().unwrap().answer_location;
        m.record_response(None, Some(6000.0)).unwrap();

        // The next round's own correct location is never the previous one,
        // so pressing the *current* correct location after a miss lands
        // "elsewhere" for carryover purposes.
        let current_location = m.current_round().unwrap().answer_location;
        assert_ne!(current_location, missed_location);
        m.record_response(Some(current_location), Some(6200.0))
            .unwrap();

        let late = &m.answers()[1];
        assert_eq!(late.status, AnswerStatus::Incorrect);
        assert_eq!(late.carryover_classification, Some(AnswerStatus::Incorrect));
    }

    #[test]
    fn slow_press_after_a_no_response_is_not_carried_over() {
        let mut m = machine();
        m.start(Some(0.0)).unwrap();

        let missed_location = m.current_round().unwrap().answer_location;
        m.record_response(None, Some(6000.0)).unwrap();

        // Outside the carryover window: judged purely against this round.
        m.record_response(Some(missed_location), Some(6000.0 + 900.0))
            .unwrap();
        let late = &m.answers()[1];
        assert_eq!(late.carryover_classification, None);
        assert_eq!(late.status, AnswerStatus::Incorrect);
    }
}

//! Work/break countdown.
//!
//! The timer is a plain state machine: it never reads the wall clock and never
//! touches progress. The host reports elapsed seconds through
//! [`IntervalTimer::on_elapsed`]; when a work interval runs out the timer hands
//! back a [`PendingCommit`] for the caller to confirm or dismiss.

use std::fmt;

use thiserror::Error;

use crate::model::TopicId;

pub const DEFAULT_WORK_MINUTES: u32 = 25;
pub const DEFAULT_BREAK_MINUTES: u32 = 5;

const SECONDS_PER_MINUTE: u32 = 60;

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum TimerError {
    #[error("select a topic before starting a work interval")]
    NoTopicSelected,
}

//
// ─── MODE / PHASE ──────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerMode {
    Work,
    Break,
}

impl TimerMode {
    #[must_use]
    pub fn other(self) -> Self {
        match self {
            TimerMode::Work => TimerMode::Break,
            TimerMode::Break => TimerMode::Work,
        }
    }
}

impl fmt::Display for TimerMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimerMode::Work => f.write_str("work"),
            TimerMode::Break => f.write_str("break"),
        }
    }
}

/// Expanded view of `(mode, running)`.
///
/// Idle and paused are both "not running"; paused means part of the current
/// interval has already elapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerPhase {
    WorkIdle,
    WorkRunning,
    WorkPaused,
    BreakIdle,
    BreakRunning,
    BreakPaused,
}

//
// ─── CONFIG ────────────────────────────────────────────────────────────────────
//

/// Interval lengths in minutes, each at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerConfig {
    work_minutes: u32,
    break_minutes: u32,
}

impl TimerConfig {
    /// Values below 1 minute are raised to 1.
    #[must_use]
    pub fn new(work_minutes: u32, break_minutes: u32) -> Self {
        Self {
            work_minutes: work_minutes.max(1),
            break_minutes: break_minutes.max(1),
        }
    }

    #[must_use]
    pub fn work_minutes(&self) -> u32 {
        self.work_minutes
    }

    #[must_use]
    pub fn break_minutes(&self) -> u32 {
        self.break_minutes
    }

    #[must_use]
    pub fn minutes_for(&self, mode: TimerMode) -> u32 {
        match mode {
            TimerMode::Work => self.work_minutes,
            TimerMode::Break => self.break_minutes,
        }
    }

    #[must_use]
    pub fn duration_secs(&self, mode: TimerMode) -> u32 {
        self.minutes_for(mode).saturating_mul(SECONDS_PER_MINUTE)
    }

    fn adjust(&mut self, mode: TimerMode, delta_minutes: i32) {
        let slot = match mode {
            TimerMode::Work => &mut self.work_minutes,
            TimerMode::Break => &mut self.break_minutes,
        };
        let next = i64::from(*slot) + i64::from(delta_minutes);
        *slot = u32::try_from(next.max(1)).unwrap_or(u32::MAX);
    }
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self::new(DEFAULT_WORK_MINUTES, DEFAULT_BREAK_MINUTES)
    }
}

//
// ─── PENDING COMMIT ────────────────────────────────────────────────────────────
//

/// A finished work interval waiting for the user to log it (or not).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommit {
    topic_id: TopicId,
    minutes_completed: u32,
}

impl PendingCommit {
    #[must_use]
    pub fn new(topic_id: TopicId, minutes_completed: u32) -> Self {
        Self {
            topic_id,
            minutes_completed,
        }
    }

    #[must_use]
    pub fn topic_id(&self) -> &TopicId {
        &self.topic_id
    }

    #[must_use]
    pub fn minutes_completed(&self) -> u32 {
        self.minutes_completed
    }
}

/// Emitted when a running interval reaches zero.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalCompleted {
    /// Mode of the interval that just finished.
    pub finished: TimerMode,
    /// Present only for finished work intervals.
    pub pending: Option<PendingCommit>,
}

//
// ─── TIMER ─────────────────────────────────────────────────────────────────────
//

/// Work/break countdown.
///
/// Invariants:
/// - `remaining_secs <= config.duration_secs(mode)`
/// - config only changes while not running
/// - a work interval only runs with a selected topic
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalTimer {
    config: TimerConfig,
    mode: TimerMode,
    remaining_secs: u32,
    running: bool,
    selected_topic: Option<TopicId>,
}

impl Default for IntervalTimer {
    fn default() -> Self {
        Self::new(TimerConfig::default())
    }
}

impl IntervalTimer {
    /// Idle work interval with a full countdown.
    #[must_use]
    pub fn new(config: TimerConfig) -> Self {
        Self {
            config,
            mode: TimerMode::Work,
            remaining_secs: config.duration_secs(TimerMode::Work),
            running: false,
            selected_topic: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> TimerConfig {
        self.config
    }

    #[must_use]
    pub fn mode(&self) -> TimerMode {
        self.mode
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }

    #[must_use]
    pub fn remaining_secs(&self) -> u32 {
        self.remaining_secs
    }

    #[must_use]
    pub fn selected_topic(&self) -> Option<&TopicId> {
        self.selected_topic.as_ref()
    }

    /// Full length of the current interval.
    #[must_use]
    pub fn duration_secs(&self) -> u32 {
        self.config.duration_secs(self.mode)
    }

    #[must_use]
    pub fn phase(&self) -> TimerPhase {
        let started = self.remaining_secs < self.duration_secs();
        match (self.mode, self.running, started) {
            (TimerMode::Work, true, _) => TimerPhase::WorkRunning,
            (TimerMode::Work, false, true) => TimerPhase::WorkPaused,
            (TimerMode::Work, false, false) => TimerPhase::WorkIdle,
            (TimerMode::Break, true, _) => TimerPhase::BreakRunning,
            (TimerMode::Break, false, true) => TimerPhase::BreakPaused,
            (TimerMode::Break, false, false) => TimerPhase::BreakIdle,
        }
    }

    /// Elapsed share of the current interval, in `[0, 1]`.
    #[must_use]
    pub fn progress_fraction(&self) -> f64 {
        let total = f64::from(self.duration_secs());
        (total - f64::from(self.remaining_secs)) / total
    }

    /// Remaining time as `mm:ss`.
    #[must_use]
    pub fn format_remaining(&self) -> String {
        let secs = self.remaining_secs;
        format!("{:02}:{:02}", secs / SECONDS_PER_MINUTE, secs % SECONDS_PER_MINUTE)
    }

    /// Choose the topic that the next finished work interval is logged against.
    ///
    /// Allowed in any state; the topic in place when the interval finishes wins.
    pub fn select_topic(&mut self, topic: TopicId) {
        self.selected_topic = Some(topic);
    }

    /// Start or resume the countdown.
    ///
    /// # Errors
    ///
    /// Returns `TimerError::NoTopicSelected` in work mode without a topic; the
    /// timer is left untouched.
    pub fn start(&mut self) -> Result<(), TimerError> {
        if self.mode == TimerMode::Work && self.selected_topic.is_none() {
            return Err(TimerError::NoTopicSelected);
        }
        self.running = true;
        Ok(())
    }

    /// Stop the countdown, keeping the remaining time.
    pub fn pause(&mut self) {
        self.running = false;
    }

    /// Start when stopped, pause when running. Returns the new running flag.
    ///
    /// # Errors
    ///
    /// Same as [`IntervalTimer::start`].
    pub fn toggle(&mut self) -> Result<bool, TimerError> {
        if self.running {
            self.pause();
        } else {
            self.start()?;
        }
        Ok(self.running)
    }

    /// Stop and refill the current interval.
    pub fn reset(&mut self) {
        self.running = false;
        self.remaining_secs = self.duration_secs();
    }

    /// Change one interval length by `delta_minutes`, floored at 1 minute.
    ///
    /// Ignored while running (returns `false`). Adjusting the current mode
    /// refills its countdown to the new full length.
    pub fn adjust_config(&mut self, mode: TimerMode, delta_minutes: i32) -> bool {
        if self.running {
            return false;
        }
        self.config.adjust(mode, delta_minutes);
        if mode == self.mode {
            self.remaining_secs = self.duration_secs();
        }
        true
    }

    /// One scheduled second.
    pub fn tick(&mut self) -> Option<IntervalCompleted> {
        self.on_elapsed(1)
    }

    /// Count down by `seconds` while running.
    ///
    /// Seconds beyond the end of the interval are dropped: the next interval
    /// is loaded but not started.
    pub fn on_elapsed(&mut self, seconds: u32) -> Option<IntervalCompleted> {
        if !self.running || seconds == 0 {
            return None;
        }
        self.remaining_secs = self.remaining_secs.saturating_sub(seconds);
        if self.remaining_secs > 0 {
            return None;
        }
        Some(self.finish_interval())
    }

    fn finish_interval(&mut self) -> IntervalCompleted {
        let finished = self.mode;
        self.running = false;

        let pending = match finished {
            TimerMode::Work => self
                .selected_topic
                .clone()
                .map(|topic| PendingCommit::new(topic, self.config.work_minutes())),
            TimerMode::Break => None,
        };

        self.mode = finished.other();
        self.remaining_secs = self.duration_secs();

        IntervalCompleted { finished, pending }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn econ() -> TopicId {
        TopicId::new("econ-1")
    }

    fn ready_timer(work: u32, brk: u32) -> IntervalTimer {
        let mut timer = IntervalTimer::new(TimerConfig::new(work, brk));
        timer.select_topic(econ());
        timer
    }

    #[test]
    fn initial_state_is_work_idle_with_full_countdown() {
        let timer = IntervalTimer::default();
        assert_eq!(timer.phase(), TimerPhase::WorkIdle);
        assert_eq!(timer.remaining_secs(), 25 * 60);
        assert_eq!(timer.format_remaining(), "25:00");
    }

    #[test]
    fn start_without_topic_is_rejected() {
        let mut timer = IntervalTimer::default();
        let before = timer.clone();
        assert_eq!(timer.start(), Err(TimerError::NoTopicSelected));
        assert_eq!(timer, before);
        assert_eq!(timer.phase(), TimerPhase::WorkIdle);
    }

    #[test]
    fn pause_keeps_remaining_and_reports_paused() {
        let mut timer = ready_timer(25, 5);
        timer.start().unwrap();
        for _ in 0..90 {
            assert!(timer.tick().is_none());
        }
        timer.pause();
        assert_eq!(timer.remaining_secs(), 25 * 60 - 90);
        assert_eq!(timer.phase(), TimerPhase::WorkPaused);
        assert_eq!(timer.format_remaining(), "23:30");

        // Ticks while paused do nothing.
        assert!(timer.tick().is_none());
        assert_eq!(timer.remaining_secs(), 25 * 60 - 90);
    }

    #[test]
    fn pause_when_idle_is_noop() {
        let mut timer = ready_timer(25, 5);
        let before = timer.clone();
        timer.pause();
        assert_eq!(timer, before);
    }

    #[test]
    fn toggle_flips_running() {
        let mut timer = ready_timer(25, 5);
        assert_eq!(timer.toggle(), Ok(true));
        assert_eq!(timer.toggle(), Ok(false));
    }

    #[test]
    fn reset_refills_current_mode() {
        let mut timer = ready_timer(25, 5);
        timer.start().unwrap();
        timer.on_elapsed(100);
        timer.reset();
        assert!(!timer.is_running());
        assert_eq!(timer.remaining_secs(), 25 * 60);
    }

    #[test]
    fn work_completion_emits_one_pending_commit_and_idles_in_break() {
        let mut timer = ready_timer(1, 3);
        timer.start().unwrap();

        let mut completions = Vec::new();
        for _ in 0..60 {
            if let Some(done) = timer.tick() {
                completions.push(done);
            }
        }
        // Further ticks do not fire again: the break has not started.
        for _ in 0..10 {
            assert!(timer.tick().is_none());
        }

        assert_eq!(
            completions,
            vec![IntervalCompleted {
                finished: TimerMode::Work,
                pending: Some(PendingCommit::new(econ(), 1)),
            }]
        );
        assert_eq!(timer.phase(), TimerPhase::BreakIdle);
        assert_eq!(timer.remaining_secs(), 3 * 60);
    }

    #[test]
    fn break_completion_returns_to_work_without_pending() {
        let mut timer = ready_timer(1, 1);
        timer.start().unwrap();
        timer.on_elapsed(60);
        timer.start().unwrap();
        let done = timer.on_elapsed(60).unwrap();
        assert_eq!(done.finished, TimerMode::Break);
        assert!(done.pending.is_none());
        assert_eq!(timer.phase(), TimerPhase::WorkIdle);
        assert_eq!(timer.remaining_secs(), 60);
    }

    #[test]
    fn break_can_start_without_topic() {
        let mut timer = IntervalTimer::new(TimerConfig::new(1, 1));
        timer.select_topic(econ());
        timer.start().unwrap();
        timer.on_elapsed(60);
        assert_eq!(timer.mode(), TimerMode::Break);
        assert!(timer.start().is_ok());
    }

    #[test]
    fn oversized_elapsed_never_goes_negative() {
        let mut timer = ready_timer(2, 5);
        timer.start().unwrap();
        let done = timer.on_elapsed(10_000).unwrap();
        assert_eq!(done.pending.map(|p| p.minutes_completed()), Some(2));
        assert_eq!(timer.remaining_secs(), 5 * 60);
        assert!(!timer.is_running());
    }

    #[test]
    fn adjust_config_is_ignored_while_running() {
        let mut timer = ready_timer(25, 5);
        timer.start().unwrap();
        timer.tick();
        let before = timer.clone();
        assert!(!timer.adjust_config(TimerMode::Work, 5));
        assert!(!timer.adjust_config(TimerMode::Break, 5));
        assert_eq!(timer, before);
    }

    #[test]
    fn adjust_config_floors_at_one_minute_and_refills_current_mode() {
        let mut timer = ready_timer(25, 5);
        timer.start().unwrap();
        timer.on_elapsed(30);
        timer.pause();

        assert!(timer.adjust_config(TimerMode::Work, -40));
        assert_eq!(timer.config().work_minutes(), 1);
        assert_eq!(timer.remaining_secs(), 60);

        // Other mode: config changes, countdown untouched.
        assert!(timer.adjust_config(TimerMode::Break, 2));
        assert_eq!(timer.config().break_minutes(), 7);
        assert_eq!(timer.remaining_secs(), 60);
    }

    #[test]
    fn pending_commit_uses_configured_minutes_and_latest_topic() {
        let mut timer = ready_timer(1, 1);
        timer.start().unwrap();
        timer.on_elapsed(30);
        timer.select_topic(TopicId::new("hist-2"));
        let done = timer.on_elapsed(30).unwrap();
        assert_eq!(done.pending, Some(PendingCommit::new(TopicId::new("hist-2"), 1)));
    }

    #[test]
    fn progress_fraction_tracks_elapsed_share() {
        let mut timer = ready_timer(2, 1);
        assert!(timer.progress_fraction().abs() < f64::EPSILON);
        timer.start().unwrap();
        timer.on_elapsed(30);
        assert!((timer.progress_fraction() - 0.25).abs() < 1e-9);
    }

    #[test]
    fn config_new_floors_at_one() {
        let config = TimerConfig::new(0, 0);
        assert_eq!(config.work_minutes(), 1);
        assert_eq!(config.break_minutes(), 1);
    }
}

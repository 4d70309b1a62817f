//! XP accumulation and the level curve.
//!
//! Level `n` is left once `n * 200` XP have been collected on top of it. The
//! carried XP is always normalized below the current threshold, so the final
//! `(xp, level)` depends only on the cumulative XP total and never on how the
//! awards were grouped.

use serde::{Deserialize, Serialize};

/// XP needed per level step; `level_threshold(n) = n * LEVEL_STEP_XP`.
pub const LEVEL_STEP_XP: u64 = 200;

/// Award for marking a topic's theory as read.
pub const THEORY_READ_XP: i64 = 50;

/// Award for marking a topic's flashcards as done.
pub const FLASHCARDS_DONE_XP: i64 = 30;

/// Award for a scored essay submission.
pub const ESSAY_SUBMISSION_XP: i64 = 100;

/// XP required to leave `level`. Levels below 1 are treated as level 1.
#[must_use]
pub fn level_threshold(level: u32) -> u64 {
    u64::from(level.max(1)) * LEVEL_STEP_XP
}

/// XP earned for logged study minutes: one point per two full minutes.
#[must_use]
pub fn study_minutes_xp(minutes: u32) -> i64 {
    i64::from(minutes / 2)
}

//
// ─── LEVEL STATE ───────────────────────────────────────────────────────────────
//

/// Gamification counters of a user.
///
/// Invariant: `level >= 1` and `xp < level_threshold(level)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelState {
    xp: u64,
    level: u32,
}

impl Default for LevelState {
    fn default() -> Self {
        Self { xp: 0, level: 1 }
    }
}

/// Signal that at least one level boundary was crossed by a single award.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelUp {
    pub from: u32,
    pub to: u32,
}

/// Result of `add_xp`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct XpGain {
    /// XP actually added (zero for non-positive requests).
    pub awarded: u64,
    pub state: LevelState,
    /// Present exactly once per award that crossed one or more thresholds.
    pub level_up: Option<LevelUp>,
}

impl XpGain {
    #[must_use]
    pub fn leveled_up(&self) -> bool {
        self.level_up.is_some()
    }
}

impl LevelState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Rehydrate counters from a snapshot, repairing anything out of range.
    ///
    /// A stored level of 0 becomes 1 and surplus XP is rolled into levels, so
    /// a hand-edited or stale snapshot still satisfies the invariant.
    #[must_use]
    pub fn from_persisted(xp: u64, level: u32) -> Self {
        let mut state = Self {
            xp,
            level: level.max(1),
        };
        state.normalize();
        state
    }

    #[must_use]
    pub fn xp(&self) -> u64 {
        self.xp
    }

    #[must_use]
    pub fn level(&self) -> u32 {
        self.level
    }

    /// XP required to leave the current level.
    #[must_use]
    pub fn threshold(&self) -> u64 {
        level_threshold(self.level)
    }

    /// Fraction of the current level already earned, in `[0, 1)`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn level_progress(&self) -> f64 {
        self.xp as f64 / self.threshold() as f64
    }

    /// Add `amount` XP and roll surplus into levels.
    ///
    /// Non-positive amounts are ignored: XP and level never decrease.
    pub fn add_xp(&mut self, amount: i64) -> XpGain {
        let Ok(awarded) = u64::try_from(amount) else {
            return self.unchanged();
        };
        if awarded == 0 {
            return self.unchanged();
        }

        let from = self.level;
        self.xp = self.xp.saturating_add(awarded);
        let steps = self.normalize();

        XpGain {
            awarded,
            state: *self,
            level_up: (steps > 0).then_some(LevelUp {
                from,
                to: self.level,
            }),
        }
    }

    fn unchanged(&self) -> XpGain {
        XpGain {
            awarded: 0,
            state: *self,
            level_up: None,
        }
    }

    fn normalize(&mut self) -> u32 {
        let mut steps = 0;
        while self.xp >= level_threshold(self.level) {
            self.xp -= level_threshold(self.level);
            self.level = self.level.saturating_add(1);
            steps += 1;
        }
        steps
    }
}

/// Functional form of [`LevelState::add_xp`].
#[must_use]
pub fn add_xp(state: LevelState, amount: i64) -> XpGain {
    let mut next = state;
    next.add_xp(amount)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(xp: u64, level: u32) -> LevelState {
        LevelState { xp, level }
    }

    #[test]
    fn threshold_is_two_hundred_per_level() {
        assert_eq!(level_threshold(1), 200);
        assert_eq!(level_threshold(2), 400);
        assert_eq!(level_threshold(7), 1400);
    }

    #[test]
    fn non_positive_amounts_are_ignored() {
        let start = state(150, 3);
        for amount in [0, -1, -500] {
            let gain = add_xp(start, amount);
            assert_eq!(gain.state, start);
            assert_eq!(gain.awarded, 0);
            assert!(!gain.leveled_up());
        }
    }

    #[test]
    fn level_progress_is_share_of_current_threshold() {
        assert!(LevelState::new().level_progress().abs() < f64::EPSILON);
        assert!((state(100, 2).level_progress() - 0.25).abs() < f64::EPSILON);
    }

    #[test]
    fn award_below_threshold_keeps_level() {
        let gain = add_xp(state(180, 1), 12);
        assert_eq!(gain.state, state(192, 1));
        assert!(gain.level_up.is_none());
    }

    #[test]
    fn award_crossing_threshold_carries_surplus() {
        let gain = add_xp(state(195, 1), 12);
        assert_eq!(gain.state, state(7, 2));
        assert_eq!(gain.level_up, Some(LevelUp { from: 1, to: 2 }));
    }

    #[test]
    fn exact_threshold_levels_up_to_zero_xp() {
        let gain = add_xp(LevelState::new(), 200);
        assert_eq!(gain.state, state(0, 2));
        assert!(gain.leveled_up());
    }

    #[test]
    fn large_award_crosses_several_levels_with_one_signal() {
        // 200 + 400 + 600 = 1200 leaves level 3 with 50 left over.
        let gain = add_xp(LevelState::new(), 1250);
        assert_eq!(gain.state, state(50, 4));
        assert_eq!(gain.level_up, Some(LevelUp { from: 1, to: 4 }));
    }

    #[test]
    fn xp_stays_below_threshold_after_every_award() {
        let mut s = LevelState::new();
        for amount in 1..300 {
            s.add_xp(amount * 7 % 113);
            assert!(s.xp() < s.threshold());
            assert!(s.level() >= 1);
        }
    }

    #[test]
    fn grouping_of_awards_does_not_change_result() {
        let sequences: [&[i64]; 5] = [
            &[50, 30, 12, 100],
            &[199, 1, 399, 1],
            &[1; 640],
            &[1000, 0, -40, 3],
            &[12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12, 12],
        ];

        for seq in sequences {
            let total: i64 = seq.iter().filter(|a| **a > 0).sum();
            let mut stepwise = LevelState::new();
            for amount in seq {
                stepwise.add_xp(*amount);
            }
            assert_eq!(stepwise, add_xp(LevelState::new(), total).state, "{seq:?}");

            let mut reversed = LevelState::new();
            for amount in seq.iter().rev() {
                reversed.add_xp(*amount);
            }
            assert_eq!(stepwise, reversed);
        }
    }

    #[test]
    fn from_persisted_repairs_invalid_counters() {
        assert_eq!(LevelState::from_persisted(30, 0), state(30, 1));
        assert_eq!(LevelState::from_persisted(250, 1), state(50, 2));
    }

    #[test]
    fn study_minutes_award_rounds_down() {
        assert_eq!(study_minutes_xp(25), 12);
        assert_eq!(study_minutes_xp(1), 0);
        assert_eq!(study_minutes_xp(50), 25);
    }
}

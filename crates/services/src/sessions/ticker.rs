use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use tokio::time::Instant;

use crate::error::ConfigError;

/// How a late tick callback is turned into timer seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TickPolicy {
    /// Count the real time since the previous callback, in whole seconds.
    #[default]
    CatchUp,
    /// Count exactly one second per callback, losing any delay.
    SingleStep,
}

impl FromStr for TickPolicy {
    type Err = ConfigError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "catch-up" | "catchup" => Ok(Self::CatchUp),
            "single-step" | "single" => Ok(Self::SingleStep),
            other => Err(ConfigError::InvalidTickPolicy(other.to_owned())),
        }
    }
}

impl fmt::Display for TickPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CatchUp => "catch-up",
            Self::SingleStep => "single-step",
        })
    }
}

/// Converts periodic callbacks into elapsed timer seconds.
///
/// Under `CatchUp` the sub-second remainder is carried to the next callback so
/// jitter never accumulates into lost or extra seconds.
#[derive(Debug, Clone)]
pub struct TickClock {
    policy: TickPolicy,
    last: Instant,
    carry: Duration,
}

impl TickClock {
    #[must_use]
    pub fn new(policy: TickPolicy) -> Self {
        Self::starting_at(policy, Instant::now())
    }

    #[must_use]
    pub fn starting_at(policy: TickPolicy, at: Instant) -> Self {
        Self {
            policy,
            last: at,
            carry: Duration::ZERO,
        }
    }

    #[must_use]
    pub fn policy(&self) -> TickPolicy {
        self.policy
    }

    /// Forget the time spent while the timer was stopped.
    pub fn restart(&mut self) {
        self.restart_at(Instant::now());
    }

    pub fn restart_at(&mut self, at: Instant) {
        self.last = at;
        self.carry = Duration::ZERO;
    }

    /// Seconds to feed the timer for a callback firing now.
    pub fn elapsed_secs(&mut self) -> u32 {
        self.elapsed_secs_at(Instant::now())
    }

    pub fn elapsed_secs_at(&mut self, now: Instant) -> u32 {
        let since_last = now.saturating_duration_since(self.last);
        self.last = now;

        match self.policy {
            TickPolicy::SingleStep => 1,
            TickPolicy::CatchUp => {
                let total = self.carry + since_last;
                let whole = total.as_secs();
                self.carry = total - Duration::from_secs(whole);
                u32::try_from(whole).unwrap_or(u32::MAX)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_policy_names() {
        assert_eq!("catch-up".parse(), Ok(TickPolicy::CatchUp));
        assert_eq!(" Single-Step ".parse(), Ok(TickPolicy::SingleStep));
        assert_eq!(
            "sometimes".parse::<TickPolicy>(),
            Err(ConfigError::InvalidTickPolicy("sometimes".into()))
        );
        assert_eq!(TickPolicy::default().to_string(), "catch-up");
    }

    #[test]
    fn catch_up_counts_missed_seconds() {
        let t0 = Instant::now();
        let mut clock = TickClock::starting_at(TickPolicy::CatchUp, t0);
        assert_eq!(clock.elapsed_secs_at(t0 + Duration::from_secs(1)), 1);
        assert_eq!(clock.elapsed_secs_at(t0 + Duration::from_secs(31)), 30);
    }

    #[test]
    fn catch_up_carries_sub_second_jitter() {
        let t0 = Instant::now();
        let mut clock = TickClock::starting_at(TickPolicy::CatchUp, t0);
        let fed = [
            clock.elapsed_secs_at(t0 + Duration::from_millis(900)),
            clock.elapsed_secs_at(t0 + Duration::from_millis(1_900)),
            clock.elapsed_secs_at(t0 + Duration::from_millis(3_000)),
        ];
        assert_eq!(fed, [0, 1, 2]);
        assert_eq!(fed.iter().sum::<u32>(), 3);
    }

    #[test]
    fn single_step_ignores_delay() {
        let t0 = Instant::now();
        let mut clock = TickClock::starting_at(TickPolicy::SingleStep, t0);
        assert_eq!(clock.elapsed_secs_at(t0 + Duration::from_secs(45)), 1);
    }

    #[test]
    fn restart_drops_carry() {
        let t0 = Instant::now();
        let mut clock = TickClock::starting_at(TickPolicy::CatchUp, t0);
        clock.elapsed_secs_at(t0 + Duration::from_millis(700));
        clock.restart_at(t0 + Duration::from_secs(10));
        assert_eq!(clock.elapsed_secs_at(t0 + Duration::from_millis(10_500)), 0);
    }
}

//! Clock & Period Model (spec.md §4.1): monotonic game time, period
//! boundaries, halftime detection, and wall-clock catch-up.

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, Seconds};
use crate::error::{CatchUpRejectReason, EngineError};

/// Upper bound on a single `apply_missed_time` call (spec.md §4.1, §5).
pub const MAX_CATCHUP: Seconds = 3600;
/// Per-tick cap during catch-up iteration (spec.md §5).
const CATCHUP_STEP_CAP: Seconds = 10;
/// Window around gameLength/2 that counts as halftime (spec.md §4.1).
const HALFTIME_WINDOW: Seconds = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClockState {
    Initialized,
    Running,
    Paused,
    Ended,
}

/// Emitted by `tick()`/`apply_missed_time()` to tell the engine what
/// happened this step, so it can fire the right subscriber callbacks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    pub seconds_elapsed: Seconds,
    pub period_ended: bool,
    pub game_ended: bool,
}

impl TickOutcome {
    fn merge(&mut self, other: TickOutcome) {
        self.seconds_elapsed += other.seconds_elapsed;
        self.period_ended |= other.period_ended;
        self.game_ended |= other.game_ended;
    }
}

pub struct Clock {
    state: ClockState,
    current_time: Seconds,
    current_period: u32,
    period_elapsed: Seconds,
    period_length: Seconds,
    num_periods: u32,
}

impl Clock {
    pub fn new(config: &GameConfig) -> Self {
        Self {
            state: ClockState::Initialized,
            current_time: 0,
            current_period: 1,
            period_elapsed: 0,
            period_length: config.period_length,
            num_periods: config.num_periods,
        }
    }

    pub fn state(&self) -> ClockState {
        self.state
    }

    pub fn current_time(&self) -> Seconds {
        self.current_time
    }

    pub fn current_period(&self) -> u32 {
        self.current_period
    }

    pub fn period_elapsed(&self) -> Seconds {
        self.period_elapsed
    }

    pub fn game_length(&self) -> Seconds {
        self.period_length * self.num_periods
    }

    pub fn is_over(&self) -> bool {
        self.state == ClockState::Ended
    }

    /// `start()` requires Initialized or Paused, not Ended.
    pub fn start(&mut self) -> Result<(), EngineError> {
        match self.state {
            ClockState::Initialized | ClockState::Paused => {
                self.state = ClockState::Running;
                Ok(())
            }
            ClockState::Running => Ok(()),
            ClockState::Ended => Err(EngineError::GameOver),
        }
    }

    pub fn stop(&mut self) -> Result<(), EngineError> {
        match self.state {
            ClockState::Running => {
                self.state = ClockState::Paused;
                Ok(())
            }
            ClockState::Paused | ClockState::Initialized => Ok(()),
            ClockState::Ended => Err(EngineError::GameOver),
        }
    }

    pub fn reset(&mut self, config: &GameConfig) {
        self.state = ClockState::Initialized;
        self.current_time = 0;
        self.current_period = 1;
        self.period_elapsed = 0;
        self.period_length = config.period_length;
        self.num_periods = config.num_periods;
    }

    /// Halftime is defined as `|currentTime - gameLength/2| <= 30s`.
    pub fn is_halftime(&self) -> bool {
        let half = self.game_length() / 2;
        self.current_time.abs_diff(half) <= HALFTIME_WINDOW
    }

    /// Advance one simulated second. Returns `Err(NotRunning)` if the clock
    /// isn't Running; a no-op with an empty outcome if already Ended.
    pub fn tick(&mut self) -> Result<TickOutcome, EngineError> {
        if self.state == ClockState::Ended {
            return Ok(TickOutcome::default());
        }
        if self.state != ClockState::Running {
            return Err(EngineError::NotRunning);
        }

        self.current_time += 1;
        self.period_elapsed += 1;

        let mut outcome = TickOutcome {
            seconds_elapsed: 1,
            period_ended: false,
            game_ended: false,
        };
        self.maybe_roll_period(&mut outcome);
        Ok(outcome)
    }

    fn maybe_roll_period(&mut self, outcome: &mut TickOutcome) {
        if self.period_elapsed >= self.period_length {
            let overflow = self.period_elapsed - self.period_length;
            self.current_period += 1;
            self.period_elapsed = overflow;
            outcome.period_ended = true;

            if self.current_period > self.num_periods {
                self.state = ClockState::Ended;
                outcome.game_ended = true;
            }
        }
    }

    /// Monotonic catch-up bounded by `MAX_CATCHUP`. No rotations are
    /// simulated — only time accrual and period rollover, iterated in
    /// steps no larger than `CATCHUP_STEP_CAP`.
    pub fn apply_missed_time(&mut self, delta: Seconds) -> Result<TickOutcome, EngineError> {
        if delta == 0 || self.is_over() {
            return Err(EngineError::CatchUpRejected(
                CatchUpRejectReason::NonPositiveOrGameOver,
            ));
        }
        if delta > MAX_CATCHUP {
            warn!("rejecting stale catch-up of {delta}s (max {MAX_CATCHUP}s)");
            return Err(EngineError::CatchUpRejected(CatchUpRejectReason::Stale));
        }

        let mut remaining = delta;
        let mut total = TickOutcome::default();

        while remaining > 0 && !self.is_over() {
            let step = remaining.min(CATCHUP_STEP_CAP).min(self.game_remaining());
            if step == 0 {
                break;
            }
            self.current_time += step;
            self.period_elapsed += step;
            remaining -= step;

            let mut step_outcome = TickOutcome {
                seconds_elapsed: step,
                period_ended: false,
                game_ended: false,
            };
            // Period rollover may need to repeat if the step crossed more
            // than one period boundary (small periodLength edge case).
            while self.period_elapsed >= self.period_length && !self.is_over() {
                self.maybe_roll_period(&mut step_outcome);
            }
            total.merge(step_outcome);
        }

        Ok(total)
    }

    /// Remaining seconds in the current period.
    pub fn period_remaining(&self) -> Seconds {
        self.period_length.saturating_sub(self.period_elapsed)
    }

    /// Remaining seconds in the game.
    pub fn game_remaining(&self) -> Seconds {
        self.game_length().saturating_sub(self.current_time)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sport;

    fn cfg() -> GameConfig {
        GameConfig::new(1200, 2, 5, Sport::Basketball) // 2x20min halves
    }

    #[test]
    fn start_from_initialized_then_tick_advances_time() {
        let mut clock = Clock::new(&cfg());
        clock.start().unwrap();
        let out = clock.tick().unwrap();
        assert_eq!(clock.current_time(), 1);
        assert_eq!(out.seconds_elapsed, 1);
        assert!(!out.period_ended);
    }

    #[test]
    fn tick_without_starting_fails() {
        let mut clock = Clock::new(&cfg());
        assert!(matches!(clock.tick(), Err(EngineError::NotRunning)));
    }

    #[test]
    fn period_rolls_over_at_period_length() {
        let mut clock = Clock::new(&cfg());
        clock.start().unwrap();
        for _ in 0..1200 {
            clock.tick().unwrap();
        }
        assert_eq!(clock.current_period(), 2);
        assert_eq!(clock.period_elapsed(), 0);
    }

    #[test]
    fn game_ends_after_final_period() {
        let mut clock = Clock::new(&cfg());
        clock.start().unwrap();
        for _ in 0..2400 {
            clock.tick().unwrap();
        }
        assert!(clock.is_over());
        assert_eq!(clock.current_time(), 2400);
    }

    #[test]
    fn is_halftime_within_window() {
        let mut clock = Clock::new(&cfg());
        clock.start().unwrap();
        for _ in 0..1195 {
            clock.tick().unwrap();
        }
        assert!(clock.is_halftime());
        for _ in 0..40 {
            clock.tick().unwrap();
        }
        assert!(!clock.is_halftime());
    }

    #[test]
    fn apply_missed_time_advances_monotonically() {
        let mut clock = Clock::new(&cfg());
        clock.start().unwrap();
        let out = clock.apply_missed_time(120).unwrap();
        assert_eq!(clock.current_time(), 120);
        assert_eq!(out.seconds_elapsed, 120);
    }

    #[test]
    fn apply_missed_time_rejects_zero_and_stale() {
        let mut clock = Clock::new(&cfg());
        clock.start().unwrap();
        assert!(matches!(
            clock.apply_missed_time(0),
            Err(EngineError::CatchUpRejected(CatchUpRejectReason::NonPositiveOrGameOver))
        ));
        assert!(matches!(
            clock.apply_missed_time(MAX_CATCHUP + 1),
            Err(EngineError::CatchUpRejected(CatchUpRejectReason::Stale))
        ));
    }

    #[test]
    fn apply_missed_time_caps_at_game_length() {
        let mut clock = Clock::new(&cfg());
        clock.start().unwrap();
        clock.apply_missed_time(MAX_CATCHUP).unwrap();
        assert_eq!(clock.current_time(), clock.game_length());
        assert!(clock.is_over());

        // A second catch-up after game end is rejected.
        assert!(matches!(
            clock.apply_missed_time(10),
            Err(EngineError::CatchUpRejected(CatchUpRejectReason::NonPositiveOrGameOver))
        ));
    }
}

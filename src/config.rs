//! Game configuration: the knobs the Dynamic Target Solver and Urgency
//! Planner read every tick. Configuration here is data, not a file loader —
//! loading a config file is an external collaborator's job (spec.md §1).

use serde::{Deserialize, Serialize};

pub type Seconds = u32;

/// Which sport's spacing/roster conventions the solver should use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sport {
    Basketball,
    Soccer,
}

impl Sport {
    /// Minimum rotation spacing used by the Dynamic Target Solver
    /// (spec.md §4.3) when choosing `idealShiftsPerPlayer`.
    pub fn min_spacing(&self, bench_players: usize) -> Seconds {
        match self {
            Sport::Basketball => {
                if bench_players >= 4 {
                    105
                } else {
                    75
                }
            }
            Sport::Soccer => {
                if bench_players >= 4 {
                    150
                } else {
                    120
                }
            }
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameConfig {
    pub period_length: Seconds,
    pub num_periods: u32,
    pub field_spots: usize,
    pub sport: Sport,
    pub goalkeeper_protection: bool,

    pub final_no_sub_window: Seconds,
    pub check_interval: Seconds,
    pub look_ahead_window: Seconds,
    pub ideal_shifts_override: Option<u32>,
    pub variance_goal: Seconds,
    pub max_early_variance: Seconds,
    pub warning_beep_seconds: Seconds,
    pub enable_warning_sound: bool,
}

impl GameConfig {
    pub fn new(period_length: Seconds, num_periods: u32, field_spots: usize, sport: Sport) -> Self {
        Self {
            period_length,
            num_periods,
            field_spots,
            sport,
            goalkeeper_protection: false,
            final_no_sub_window: 45,
            check_interval: 15,
            look_ahead_window: 60,
            ideal_shifts_override: None,
            variance_goal: 60,
            max_early_variance: 120,
            warning_beep_seconds: 10,
            enable_warning_sound: true,
        }
    }

    pub fn game_length(&self) -> Seconds {
        self.period_length * self.num_periods
    }

    /// `min(finalNoSubWindow · numPeriods, 0.4 · gameLength)`.
    pub fn protected_time(&self) -> Seconds {
        let by_window = self.final_no_sub_window * self.num_periods;
        let by_fraction = (self.game_length() as f64 * 0.4) as Seconds;
        by_window.min(by_fraction)
    }

    /// Seconds remaining until the period (or game) ends, whichever comes
    /// first, given the current period-elapsed and game-elapsed time.
    pub fn end_of_period_lockout(&self, period_elapsed: Seconds, now: Seconds) -> bool {
        let period_remaining = self.period_length.saturating_sub(period_elapsed);
        let game_remaining = self.game_length().saturating_sub(now);
        period_remaining.min(game_remaining) <= self.final_no_sub_window
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn game_length_is_periods_times_length() {
        let cfg = GameConfig::new(600, 4, 5, Sport::Basketball);
        assert_eq!(cfg.game_length(), 2400);
    }

    #[test]
    fn protected_time_takes_the_smaller_bound() {
        let cfg = GameConfig::new(600, 4, 5, Sport::Basketball);
        // 45 * 4 = 180, 0.4 * 2400 = 960 -> smaller is 180
        assert_eq!(cfg.protected_time(), 180);
    }

    #[test]
    fn end_of_period_lockout_triggers_inside_window() {
        let cfg = GameConfig::new(600, 2, 5, Sport::Basketball);
        assert!(cfg.end_of_period_lockout(560, 560));
        assert!(!cfg.end_of_period_lockout(500, 500));
    }

    #[test]
    fn min_spacing_depends_on_sport_and_bench_size() {
        assert_eq!(Sport::Basketball.min_spacing(5), 105);
        assert_eq!(Sport::Basketball.min_spacing(2), 75);
        assert_eq!(Sport::Soccer.min_spacing(5), 150);
        assert_eq!(Sport::Soccer.min_spacing(2), 120);
    }
}

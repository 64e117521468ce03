//! `SetupInput` (spec.md §6): the one thing a UI collaborator hands the
//! engine before `initialize()`. Validation produces a structured,
//! itemized list of violations rather than a single string.

use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, Seconds, Sport};
use crate::error::{EngineError, ValidationViolation};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodFormat {
    Halves,
    Quarters,
}

impl PeriodFormat {
    fn num_periods(self) -> u32 {
        match self {
            PeriodFormat::Halves => 2,
            PeriodFormat::Quarters => 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupInput {
    pub format: PeriodFormat,
    pub minutes_per_period: u32,
    pub field_spots: usize,
    pub num_reserves: usize,
    pub num_goalkeepers: u32,
    pub sport: Sport,
    pub starter_names: Vec<String>,
    pub reserve_names: Vec<String>,
    pub jersey_numbers: Option<Vec<String>>,
    pub ideal_shifts_per_player: Option<u32>,
    pub enable_warning_sound: Option<bool>,
    pub warning_beep_seconds: Option<Seconds>,
}

/// Validates a `SetupInput` and, on success, builds the `GameConfig` plus
/// the ordered roster-name list the engine should pass to `RosterStore`.
pub fn validate(input: &SetupInput) -> Result<(GameConfig, Vec<String>), EngineError> {
    let mut violations = Vec::new();

    if !(1..=60).contains(&input.minutes_per_period) {
        violations.push(ValidationViolation::new(
            "minutes_per_period",
            "must be between 1 and 60",
        ));
    }

    let field_spots_range: std::ops::RangeInclusive<usize> = match input.sport {
        Sport::Soccer => 4..=11,
        Sport::Basketball => 5..=5,
    };
    if !field_spots_range.contains(&input.field_spots) {
        violations.push(ValidationViolation::new(
            "field_spots",
            format!("must be in {field_spots_range:?} for this sport"),
        ));
    }

    let max_reserves = 30usize.saturating_sub(input.field_spots);
    if input.num_reserves > max_reserves {
        violations.push(ValidationViolation::new(
            "num_reserves",
            format!("must be at most {max_reserves}"),
        ));
    }
    if matches!(input.sport, Sport::Soccer) && input.num_reserves > 6 {
        violations.push(ValidationViolation::new(
            "num_reserves",
            "soccer reserves must be at most 6",
        ));
    }

    if matches!(input.sport, Sport::Soccer) && input.num_goalkeepers > 1 {
        violations.push(ValidationViolation::new(
            "num_goalkeepers",
            "soccer supports at most one designated goalkeeper",
        ));
    }

    if input.starter_names.len() != input.field_spots {
        violations.push(ValidationViolation::new(
            "starter_names",
            format!("expected exactly {} starters", input.field_spots),
        ));
    }
    if input.reserve_names.len() != input.num_reserves {
        violations.push(ValidationViolation::new(
            "reserve_names",
            format!("expected exactly {} reserves", input.num_reserves),
        ));
    }

    let total_roster = input.starter_names.len() + input.reserve_names.len();
    let roster_range: std::ops::RangeInclusive<usize> = match input.sport {
        Sport::Basketball => 9..=30,
        Sport::Soccer => 9..=17,
    };
    if !roster_range.contains(&total_roster) {
        violations.push(ValidationViolation::new(
            "roster size",
            format!("total roster must be in {roster_range:?}, got {total_roster}"),
        ));
    }

    let mut all_names: Vec<&String> = input.starter_names.iter().chain(input.reserve_names.iter()).collect();
    all_names.sort();
    for pair in all_names.windows(2) {
        if pair[0] == pair[1] {
            violations.push(ValidationViolation::new(
                "names",
                format!("duplicate player name: {}", pair[0]),
            ));
        }
        if pair[0].trim().is_empty() {
            violations.push(ValidationViolation::new("names", "player name must not be empty"));
        }
    }

    if let Some(numbers) = &input.jersey_numbers {
        let mut sorted = numbers.clone();
        sorted.sort();
        for pair in sorted.windows(2) {
            if pair[0] == pair[1] {
                violations.push(ValidationViolation::new(
                    "jersey_numbers",
                    format!("duplicate jersey number: {}", pair[0]),
                ));
            }
        }
    }

    if !violations.is_empty() {
        return Err(EngineError::Validation(violations));
    }

    let period_length = input.minutes_per_period * 60;
    let mut config = GameConfig::new(
        period_length,
        input.format.num_periods(),
        input.field_spots,
        input.sport,
    );
    config.goalkeeper_protection = input.num_goalkeepers > 0;
    config.ideal_shifts_override = input.ideal_shifts_per_player;
    if let Some(enabled) = input.enable_warning_sound {
        config.enable_warning_sound = enabled;
    }
    if let Some(beep) = input.warning_beep_seconds {
        config.warning_beep_seconds = beep;
    }

    let mut roster_names = input.starter_names.clone();
    roster_names.extend(input.reserve_names.clone());

    Ok((config, roster_names))
}

//! Variance Monitor (spec.md §4.5): live deviation (range) for the planner,
//! population standard deviation for final statistics, and the dynamic
//! threshold the planner compares deviation against.

use crate::config::{GameConfig, Seconds};

/// `max - min` of `total_time_played` over the given values. Live deviation
/// used by the planner's decision ladder.
pub fn deviation(values: &[Seconds]) -> Seconds {
    match (values.iter().min(), values.iter().max()) {
        (Some(&min), Some(&max)) => max - min,
        _ => 0,
    }
}

/// Population standard deviation, rounded to the nearest integer second
/// (spec.md §9: floating point confined to variance computation, rounded
/// at the boundary).
pub fn population_std_dev(values: &[Seconds]) -> Seconds {
    if values.is_empty() {
        return 0;
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&v| v as f64).sum::<f64>() / n;
    let variance = values
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    variance.sqrt().round() as Seconds
}

/// Linearly interpolates from `maxEarlyVariance` at t=0 to `varianceGoal`
/// at t=gameLength.
pub fn dynamic_variance_threshold(now: Seconds, config: &GameConfig) -> Seconds {
    let game_length = config.game_length();
    if game_length == 0 {
        return config.variance_goal;
    }
    let progress = (now.min(game_length) as f64) / (game_length as f64);
    let start = config.max_early_variance as f64;
    let end = config.variance_goal as f64;
    (start + (end - start) * progress).round() as Seconds
}

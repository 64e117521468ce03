//! Dynamic Target Solver (spec.md §4.3): derives per-player targets and
//! substitution-spacing bounds from the current eligible count and config.

use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, Seconds};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DynamicTargets {
    pub target_playing_time: Seconds,
    pub ideal_shifts_per_player: u32,
    pub min_substitution_gap: Seconds,
    pub prorated_max_court_stint: Seconds,
    pub prorated_max_bench_stint: Seconds,
}

/// Adaptive bounds on `minSubstitutionGap`, bracketed by game length
/// (spec.md §4.3, Glossary "minSubstitutionGap").
fn adaptive_gap_bounds(game_length: Seconds) -> (Seconds, Seconds) {
    if game_length <= 1200 {
        (45, 120)
    } else if game_length <= 2400 {
        (60, 180)
    } else {
        (90, 240)
    }
}

/// Recomputed at init and on every roster-size change.
pub fn compute_targets(
    eligible_count: usize,
    bench_count: usize,
    config: &GameConfig,
) -> DynamicTargets {
    let field_spots = config.field_spots as Seconds;
    let game_length = config.game_length();
    let protected_time = config.protected_time();
    let playable = game_length.saturating_sub(protected_time);

    let eligible = eligible_count.max(1) as Seconds;
    let target_playing_time = playable * field_spots / eligible;

    let floor_min = 2 * config.check_interval;
    let floor_max = ((target_playing_time as f64) * 0.9) as Seconds;
    let floor_max = floor_max.max(floor_min);
    let desired_stint = clamp(target_playing_time / 2, floor_min, floor_max);

    let base_estimate = if desired_stint == 0 {
        1
    } else {
        ((target_playing_time as f64 / desired_stint as f64).round() as i64).max(1) as u32
    };

    let min_spacing = config.sport.min_spacing(bench_count);

    let ideal_shifts = if let Some(overridden) = config.ideal_shifts_override {
        overridden.max(1)
    } else {
        pick_ideal_shifts(base_estimate, target_playing_time, min_spacing)
    };

    let prorated_max_court_stint = clamp(
        target_playing_time / ideal_shifts.max(1),
        floor_min,
        floor_max,
    );

    let bench_pool = bench_count.max(1) as Seconds;
    let target_bench_time = game_length.saturating_sub(target_playing_time);
    let prorated_max_bench_stint = clamp(
        target_bench_time / ideal_shifts.max(1).min(bench_pool.max(1) as u32),
        floor_min,
        floor_max,
    );

    let (gap_floor, gap_ceiling) = adaptive_gap_bounds(game_length);
    let raw_gap = if ideal_shifts == 0 {
        gap_ceiling
    } else {
        playable / (bench_count.max(1) as Seconds * ideal_shifts)
    };
    let min_substitution_gap = clamp(raw_gap, gap_floor, gap_ceiling);

    DynamicTargets {
        target_playing_time,
        ideal_shifts_per_player: ideal_shifts,
        min_substitution_gap,
        prorated_max_court_stint,
        prorated_max_bench_stint,
    }
}

/// Enumerate `baseEstimate ± 2` and choose the highest value whose implied
/// rotation spacing is still `>= min_spacing`.
fn pick_ideal_shifts(base_estimate: u32, target_playing_time: Seconds, min_spacing: Seconds) -> u32 {
    let candidates: Vec<u32> = (base_estimate.saturating_sub(2)..=base_estimate + 2)
        .filter(|&c| c >= 1)
        .collect();

    candidates
        .into_iter()
        .filter(|&shifts| target_playing_time / shifts >= min_spacing)
        .max()
        .unwrap_or(1)
}

fn clamp(value: Seconds, min: Seconds, max: Seconds) -> Seconds {
    if min > max {
        return min;
    }
    value.clamp(min, max)
}

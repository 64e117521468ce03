//! Candidate orderings used by the Urgency Planner's decision ladder
//! (spec.md §4.4, "Candidate orderings").

use std::collections::HashMap;

use crate::config::Seconds;
use crate::roster::PlayerTiming;

fn timing_of<'a>(timings: &'a HashMap<String, PlayerTiming>, id: &str) -> PlayerTiming {
    timings.get(id).copied().unwrap_or_default()
}

fn mean_time_played(ids: &[String], timings: &HashMap<String, PlayerTiming>) -> f64 {
    if ids.is_empty() {
        return 0.0;
    }
    let total: u64 = ids
        .iter()
        .map(|id| timing_of(timings, id).total_time_played as u64)
        .sum();
    total as f64 / ids.len() as f64
}

/// Sort by `currentCourtStint` descending.
pub fn urgent_off(court: &[String], timings: &HashMap<String, PlayerTiming>) -> Vec<String> {
    let mut ids = court.to_vec();
    ids.sort_by_key(|id| std::cmp::Reverse(timing_of(timings, id).current_court_stint));
    ids
}

/// Sort by `currentBenchStint` descending, ties by `totalBenchTime` descending.
pub fn urgent_on(bench: &[String], timings: &HashMap<String, PlayerTiming>) -> Vec<String> {
    let mut ids = bench.to_vec();
    ids.sort_by_key(|id| {
        let t = timing_of(timings, id);
        (std::cmp::Reverse(t.current_bench_stint), std::cmp::Reverse(t.total_bench_time))
    });
    ids
}

/// score = (totalTimePlayed - mean) + 0.5*currentCourtStint, descending.
pub fn proactive_off(
    court: &[String],
    eligible_for_mean: &[String],
    timings: &HashMap<String, PlayerTiming>,
) -> Vec<String> {
    let mean = mean_time_played(eligible_for_mean, timings);
    let mut scored: Vec<(String, f64)> = court
        .iter()
        .map(|id| {
            let t = timing_of(timings, id);
            let score = (t.total_time_played as f64 - mean) + 0.5 * t.current_court_stint as f64;
            (id.clone(), score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(id, _)| id).collect()
}

/// score = (mean - totalTimePlayed) + 0.3*currentBenchStint + 0.1*totalBenchTime, descending.
pub fn proactive_on(
    bench: &[String],
    eligible_for_mean: &[String],
    timings: &HashMap<String, PlayerTiming>,
) -> Vec<String> {
    let mean = mean_time_played(eligible_for_mean, timings);
    let mut scored: Vec<(String, f64)> = bench
        .iter()
        .map(|id| {
            let t = timing_of(timings, id);
            let score = (mean - t.total_time_played as f64)
                + 0.3 * t.current_bench_stint as f64
                + 0.1 * t.total_bench_time as f64;
            (id.clone(), score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Court players whose `proratedMaxCourtStint - currentCourtStint` falls in
/// `(0, lookAhead]`, sorted by time-remaining ascending (soonest to cap first).
pub fn upcoming_off(
    court: &[String],
    timings: &HashMap<String, PlayerTiming>,
    prorated_max_court_stint: Seconds,
    look_ahead: Seconds,
) -> Vec<String> {
    let mut scored: Vec<(String, Seconds)> = court
        .iter()
        .filter_map(|id| {
            let stint = timing_of(timings, id).current_court_stint;
            let remaining = prorated_max_court_stint.saturating_sub(stint);
            if remaining > 0 && remaining <= look_ahead {
                Some((id.clone(), remaining))
            } else {
                None
            }
        })
        .collect();
    scored.sort_by_key(|(_, remaining)| *remaining);
    scored.into_iter().map(|(id, _)| id).collect()
}

/// Bench analogue of `upcoming_off`, tiebreak on `totalBenchTime` descending.
pub fn upcoming_on(
    bench: &[String],
    timings: &HashMap<String, PlayerTiming>,
    prorated_max_bench_stint: Seconds,
    look_ahead: Seconds,
) -> Vec<String> {
    let mut scored: Vec<(String, Seconds, Seconds)> = bench
        .iter()
        .filter_map(|id| {
            let t = timing_of(timings, id);
            let remaining = prorated_max_bench_stint.saturating_sub(t.current_bench_stint);
            if remaining > 0 && remaining <= look_ahead {
                Some((id.clone(), remaining, t.total_bench_time))
            } else {
                None
            }
        })
        .collect();
    scored.sort_by_key(|(_, remaining, total_bench)| (*remaining, std::cmp::Reverse(*total_bench)));
    scored.into_iter().map(|(id, _, _)| id).collect()
}

//! Urgency Planner (spec.md §4.4): the per-tick decision of whether to
//! substitute, who to swap, and why.

pub mod candidates;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, Seconds};
use crate::roster::RosterSnapshot;
use crate::solver::DynamicTargets;
use crate::variance::{deviation, dynamic_variance_threshold};

const HALFTIME_WINDOW: Seconds = 30;
const MAX_PAIRS_PER_ROTATION: usize = 2;

/// Why a rotation was produced — carried on every `Rotation` for
/// testability and logging (spec.md §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RotationReason {
    Halftime,
    Urgent,
    VarianceCorrection,
    Proactive,
    ScheduledBalance,
    Emergency,
    FouledOut,
    RecoveryCatchUp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RotationProposal {
    pub off: Vec<String>,
    pub on: Vec<String>,
    pub reason: RotationReason,
}

/// Planner-owned state that persists across ticks (distinct from the
/// Roster/State Store, which owns membership and timings).
#[derive(Debug, Clone, Default)]
pub struct PlannerState {
    pub last_substitution_time: Option<Seconds>,
    pub halftime_done: bool,
}

impl PlannerState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_substitution(&mut self, at: Seconds) {
        self.last_substitution_time = Some(at);
    }
}

/// `effectiveMinGap(t)`: attenuates the base min-gap as the game progresses
/// (spec.md §4.4).
pub fn effective_min_gap(
    now: Seconds,
    game_length: Seconds,
    base_gap: Seconds,
    current_deviation: Seconds,
    rotations_remaining: Option<u32>,
) -> Seconds {
    if game_length == 0 {
        return base_gap;
    }
    let progress = now as f64 / game_length as f64;

    let multiplier = if progress < 0.33 {
        1.0
    } else if progress < 0.67 {
        if current_deviation > 120 {
            0.85
        } else {
            1.0
        }
    } else if progress < 0.85 {
        if current_deviation > 90 {
            0.75
        } else if current_deviation > 60 {
            0.85
        } else {
            1.0
        }
    } else {
        match rotations_remaining {
            Some(remaining) if remaining <= 3 => 0.6,
            _ => 0.7,
        }
    };

    ((base_gap as f64) * multiplier).round() as Seconds
}

fn eligible_excluding_goalkeeper(ids: &[String], goalkeeper: Option<&str>) -> Vec<String> {
    ids.iter()
        .filter(|id| Some(id.as_str()) != goalkeeper)
        .cloned()
        .collect()
}

/// Truncate/validate a proposal against the live court/bench sets (spec.md
/// §4.4: "off ⊂ current court, on ⊂ current bench, intersections empty,
/// sizes equal and ≥ 1; otherwise downsized or rejected").
fn validate_proposal(
    mut off: Vec<String>,
    mut on: Vec<String>,
    court: &[String],
    bench: &[String],
) -> Option<(Vec<String>, Vec<String>)> {
    off.retain(|id| court.contains(id));
    on.retain(|id| bench.contains(id) && !off.contains(id));

    let n = off.len().min(on.len()).min(MAX_PAIRS_PER_ROTATION);
    off.truncate(n);
    on.truncate(n);

    if n == 0 {
        None
    } else {
        Some((off, on))
    }
}

/// Central decision-ladder operation: whether to substitute now, who to
/// swap, and with what reason. First match wins.
#[allow(clippy::too_many_arguments)]
pub fn check_for_substitution(
    now: Seconds,
    period_elapsed: Seconds,
    snapshot: &RosterSnapshot,
    targets: &DynamicTargets,
    config: &GameConfig,
    state: &mut PlannerState,
    goalkeeper: Option<&str>,
    rotations_remaining: Option<u32>,
) -> Option<RotationProposal> {
    let court = &snapshot.court;
    let bench = &snapshot.bench;
    let eligible = eligible_excluding_goalkeeper(&snapshot.eligible(), goalkeeper);

    let eligible_times: Vec<Seconds> = eligible
        .iter()
        .map(|id| snapshot.timings.get(id).map(|t| t.total_time_played).unwrap_or(0))
        .collect();
    let current_deviation = deviation(&eligible_times);
    let game_length = config.game_length();

    // 1. Halftime batch: one-shot, runs even inside an end-of-period
    // lockout window, always stops the ladder for this tick.
    if !state.halftime_done && now == game_length / 2 {
        state.halftime_done = true;
        if let Some(proposal) = halftime_batch(&eligible, court, bench, snapshot, config) {
            state.record_substitution(now);
            return Some(proposal);
        }
        return None;
    }

    // 2. Gap lockout.
    let base_gap = targets.min_substitution_gap;
    let gap = effective_min_gap(now, game_length, base_gap, current_deviation, rotations_remaining);
    if let Some(last) = state.last_substitution_time {
        if now.saturating_sub(last) < gap {
            return None;
        }
    }

    // End-of-period lockout applies to every remaining rung of the ladder.
    if config.end_of_period_lockout(period_elapsed, now) {
        return None;
    }

    // 3. Urgent.
    if let Some(proposal) = urgent(&eligible, court, bench, snapshot, targets) {
        state.record_substitution(now);
        return Some(proposal);
    }

    // 4. Variance correction.
    let threshold = dynamic_variance_threshold(now, config);
    if current_deviation > threshold {
        if let Some(proposal) = balanced_pairs(
            &eligible,
            court,
            bench,
            snapshot,
            targets,
            config,
            RotationReason::VarianceCorrection,
        ) {
            state.record_substitution(now);
            return Some(proposal);
        }
    }

    // 5. Proactive projection.
    let game_progress = if game_length == 0 { 0.0 } else { now as f64 / game_length as f64 };
    let projected_deviation = current_deviation + gap.min(base_gap);
    let should_project = projected_deviation >= current_deviation + 60
        || (game_progress > 0.7 && projected_deviation > 90);
    if should_project {
        if let Some(proposal) = balanced_pairs(
            &eligible,
            court,
            bench,
            snapshot,
            targets,
            config,
            RotationReason::Proactive,
        ) {
            state.record_substitution(now);
            return Some(proposal);
        }
    }

    // 6. Scheduled balance.
    let upcoming_off_ids = candidates::upcoming_off(
        court,
        &snapshot.timings,
        targets.prorated_max_court_stint,
        config.look_ahead_window,
    );
    let upcoming_on_ids = candidates::upcoming_on(
        bench,
        &snapshot.timings,
        targets.prorated_max_bench_stint,
        config.look_ahead_window,
    );
    if !upcoming_off_ids.is_empty() && !upcoming_on_ids.is_empty() {
        if let Some((off, on)) = validate_proposal(upcoming_off_ids, upcoming_on_ids, court, bench) {
            state.record_substitution(now);
            return Some(RotationProposal { off, on, reason: RotationReason::ScheduledBalance });
        }
    }

    debug!("no substitution proposed at t={now}");
    None
}

fn halftime_batch(
    eligible: &[String],
    court: &[String],
    bench: &[String],
    snapshot: &RosterSnapshot,
    config: &GameConfig,
) -> Option<RotationProposal> {
    let f = config.field_spots;
    let mut sorted = eligible.to_vec();
    sorted.sort_by_key(|id| {
        snapshot
            .timings
            .get(id)
            .map(|t| t.total_time_played)
            .unwrap_or(0)
    });
    let keep: std::collections::HashSet<String> = sorted.into_iter().take(f).collect();

    let off: Vec<String> = court.iter().filter(|id| !keep.contains(*id)).cloned().collect();
    let on: Vec<String> = bench.iter().filter(|id| keep.contains(*id)).cloned().collect();

    let n = off.len().min(on.len());
    if n == 0 {
        return None;
    }
    Some(RotationProposal {
        off: off.into_iter().take(n).collect(),
        on: on.into_iter().take(n).collect(),
        reason: RotationReason::Halftime,
    })
}

fn urgent(
    eligible: &[String],
    court: &[String],
    bench: &[String],
    snapshot: &RosterSnapshot,
    targets: &DynamicTargets,
) -> Option<RotationProposal> {
    let court: Vec<String> = court.iter().filter(|id| eligible.contains(id)).cloned().collect();
    let bench: Vec<String> = bench.iter().filter(|id| eligible.contains(id)).cloned().collect();

    let has_urgent_off = court.iter().any(|id| {
        snapshot
            .timings
            .get(id)
            .map(|t| t.current_court_stint >= targets.prorated_max_court_stint)
            .unwrap_or(false)
    });
    let has_urgent_on = bench.iter().any(|id| {
        snapshot
            .timings
            .get(id)
            .map(|t| t.current_bench_stint >= targets.prorated_max_bench_stint)
            .unwrap_or(false)
    });
    if !has_urgent_off && !has_urgent_on {
        return None;
    }

    let off = candidates::urgent_off(&court, &snapshot.timings);
    let on = candidates::urgent_on(&bench, &snapshot.timings);

    let (off, on) = validate_proposal(off, on, &court, &bench)?;
    Some(RotationProposal { off, on, reason: RotationReason::Urgent })
}

/// Shared pairing used by variance-correction and proactive-projection:
/// draws from the proactive pools, falling back to the upcoming pools
/// when the proactive pool alone can't fill a pair.
fn balanced_pairs(
    eligible: &[String],
    court: &[String],
    bench: &[String],
    snapshot: &RosterSnapshot,
    targets: &DynamicTargets,
    config: &GameConfig,
    reason: RotationReason,
) -> Option<RotationProposal> {
    let court: Vec<String> = court.iter().filter(|id| eligible.contains(id)).cloned().collect();
    let bench: Vec<String> = bench.iter().filter(|id| eligible.contains(id)).cloned().collect();

    let mut off = candidates::proactive_off(&court, eligible, &snapshot.timings);
    let mut on = candidates::proactive_on(&bench, eligible, &snapshot.timings);

    if off.is_empty() {
        off = candidates::upcoming_off(
            &court,
            &snapshot.timings,
            targets.prorated_max_court_stint,
            config.look_ahead_window,
        );
    }
    if on.is_empty() {
        on = candidates::upcoming_on(
            &bench,
            &snapshot.timings,
            targets.prorated_max_bench_stint,
            config.look_ahead_window,
        );
    }

    let (off, on) = validate_proposal(off, on, &court, &bench)?;
    Some(RotationProposal { off, on, reason })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sport;
    use crate::roster::{Player, RosterStore};
    use crate::solver::compute_targets;

    fn setup(n: usize, f: usize) -> (RosterStore, GameConfig) {
        let mut store = RosterStore::new();
        let roster: Vec<Player> = (0..n).map(|i| Player::new(format!("p{i}"))).collect();
        store.set_initial(&roster, f).unwrap();
        let cfg = GameConfig::new(1200, 2, f, Sport::Basketball);
        (store, cfg)
    }

    #[test]
    fn gap_lockout_blocks_immediate_resubstitution() {
        let (store, cfg) = setup(10, 5);
        let snapshot = store.snapshot();
        let targets = compute_targets(10, 5, &cfg);
        let mut state = PlannerState::new();
        state.record_substitution(100);

        let proposal = check_for_substitution(105, 105, &snapshot, &targets, &cfg, &mut state, None, None);
        assert!(proposal.is_none());
    }

    #[test]
    fn halftime_batch_fires_exactly_at_half_and_only_once() {
        let (mut store, cfg) = setup(10, 5);
        // bias timings so some bench players have less play time than some on-court.
        for _ in 0..100 {
            store.accrue_one_second();
        }
        let half = cfg.game_length() / 2;
        let snapshot = store.snapshot();
        let targets = compute_targets(10, 5, &cfg);
        let mut state = PlannerState::new();

        let first = check_for_substitution(half, half, &snapshot, &targets, &cfg, &mut state, None, None);
        assert!(state.halftime_done);
        let _ = first;

        let second = check_for_substitution(half + 1, half + 1, &snapshot, &targets, &cfg, &mut state, None, None);
        // Gap lockout or "already done" should prevent a second halftime batch.
        if let Some(p) = second {
            assert_ne!(p.reason, RotationReason::Halftime);
        }
    }

    #[test]
    fn effective_min_gap_shrinks_late_with_low_remaining_rotations() {
        let gap_early = effective_min_gap(100, 2400, 120, 30, None);
        let gap_late_tight = effective_min_gap(2300, 2400, 120, 30, Some(2));
        assert_eq!(gap_early, 120);
        assert!(gap_late_tight < gap_early);
    }

    #[test]
    fn urgent_fires_when_court_stint_exceeds_cap() {
        let (mut store, cfg) = setup(8, 5);
        let targets = compute_targets(8, 3, &cfg);
        for _ in 0..targets.prorated_max_court_stint {
            store.accrue_one_second();
        }
        let snapshot = store.snapshot();
        let mut state = PlannerState::new();
        state.record_substitution(0);

        let now = targets.prorated_max_court_stint + 200;
        let proposal = check_for_substitution(
            now, now, &snapshot, &targets, &cfg, &mut state, None, None,
        );
        assert!(proposal.is_some());
        assert_eq!(proposal.unwrap().reason, RotationReason::Urgent);
    }

    #[test]
    fn goalkeeper_is_never_a_candidate() {
        let (mut store, cfg) = setup(12, 9);
        let targets = compute_targets(12, 3, &cfg);
        for _ in 0..targets.prorated_max_court_stint + 50 {
            store.accrue_one_second();
        }
        let snapshot = store.snapshot();
        let mut state = PlannerState::new();
        state.record_substitution(0);

        let now = targets.prorated_max_court_stint + 250;
        let proposal = check_for_substitution(
            now, now, &snapshot, &targets, &cfg, &mut state, Some("p0"), None,
        );
        if let Some(p) = proposal {
            assert!(!p.off.contains(&"p0".to_string()));
            assert!(!p.on.contains(&"p0".to_string()));
        }
    }
}

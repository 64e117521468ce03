//! Recovery Controller (spec.md §4.7): resyncs the planner with ground
//! truth after any divergence and regenerates the remaining schedule.

use std::collections::HashMap;

use log::warn;
use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, Seconds};
use crate::planner::{self, PlannerState, RotationReason};
use crate::plan::Rotation;
use crate::roster::{PlayerTiming, RosterSnapshot};
use crate::solver::{self, DynamicTargets};

/// What triggered this recovery pass (spec.md Glossary: "Recovery").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DeviationKind {
    LateConfirm,
    Cancel,
    Emergency,
    FouledOut,
    Removal,
    Reinstatement,
    MissedTime,
    RotationRejection,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryOutcome {
    pub kind: DeviationKind,
    pub new_tail: Vec<Rotation>,
    /// Set when recovery could not produce any valid rotation — the engine
    /// keeps the empty tail and surfaces this as a soft warning, the clock
    /// keeps running (spec.md §4.7 failure semantics).
    pub warning: Option<String>,
}

/// A lightweight, mutable projection of roster state used only to generate
/// rotations ahead of real time. Never written back to the live
/// `RosterStore` directly — the engine applies the resulting `Rotation`s
/// through the normal confirm path as real time reaches them.
struct Projection {
    court: Vec<String>,
    bench: Vec<String>,
    timings: HashMap<String, PlayerTiming>,
}

impl Projection {
    fn from_snapshot(snapshot: &RosterSnapshot) -> Self {
        Self {
            court: snapshot.court.clone(),
            bench: snapshot.bench.clone(),
            timings: snapshot.timings.clone(),
        }
    }

    fn accrue(&mut self, seconds: Seconds) {
        for id in &self.court {
            let t = self.timings.entry(id.clone()).or_default();
            t.total_time_played += seconds;
            t.current_court_stint += seconds;
        }
        for id in &self.bench {
            let t = self.timings.entry(id.clone()).or_default();
            t.total_bench_time += seconds;
            t.current_bench_stint += seconds;
        }
    }

    fn apply(&mut self, off: &[String], on: &[String]) {
        self.court.retain(|id| !off.contains(id));
        self.bench.retain(|id| !on.contains(id));
        for id in on {
            self.court.push(id.clone());
            if let Some(t) = self.timings.get_mut(id) {
                t.current_bench_stint = 0;
            }
        }
        for id in off {
            self.bench.push(id.clone());
            if let Some(t) = self.timings.get_mut(id) {
                t.current_court_stint = 0;
            }
        }
    }

    fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            court: self.court.clone(),
            bench: self.bench.clone(),
            removed: Vec::new(),
            timings: self.timings.clone(),
        }
    }
}

pub struct RecoveryController;

impl RecoveryController {
    /// Given the deviation kind and a snapshot at time `t`, produce a new
    /// plan tail whose first rotation is scheduled as soon as the normal
    /// rules justify one.
    pub fn recover(
        kind: DeviationKind,
        t: Seconds,
        snapshot: &RosterSnapshot,
        config: &GameConfig,
        planner_state: &mut PlannerState,
        goalkeeper: Option<&str>,
    ) -> RecoveryOutcome {
        // (1) sync: the snapshot passed in already reflects ground truth.
        // (2) restart gap lockout from now.
        planner_state.last_substitution_time = Some(t);
        // (3) mark halftime handled if we're at/after the midpoint.
        if t >= config.game_length() / 2 {
            planner_state.halftime_done = true;
        }

        // (4) recompute dynamic targets with the current eligible count.
        let eligible = snapshot.eligible();
        let targets = solver::compute_targets(eligible.len(), snapshot.bench.len(), config);

        // (5) run the planner forward from t to gameLength.
        let rotations = Self::run_forward(t, snapshot, &targets, config, planner_state, goalkeeper);

        // (7) validate the first rotation against current court/bench
        // before handing it back; reject rather than apply a corrupt plan.
        if let Some(first) = rotations.first() {
            let valid = first.off.iter().all(|id| snapshot.court.contains(id))
                && first.on.iter().all(|id| snapshot.bench.contains(id));
            if !valid {
                warn!("recovery produced an invalid first rotation at t={t}; rejecting");
                return RecoveryOutcome {
                    kind,
                    new_tail: Vec::new(),
                    warning: Some("recovery rejected: invalid first rotation".to_string()),
                };
            }
        }

        let warning = if rotations.is_empty() {
            Some("recovery could not produce a valid rotation; bench may be too shallow".to_string())
        } else {
            None
        };

        RecoveryOutcome { kind, new_tail: rotations, warning }
    }

    /// Runs the planner forward from `start` to the end of the game against
    /// a disposable projection of roster state. Used both to build the
    /// initial plan at `initialize()` time and to regenerate a plan tail
    /// during recovery.
    pub(crate) fn run_forward(
        start: Seconds,
        snapshot: &RosterSnapshot,
        targets: &DynamicTargets,
        config: &GameConfig,
        planner_state: &mut PlannerState,
        goalkeeper: Option<&str>,
    ) -> Vec<Rotation> {
        let mut projection = Projection::from_snapshot(snapshot);
        let mut rotations = Vec::new();
        let game_length = config.game_length();
        let mut now = start;
        let mut period_elapsed = now % config.period_length.max(1);

        while now < game_length {
            let step = config.check_interval.min(game_length - now);
            projection.accrue(step);
            now += step;
            period_elapsed += step;
            if period_elapsed >= config.period_length {
                period_elapsed -= config.period_length;
            }

            let live = projection.snapshot();
            let proposal = planner::check_for_substitution(
                now,
                period_elapsed,
                &live,
                targets,
                config,
                planner_state,
                goalkeeper,
                None,
            );

            if let Some(proposal) = proposal {
                projection.apply(&proposal.off, &proposal.on);
                rotations.push(Rotation {
                    time: now,
                    off: proposal.off,
                    on: proposal.on,
                    reason: proposal.reason,
                });
            }
        }

        rotations.retain(|r| r.time > start);
        rotations
    }
}

/// Reason attached by the engine when a command itself (rather than the
/// ladder) produces a rotation during recovery replanning.
pub fn recovery_catch_up_reason() -> RotationReason {
    RotationReason::RecoveryCatchUp
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Sport;
    use crate::roster::{Player, RosterStore};

    fn setup(n: usize, f: usize) -> (RosterStore, GameConfig) {
        let mut store = RosterStore::new();
        let roster: Vec<Player> = (0..n).map(|i| Player::new(format!("p{i}"))).collect();
        store.set_initial(&roster, f).unwrap();
        let cfg = GameConfig::new(600, 4, f, Sport::Basketball);
        (store, cfg)
    }

    #[test]
    fn recovery_produces_a_future_first_rotation_after_late_confirm() {
        let (store, cfg) = setup(8, 5);
        let snapshot = store.snapshot();
        let mut state = PlannerState::new();

        let outcome = RecoveryController::recover(
            DeviationKind::LateConfirm,
            390,
            &snapshot,
            &cfg,
            &mut state,
            None,
        );

        if let Some(first) = outcome.new_tail.first() {
            assert!(first.time <= 405);
            assert!(first.time > 390);
        }
    }

    #[test]
    fn recovery_warns_softly_when_bench_is_too_shallow() {
        let (store, cfg) = setup(5, 5);
        let snapshot = store.snapshot();
        let mut state = PlannerState::new();

        let outcome = RecoveryController::recover(
            DeviationKind::Removal,
            0,
            &snapshot,
            &cfg,
            &mut state,
            None,
        );

        assert!(outcome.new_tail.is_empty());
        assert!(outcome.warning.is_some());
    }
}

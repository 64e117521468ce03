//! Game Engine (spec.md §4.6): drives the planner from clock ticks, owns
//! the Roster/State Store and Plan, and exposes the command + event
//! surface external collaborators use.

pub mod events;

use std::collections::HashMap;

use log::{debug, error, warn};

use crate::clock::{Clock, ClockState};
use crate::config::{GameConfig, Seconds};
use crate::error::EngineError;
use crate::persistence::{FinalStats, GameStateSnapshot, PlayerFinalLine, Scoring};
use crate::plan::{Plan, Rotation};
use crate::planner::{PlannerState, RotationReason};
use crate::recovery::{DeviationKind, RecoveryController, RecoveryOutcome};
use crate::roster::{Player, PlayerStatus, RosterStore};
use crate::setup::{self, SetupInput};
use crate::solver::{self, DynamicTargets};
use crate::variance;

pub use events::{EventSubscriber, PeriodEndInfo};

const VALIDATION_INTERVAL: Seconds = 30;
const EARLY_WARNING_LEAD: Seconds = 60;
/// How late a confirmation can arrive before it triggers Recovery
/// (spec.md §4.6: "if now - pendingTime > 15s... mark late").
const LATE_CONFIRM_THRESHOLD: Seconds = 15;

pub struct Engine {
    config: GameConfig,
    clock: Clock,
    roster: RosterStore,
    roster_order: Vec<Player>,
    plan: Plan,
    planner_state: PlannerState,
    targets: DynamicTargets,
    goalkeeper: Option<String>,
    pending: Option<Rotation>,
    pending_since: Option<Seconds>,
    scoring: Scoring,
    subscribers: Vec<Box<dyn EventSubscriber>>,
    game_end_emitted: bool,
    seconds_since_validation: Seconds,
}

impl Engine {
    pub fn new() -> Self {
        let config = GameConfig::new(600, 2, 5, crate::config::Sport::Basketball);
        let clock = Clock::new(&config);
        Self {
            clock,
            roster: RosterStore::new(),
            roster_order: Vec::new(),
            plan: Plan::new(),
            planner_state: PlannerState::new(),
            targets: DynamicTargets {
                target_playing_time: 0,
                ideal_shifts_per_player: 1,
                min_substitution_gap: 0,
                prorated_max_court_stint: 0,
                prorated_max_bench_stint: 0,
            },
            goalkeeper: None,
            pending: None,
            pending_since: None,
            scoring: Scoring::default(),
            subscribers: Vec::new(),
            game_end_emitted: false,
            seconds_since_validation: 0,
            config,
        }
    }

    pub fn subscribe(&mut self, subscriber: Box<dyn EventSubscriber>) {
        self.subscribers.push(subscriber);
    }

    // ---- commands -----------------------------------------------------

    /// `initialize(Setup)`: validates input, builds the roster, targets,
    /// and the full initial plan (the planner run forward across the
    /// entire game from t=0).
    pub fn initialize(&mut self, input: &SetupInput, goalkeeper_name: Option<String>) -> Result<(), EngineError> {
        let (config, roster_names) = setup::validate(input)?;

        let players: Vec<Player> = roster_names
            .iter()
            .enumerate()
            .map(|(i, name)| {
                let mut p = Player::new(name.clone());
                if let Some(numbers) = &input.jersey_numbers {
                    p.jersey_number = numbers.get(i).cloned();
                }
                if goalkeeper_name.as_deref() == Some(name.as_str()) {
                    p.is_goalkeeper = true;
                }
                p
            })
            .collect();

        self.roster = RosterStore::new();
        self.roster.set_initial(&players, config.field_spots)?;
        self.roster_order = players;
        self.goalkeeper = goalkeeper_name;
        self.config = config;
        self.clock = Clock::new(&self.config);
        self.planner_state = PlannerState::new();
        self.pending = None;
        self.pending_since = None;
        self.scoring = Scoring::default();
        self.game_end_emitted = false;
        self.seconds_since_validation = 0;

        let snapshot = self.roster.snapshot();
        self.targets = solver::compute_targets(snapshot.eligible().len(), snapshot.bench.len(), &self.config);

        let rotations = RecoveryController::run_forward(
            0,
            &snapshot,
            &self.targets,
            &self.config,
            &mut self.planner_state,
            self.goalkeeper.as_deref(),
        );
        self.plan = Plan::new();
        self.plan.rotations = rotations;

        Ok(())
    }

    pub fn start(&mut self) -> Result<(), EngineError> {
        self.clock.start()
    }

    pub fn stop(&mut self) -> Result<(), EngineError> {
        self.clock.stop()
    }

    pub fn reset(&mut self) {
        self.clock.reset(&self.config);
        self.plan = Plan::new();
        self.planner_state = PlannerState::new();
        self.pending = None;
        self.pending_since = None;
        self.scoring = Scoring::default();
        self.game_end_emitted = false;
        self.seconds_since_validation = 0;
    }

    /// Commits the pending rotation: off-players to bench, on-players to
    /// court, applied as a single atomic batch so the roster never passes
    /// through an over/under-filled intermediate state.
    pub fn confirm_rotation(&mut self) -> Result<(), EngineError> {
        let rotation = self.pending.take().ok_or(EngineError::NoPendingRotation)?;
        let since = self.pending_since.take().unwrap_or(self.clock.current_time());
        let now = self.clock.current_time();

        self.roster.apply_rotation(&rotation.off, &rotation.on);
        self.planner_state.record_substitution(now);
        self.plan.advance();

        if now.saturating_sub(since) > LATE_CONFIRM_THRESHOLD {
            self.trigger_recovery(DeviationKind::LateConfirm, now);
        }

        self.emit_update();
        Ok(())
    }

    pub fn cancel_rotation(&mut self) -> Result<(), EngineError> {
        if self.pending.take().is_none() {
            return Err(EngineError::NoPendingRotation);
        }
        self.pending_since = None;
        let now = self.clock.current_time();
        self.trigger_recovery(DeviationKind::Cancel, now);
        self.emit_update();
        Ok(())
    }

    /// Bypasses the gap lock. Optionally removes the off-player from play.
    pub fn emergency_substitution(
        &mut self,
        off: Vec<String>,
        on: Vec<String>,
        remove_from_game: bool,
    ) -> Result<(), EngineError> {
        let now = self.clock.current_time();
        self.roster.apply_rotation(&off, &on);
        if remove_from_game {
            for id in &off {
                self.roster.remove(id)?;
            }
        }
        self.planner_state.record_substitution(now);
        self.record_history_rotation(now, off, on, RotationReason::Emergency);
        self.trigger_recovery(DeviationKind::Emergency, now);
        self.emit_update();
        Ok(())
    }

    /// Auto-selects the least-played bench player when `p` is on court.
    pub fn player_fouled_out(&mut self, player: &str) -> Result<(), EngineError> {
        let now = self.clock.current_time();
        let status = self.roster.status_of(player);

        if status == Some(PlayerStatus::OnCourt) {
            let replacement = self
                .roster
                .bench()
                .into_iter()
                .min_by_key(|id| {
                    self.roster
                        .timing_of(id)
                        .map(|t| t.total_time_played)
                        .unwrap_or(Seconds::MAX)
                });
            if let Some(replacement) = replacement {
                self.roster.apply_rotation(&[player.to_string()], &[replacement.clone()]);
                self.record_history_rotation(
                    now,
                    vec![player.to_string()],
                    vec![replacement],
                    RotationReason::FouledOut,
                );
            }
        }

        self.roster.remove(player)?;
        self.trigger_recovery(DeviationKind::FouledOut, now);
        self.emit_update();
        Ok(())
    }

    pub fn remove_player(&mut self, player: &str) -> Result<(), EngineError> {
        let now = self.clock.current_time();
        self.roster.remove(player)?;
        self.trigger_recovery(DeviationKind::Removal, now);
        self.emit_update();
        Ok(())
    }

    pub fn return_player(&mut self, player: &str) -> Result<(), EngineError> {
        let now = self.clock.current_time();
        self.roster.reinstate(player);
        self.trigger_recovery(DeviationKind::Reinstatement, now);
        self.emit_update();
        Ok(())
    }

    pub fn update_player_score(&mut self, player: &str, delta: i32) {
        *self.scoring.player_points.entry(player.to_string()).or_insert(0) += delta;
        self.recompute_top_scorers();
        self.emit_score_update();
    }

    pub fn update_opposition_score(&mut self, delta: i32) {
        self.scoring.away += delta;
        self.emit_score_update();
    }

    pub fn update_team_name(&mut self, home: bool, name: String) {
        if home {
            self.scoring.home_team_name = name;
        } else {
            self.scoring.away_team_name = name;
        }
        self.emit_score_update();
    }

    /// Bounded, monotonic catch-up (spec.md §4.1, §5). No rotations are
    /// simulated during the gap; Recovery regenerates the schedule once
    /// control returns.
    pub fn apply_missed_time(&mut self, delta: Seconds) -> Result<(), EngineError> {
        let outcome = self.clock.apply_missed_time(delta)?;
        self.roster.accrue_seconds(outcome.seconds_elapsed);

        if outcome.period_ended {
            self.emit_period_end();
        }
        if outcome.game_ended {
            self.finish_game();
        } else {
            let now = self.clock.current_time();
            self.trigger_recovery(DeviationKind::MissedTime, now);
        }
        self.emit_update();
        Ok(())
    }

    /// Host signal hook for tab visibility changes. The actual time
    /// reconciliation happens through an explicit `apply_missed_time` call
    /// once the host computes the elapsed wall-clock gap.
    pub fn handle_visibility_change(&mut self) {
        debug!("visibility change signalled; awaiting apply_missed_time");
    }

    // ---- tick -----------------------------------------------------------

    /// Advances one simulated second. A no-op, not an error, when the
    /// clock isn't running — this keeps a host's naive per-second poll
    /// loop liveness-safe.
    pub fn tick(&mut self) {
        if self.clock.state() != ClockState::Running {
            return;
        }

        if let Err(err) = self.tick_inner() {
            error!("tick error: {err}");
            self.emit_error(&err.to_string());
        }
    }

    fn tick_inner(&mut self) -> Result<(), EngineError> {
        // 1. time accrual for current court/bench.
        self.roster.accrue_one_second();

        // 2. advance currentTime and periodElapsed.
        let outcome = self.clock.tick()?;
        let now = self.clock.current_time();

        // 3. early/regular warnings ahead of the next scheduled rotation.
        if self.pending.is_none() {
            if let Some(next) = self.plan.next_scheduled() {
                let remaining = next.time.saturating_sub(now);
                if remaining == EARLY_WARNING_LEAD {
                    self.emit_early_warning(remaining);
                } else if remaining == self.config.warning_beep_seconds {
                    self.emit_warning(remaining);
                }
            }
        }

        // 4. promote the scheduled rotation to pending once due.
        if self.pending.is_none() {
            if let Some(next) = self.plan.next_scheduled().cloned() {
                if now >= next.time {
                    let court = self.roster.court();
                    let bench = self.roster.bench();
                    let valid = next.off.iter().all(|id| court.contains(id))
                        && next.on.iter().all(|id| bench.contains(id));
                    if valid {
                        self.pending = Some(next.clone());
                        self.pending_since = Some(now);
                        self.emit_rotation(&next);
                    } else {
                        warn!("scheduled rotation at t={} referenced stale players; skipping", next.time);
                        self.plan.advance();
                        self.trigger_recovery(DeviationKind::RotationRejection, now);
                    }
                }
            }
        }

        // 5. period / game end.
        if outcome.period_ended {
            self.emit_period_end();
        }
        if outcome.game_ended {
            self.finish_game();
        }

        // 6. periodic invariant repair pass.
        self.seconds_since_validation += 1;
        if self.seconds_since_validation >= VALIDATION_INTERVAL {
            self.seconds_since_validation = 0;
            let report = self.roster.validate_and_repair();
            if !report.is_empty() {
                let err = EngineError::InvariantViolation(report);
                warn!("{err}");
                self.emit_error(&err.to_string());
            }
        }

        self.emit_update();
        Ok(())
    }

    // ---- internals --------------------------------------------------

    fn trigger_recovery(&mut self, kind: DeviationKind, now: Seconds) {
        let snapshot = self.roster.snapshot();
        self.targets = solver::compute_targets(snapshot.eligible().len(), snapshot.bench.len(), &self.config);

        let outcome = RecoveryController::recover(
            kind,
            now,
            &snapshot,
            &self.config,
            &mut self.planner_state,
            self.goalkeeper.as_deref(),
        );

        self.plan.replace_tail(now, outcome.new_tail.clone());
        if let Some(warning) = &outcome.warning {
            warn!("{warning}");
        }
        self.emit_recovery(&outcome);
    }

    fn record_history_rotation(&mut self, time: Seconds, off: Vec<String>, on: Vec<String>, reason: RotationReason) {
        self.plan.rotations.insert(
            self.plan.current_index,
            Rotation { time, off, on, reason },
        );
        self.plan.current_index += 1;
    }

    fn recompute_top_scorers(&mut self) {
        let mut scorers: Vec<(String, i32)> = self
            .scoring
            .player_points
            .iter()
            .map(|(id, pts)| (id.clone(), *pts))
            .collect();
        scorers.sort_by_key(|(_, pts)| std::cmp::Reverse(*pts));
        self.scoring.top_scorers = scorers.into_iter().take(3).map(|(id, _)| id).collect();
        self.scoring.home = self.scoring.player_points.values().sum();
    }

    fn finish_game(&mut self) {
        if self.game_end_emitted {
            return;
        }
        self.game_end_emitted = true;
        let stats = self.build_final_stats();
        for subscriber in &mut self.subscribers {
            subscriber.on_game_end(&stats);
        }
    }

    fn build_final_stats(&self) -> FinalStats {
        let snapshot = self.roster.snapshot();
        let eligible: Vec<String> = snapshot
            .eligible()
            .into_iter()
            .filter(|id| Some(id.as_str()) != self.goalkeeper.as_deref())
            .collect();
        let times: Vec<Seconds> = eligible
            .iter()
            .map(|id| snapshot.timings.get(id).map(|t| t.total_time_played).unwrap_or(0))
            .collect();

        let mut players = HashMap::new();
        for player in &self.roster_order {
            let timing = snapshot.timings.get(&player.id).copied().unwrap_or_default();
            let percentage = if self.targets.target_playing_time == 0 {
                0
            } else {
                ((timing.total_time_played as f64 / self.targets.target_playing_time as f64) * 100.0).round() as u32
            };
            players.insert(
                player.id.clone(),
                PlayerFinalLine {
                    minutes: timing.total_time_played,
                    bench_minutes: timing.total_bench_time,
                    percentage,
                    goals: self.scoring.player_points.get(&player.id).copied(),
                },
            );
        }

        FinalStats {
            players,
            variance: variance::population_std_dev(&times),
            rotations: self.plan.history().len(),
            average_minutes: if times.is_empty() { 0 } else { times.iter().sum::<Seconds>() / times.len() as Seconds },
            max_minutes: times.iter().copied().max().unwrap_or(0),
            min_minutes: times.iter().copied().min().unwrap_or(0),
            goalkeeper: self.goalkeeper.clone(),
        }
    }

    fn snapshot_for_subscribers(&self) -> GameStateSnapshot {
        let roster_snapshot = self.roster.snapshot();
        let eligible: Vec<String> = roster_snapshot
            .eligible()
            .into_iter()
            .filter(|id| Some(id.as_str()) != self.goalkeeper.as_deref())
            .collect();
        let times: Vec<Seconds> = eligible
            .iter()
            .map(|id| roster_snapshot.timings.get(id).map(|t| t.total_time_played).unwrap_or(0))
            .collect();

        let minutes: HashMap<String, Seconds> = roster_snapshot
            .timings
            .iter()
            .map(|(id, t)| (id.clone(), t.total_time_played))
            .collect();
        let bench_minutes: HashMap<String, Seconds> = roster_snapshot
            .timings
            .iter()
            .map(|(id, t)| (id.clone(), t.total_bench_time))
            .collect();
        let positions: HashMap<String, String> = self
            .roster_order
            .iter()
            .filter_map(|p| p.position.clone().map(|pos| (p.id.clone(), pos)))
            .collect();

        GameStateSnapshot {
            current_time: self.clock.current_time(),
            current_period: self.clock.current_period(),
            period_elapsed: self.clock.period_elapsed(),
            running: self.clock.state() == ClockState::Running,
            paused: self.clock.state() == ClockState::Paused,
            game_over: self.clock.is_over(),
            court: roster_snapshot.court.clone(),
            bench: roster_snapshot.bench.clone(),
            removed: roster_snapshot.removed.clone(),
            minutes,
            bench_minutes,
            positions,
            goalkeeper: self.goalkeeper.clone(),
            pending_rotation: self.pending.clone(),
            next_scheduled_rotation: self.plan.next_scheduled().cloned(),
            rotation_history_count: self.plan.history().len(),
            remaining_rotations: self.plan.remaining(),
            variance: variance::deviation(&times),
            target_minutes: self.targets.target_playing_time,
            scoring: self.scoring.clone(),
        }
    }

    fn emit_update(&mut self) {
        let state = self.snapshot_for_subscribers();
        for subscriber in &mut self.subscribers {
            subscriber.on_update(&state);
        }
    }

    fn emit_rotation(&mut self, rotation: &Rotation) {
        for subscriber in &mut self.subscribers {
            subscriber.on_rotation(rotation);
        }
    }

    fn emit_warning(&mut self, seconds_remaining: Seconds) {
        for subscriber in &mut self.subscribers {
            subscriber.on_warning(seconds_remaining);
        }
    }

    fn emit_early_warning(&mut self, seconds_remaining: Seconds) {
        for subscriber in &mut self.subscribers {
            subscriber.on_early_warning(seconds_remaining);
        }
    }

    fn emit_period_end(&mut self) {
        let info = PeriodEndInfo {
            ended_period: self.clock.current_period().saturating_sub(1).max(1),
            carry_over_seconds: self.clock.period_elapsed(),
        };
        for subscriber in &mut self.subscribers {
            subscriber.on_period_end(info);
        }
    }

    fn emit_recovery(&mut self, outcome: &RecoveryOutcome) {
        for subscriber in &mut self.subscribers {
            subscriber.on_recovery(outcome);
        }
    }

    fn emit_error(&mut self, message: &str) {
        for subscriber in &mut self.subscribers {
            subscriber.on_error(message);
        }
    }

    fn emit_score_update(&mut self) {
        let scoring = self.scoring.clone();
        for subscriber in &mut self.subscribers {
            subscriber.on_score_update(&scoring);
        }
    }

    // ---- accessors used by tests and hosts --------------------------

    pub fn config(&self) -> &GameConfig {
        &self.config
    }

    pub fn snapshot(&self) -> GameStateSnapshot {
        self.snapshot_for_subscribers()
    }

    pub fn current_time(&self) -> Seconds {
        self.clock.current_time()
    }

    pub fn is_running(&self) -> bool {
        self.clock.state() == ClockState::Running
    }

    pub fn is_over(&self) -> bool {
        self.clock.is_over()
    }
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

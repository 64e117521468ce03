//! Roster/State Store (spec.md §4.2): the sole writer of on-field / on-bench
//! / removed membership, and of per-player cumulative timings.

use std::collections::HashMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::Seconds;
use crate::error::EngineError;

/// Stable identity of a roster player. Equality is by identity (the `id`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Player {
    pub id: String,
    pub jersey_number: Option<String>,
    pub position: Option<String>,
    pub is_goalkeeper: bool,
}

impl Player {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            jersey_number: None,
            position: None,
            is_goalkeeper: false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerTiming {
    pub total_time_played: Seconds,
    pub total_bench_time: Seconds,
    pub current_court_stint: Seconds,
    pub current_bench_stint: Seconds,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum PlayerStatus {
    OnCourt,
    OnBench,
    Removed,
}

/// A point-in-time, immutable view handed to the planner and to callers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RosterSnapshot {
    pub court: Vec<String>,
    pub bench: Vec<String>,
    pub removed: Vec<String>,
    pub timings: HashMap<String, PlayerTiming>,
}

impl RosterSnapshot {
    pub fn eligible(&self) -> Vec<String> {
        self.court.iter().chain(self.bench.iter()).cloned().collect()
    }
}

/// What a repair pass actually did, returned for observability (§4.2: "Repair
/// is idempotent and logged").
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RepairReport {
    pub spilled_to_bench: Vec<String>,
    pub pulled_from_bench: Vec<String>,
    pub duplicates_expelled: Vec<String>,
}

impl RepairReport {
    pub fn is_empty(&self) -> bool {
        self.spilled_to_bench.is_empty()
            && self.pulled_from_bench.is_empty()
            && self.duplicates_expelled.is_empty()
    }
}

/// Authoritative membership + timing store. Order of `order` is the original
/// roster order; all other collections are keyed by player id.
pub struct RosterStore {
    order: Vec<String>,
    statuses: HashMap<String, PlayerStatus>,
    timings: HashMap<String, PlayerTiming>,
    field_spots: usize,
}

impl RosterStore {
    pub fn new() -> Self {
        Self {
            order: Vec::new(),
            statuses: HashMap::new(),
            timings: HashMap::new(),
            field_spots: 0,
        }
    }

    /// Set the initial roster: the first `field_spots` players go on court,
    /// the rest to bench.
    pub fn set_initial(&mut self, roster: &[Player], field_spots: usize) -> Result<(), EngineError> {
        if roster.len() < field_spots {
            return Err(EngineError::InsufficientPlayers {
                required: field_spots,
                available: roster.len(),
            });
        }

        self.order = roster.iter().map(|p| p.id.clone()).collect();
        self.field_spots = field_spots;
        self.statuses.clear();
        self.timings.clear();

        for (i, p) in roster.iter().enumerate() {
            let status = if i < field_spots {
                PlayerStatus::OnCourt
            } else {
                PlayerStatus::OnBench
            };
            self.statuses.insert(p.id.clone(), status);
            self.timings.insert(p.id.clone(), PlayerTiming::default());
        }

        Ok(())
    }

    pub fn field_spots(&self) -> usize {
        self.field_spots
    }

    pub fn status_of(&self, id: &str) -> Option<PlayerStatus> {
        self.statuses.get(id).copied()
    }

    pub fn timing_of(&self, id: &str) -> Option<PlayerTiming> {
        self.timings.get(id).copied()
    }

    pub fn court(&self) -> Vec<String> {
        self.ids_with_status(PlayerStatus::OnCourt)
    }

    pub fn bench(&self) -> Vec<String> {
        self.ids_with_status(PlayerStatus::OnBench)
    }

    pub fn removed(&self) -> Vec<String> {
        self.ids_with_status(PlayerStatus::Removed)
    }

    fn ids_with_status(&self, status: PlayerStatus) -> Vec<String> {
        self.order
            .iter()
            .filter(|id| self.statuses.get(*id) == Some(&status))
            .cloned()
            .collect()
    }

    pub fn eligible_count(&self) -> usize {
        self.order
            .iter()
            .filter(|id| self.statuses.get(*id) != Some(&PlayerStatus::Removed))
            .count()
    }

    pub fn snapshot(&self) -> RosterSnapshot {
        RosterSnapshot {
            court: self.court(),
            bench: self.bench(),
            removed: self.removed(),
            timings: self.timings.clone(),
        }
    }

    /// Move a player to court, clearing its bench stint.
    pub fn move_to_court(&mut self, id: &str) {
        self.statuses.insert(id.to_string(), PlayerStatus::OnCourt);
        if let Some(t) = self.timings.get_mut(id) {
            t.current_bench_stint = 0;
        }
        self.validate_and_repair();
    }

    /// Move a player to bench, clearing its court stint.
    pub fn move_to_bench(&mut self, id: &str) {
        self.statuses.insert(id.to_string(), PlayerStatus::OnBench);
        if let Some(t) = self.timings.get_mut(id) {
            t.current_court_stint = 0;
        }
        self.validate_and_repair();
    }

    /// Remove a player from play. Fails if doing so would drop eligible
    /// count below `field_spots`.
    pub fn remove(&mut self, id: &str) -> Result<(), EngineError> {
        let remaining = self.eligible_count().saturating_sub(1);
        if remaining < self.field_spots {
            return Err(EngineError::InsufficientPlayers {
                required: self.field_spots,
                available: remaining,
            });
        }

        self.statuses.insert(id.to_string(), PlayerStatus::Removed);
        if let Some(t) = self.timings.get_mut(id) {
            t.current_court_stint = 0;
            t.current_bench_stint = 0;
        }
        self.validate_and_repair();
        Ok(())
    }

    /// Reinstate a Removed player onto the bench; timings are preserved.
    pub fn reinstate(&mut self, id: &str) {
        if self.statuses.get(id) == Some(&PlayerStatus::Removed) {
            self.statuses.insert(id.to_string(), PlayerStatus::OnBench);
        }
        self.validate_and_repair();
    }

    /// Advance one simulated second: court players accrue playing time and
    /// stint, bench players accrue bench time and stint (tick protocol step
    /// 1, spec.md §4.6).
    pub fn accrue_one_second(&mut self) {
        for id in self.order.clone() {
            let status = self.statuses.get(&id).copied();
            if let Some(timing) = self.timings.get_mut(&id) {
                match status {
                    Some(PlayerStatus::OnCourt) => {
                        timing.total_time_played += 1;
                        timing.current_court_stint += 1;
                    }
                    Some(PlayerStatus::OnBench) => {
                        timing.total_bench_time += 1;
                        timing.current_bench_stint += 1;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Apply `delta` seconds of accrual at once (clock catch-up path).
    pub fn accrue_seconds(&mut self, delta: Seconds) {
        for id in self.order.clone() {
            let status = self.statuses.get(&id).copied();
            if let Some(timing) = self.timings.get_mut(&id) {
                match status {
                    Some(PlayerStatus::OnCourt) => {
                        timing.total_time_played += delta;
                        timing.current_court_stint += delta;
                    }
                    Some(PlayerStatus::OnBench) => {
                        timing.total_bench_time += delta;
                        timing.current_bench_stint += delta;
                    }
                    _ => {}
                }
            }
        }
    }

    /// Execute a confirmed substitution atomically: off-players to bench,
    /// on-players to court. All status/stint changes for the whole batch
    /// are applied before a single `validate_and_repair()` pass runs, so an
    /// intermediate over/under-fill never triggers a repair that would
    /// undo part of the swap.
    pub fn apply_rotation(&mut self, off: &[String], on: &[String]) {
        for id in off {
            self.statuses.insert(id.clone(), PlayerStatus::OnBench);
            if let Some(t) = self.timings.get_mut(id) {
                t.current_court_stint = 0;
            }
        }
        for id in on {
            self.statuses.insert(id.clone(), PlayerStatus::OnCourt);
            if let Some(t) = self.timings.get_mut(id) {
                t.current_bench_stint = 0;
            }
        }
        self.validate_and_repair();
    }

    /// Validate I1–I3 and repair in place if violated. Idempotent: calling
    /// it twice in a row without further mutation is a no-op the second
    /// time.
    pub fn validate_and_repair(&mut self) -> RepairReport {
        let mut report = RepairReport::default();

        let mut court = self.court();
        let bench_set: std::collections::HashSet<String> = self.bench().into_iter().collect();

        // I2: expel any id that is somehow in both sets (shouldn't happen
        // given single-writer status map, but guards against bad input).
        let mut seen = std::collections::HashSet::new();
        court.retain(|id| {
            if bench_set.contains(id) || !seen.insert(id.clone()) {
                report.duplicates_expelled.push(id.clone());
                false
            } else {
                true
            }
        });

        // I1: exact field-size on court. Spill extras to bench.
        while court.len() > self.field_spots {
            if let Some(extra) = court.pop() {
                self.statuses.insert(extra.clone(), PlayerStatus::OnBench);
                if let Some(t) = self.timings.get_mut(&extra) {
                    t.current_court_stint = 0;
                }
                report.spilled_to_bench.push(extra);
            }
        }

        // Pull least-played bench player(s) in when under-filled.
        while court.len() < self.field_spots {
            let mut bench_candidates: Vec<String> = self
                .order
                .iter()
                .filter(|id| self.statuses.get(*id) == Some(&PlayerStatus::OnBench))
                .filter(|id| !court.contains(id))
                .cloned()
                .collect();

            bench_candidates.sort_by_key(|id| {
                self.timings
                    .get(id)
                    .map(|t| t.total_time_played)
                    .unwrap_or(Seconds::MAX)
            });

            match bench_candidates.into_iter().next() {
                Some(pulled) => {
                    self.statuses.insert(pulled.clone(), PlayerStatus::OnCourt);
                    if let Some(t) = self.timings.get_mut(&pulled) {
                        t.current_bench_stint = 0;
                    }
                    court.push(pulled.clone());
                    report.pulled_from_bench.push(pulled);
                }
                None => break, // no eligible bench players left; caller must add more
            }
        }

        if !report.is_empty() {
            warn!("roster repair applied: {report:?}");
        } else {
            debug!("roster repair pass: no violations found");
        }

        report
    }
}

impl Default for RosterStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster(n: usize) -> Vec<Player> {
        (0..n).map(|i| Player::new(format!("p{i}"))).collect()
    }

    #[test]
    fn set_initial_splits_court_and_bench() {
        let mut store = RosterStore::new();
        store.set_initial(&roster(8), 5).unwrap();
        assert_eq!(store.court().len(), 5);
        assert_eq!(store.bench().len(), 3);
        assert_eq!(store.removed().len(), 0);
    }

    #[test]
    fn set_initial_rejects_too_few_players() {
        let mut store = RosterStore::new();
        let err = store.set_initial(&roster(4), 5).unwrap_err();
        assert!(matches!(err, EngineError::InsufficientPlayers { .. }));
    }

    #[test]
    fn apply_rotation_swaps_membership() {
        let mut store = RosterStore::new();
        store.set_initial(&roster(8), 5).unwrap();
        let off = vec!["p0".to_string()];
        let on = vec!["p5".to_string()];
        store.apply_rotation(&off, &on);
        assert!(store.bench().contains(&"p0".to_string()));
        assert!(store.court().contains(&"p5".to_string()));
        assert_eq!(store.court().len(), 5);
    }

    #[test]
    fn accrue_one_second_updates_the_right_pool() {
        let mut store = RosterStore::new();
        store.set_initial(&roster(7), 5).unwrap();
        store.accrue_one_second();
        for id in store.court() {
            let t = store.timing_of(&id).unwrap();
            assert_eq!(t.total_time_played, 1);
            assert_eq!(t.current_court_stint, 1);
            assert_eq!(t.current_bench_stint, 0);
        }
        for id in store.bench() {
            let t = store.timing_of(&id).unwrap();
            assert_eq!(t.total_bench_time, 1);
            assert_eq!(t.current_bench_stint, 1);
        }
    }

    #[test]
    fn remove_fails_when_it_would_go_below_field_spots() {
        let mut store = RosterStore::new();
        store.set_initial(&roster(5), 5).unwrap();
        let err = store.remove("p0").unwrap_err();
        assert!(matches!(err, EngineError::InsufficientPlayers { .. }));
    }

    #[test]
    fn remove_then_reinstate_preserves_timings_on_bench() {
        let mut store = RosterStore::new();
        store.set_initial(&roster(8), 5).unwrap();
        store.accrue_one_second();
        let before = store.timing_of("p6").unwrap();

        store.remove("p6").unwrap();
        assert_eq!(store.status_of("p6"), Some(PlayerStatus::Removed));

        store.reinstate("p6");
        assert_eq!(store.status_of("p6"), Some(PlayerStatus::OnBench));
        assert_eq!(store.timing_of("p6").unwrap(), before);
    }

    #[test]
    fn validate_and_repair_spills_overfilled_court() {
        let mut store = RosterStore::new();
        store.set_initial(&roster(8), 5).unwrap();
        // Force an invariant violation directly on the status map.
        store.statuses.insert("p5".to_string(), PlayerStatus::OnCourt);
        let report = store.validate_and_repair();
        assert_eq!(store.court().len(), 5);
        assert!(!report.spilled_to_bench.is_empty());
    }

    #[test]
    fn validate_and_repair_is_idempotent() {
        let mut store = RosterStore::new();
        store.set_initial(&roster(8), 5).unwrap();
        let first = store.validate_and_repair();
        assert!(first.is_empty());
        let second = store.validate_and_repair();
        assert!(second.is_empty());
    }
}

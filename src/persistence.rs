//! Plain serializable snapshot types exposed to external collaborators
//! (spec.md §6). The engine never performs I/O with these itself — saving
//! and restoring them is the host application's job.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{GameConfig, Seconds};
use crate::plan::Rotation;
use crate::roster::Player;

/// Home/away scoring, carried alongside rotation data but governed by its
/// own commands (`updatePlayerScore`, `updateOppositionScore`).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Scoring {
    pub home: i32,
    pub away: i32,
    pub home_team_name: String,
    pub away_team_name: String,
    pub player_points: HashMap<String, i32>,
    pub top_scorers: Vec<String>,
}

/// Pure data object delivered to subscribers on every `onUpdate` (spec.md §6).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameStateSnapshot {
    pub current_time: Seconds,
    pub current_period: u32,
    pub period_elapsed: Seconds,
    pub running: bool,
    pub paused: bool,
    pub game_over: bool,
    pub court: Vec<String>,
    pub bench: Vec<String>,
    pub removed: Vec<String>,
    pub minutes: HashMap<String, Seconds>,
    pub bench_minutes: HashMap<String, Seconds>,
    pub positions: HashMap<String, String>,
    pub goalkeeper: Option<String>,
    pub pending_rotation: Option<Rotation>,
    pub next_scheduled_rotation: Option<Rotation>,
    pub rotation_history_count: usize,
    pub remaining_rotations: usize,
    pub variance: Seconds,
    pub target_minutes: Seconds,
    pub scoring: Scoring,
}

/// Per-player line in the end-of-game report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlayerFinalLine {
    pub minutes: Seconds,
    pub bench_minutes: Seconds,
    /// Percentage of `targetMinutes` actually played, rounded to an integer.
    pub percentage: u32,
    pub goals: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FinalStats {
    pub players: HashMap<String, PlayerFinalLine>,
    pub variance: Seconds,
    pub rotations: usize,
    pub average_minutes: Seconds,
    pub max_minutes: Seconds,
    pub min_minutes: Seconds,
    pub goalkeeper: Option<String>,
}

/// Auto-save payload. Restore is valid within 24h of `timestamp`; older
/// snapshots are discarded by the host (the engine does not enforce this —
/// it is a consumer-side policy over a value this crate only produces).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedSnapshot {
    pub timestamp: DateTime<Utc>,
    pub config: GameConfig,
    pub state: GameStateSnapshot,
    pub players: Vec<Player>,
    pub rotations: Vec<Rotation>,
    pub scoring: Scoring,
}

impl PersistedSnapshot {
    /// Restore is valid within 24h of `timestamp` (spec.md §6); older
    /// snapshots should be discarded by the host. The engine does not
    /// enforce this itself — it only exposes the check.
    pub fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.timestamp) <= Duration::hours(24)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_is_fresh_within_24_hours() {
        let timestamp = Utc::now();
        let snap = PersistedSnapshot {
            timestamp,
            config: GameConfig::new(600, 4, 5, crate::config::Sport::Basketball),
            state: dummy_state(),
            players: Vec::new(),
            rotations: Vec::new(),
            scoring: Scoring::default(),
        };
        assert!(snap.is_fresh(timestamp + Duration::hours(24)));
        assert!(!snap.is_fresh(timestamp + Duration::hours(24) + Duration::seconds(1)));
    }

    #[test]
    fn snapshot_round_trips_through_json() {
        let timestamp = Utc::now();
        let snap = PersistedSnapshot {
            timestamp,
            config: GameConfig::new(600, 4, 5, crate::config::Sport::Basketball),
            state: dummy_state(),
            players: vec![Player::new("p0")],
            rotations: Vec::new(),
            scoring: Scoring::default(),
        };
        let json = serde_json::to_string(&snap).unwrap();
        let restored: PersistedSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, snap);
    }

    fn dummy_state() -> GameStateSnapshot {
        GameStateSnapshot {
            current_time: 0,
            current_period: 1,
            period_elapsed: 0,
            running: false,
            paused: false,
            game_over: false,
            court: Vec::new(),
            bench: Vec::new(),
            removed: Vec::new(),
            minutes: HashMap::new(),
            bench_minutes: HashMap::new(),
            positions: HashMap::new(),
            goalkeeper: None,
            pending_rotation: None,
            next_scheduled_rotation: None,
            rotation_history_count: 0,
            remaining_rotations: 0,
            variance: 0,
            target_minutes: 0,
            scoring: Scoring::default(),
        }
    }
}

//! Subscriber callbacks (spec.md §4.6). The engine holds a list of
//! subscribers and never holds a reference back to them — it only emits.

use crate::config::Seconds;
use crate::persistence::{FinalStats, GameStateSnapshot, Scoring};
use crate::plan::Rotation;
use crate::recovery::RecoveryOutcome;

/// Info delivered on `onPeriodEnd`: which period just closed and how much
/// overflow time carried into the next one.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeriodEndInfo {
    pub ended_period: u32,
    pub carry_over_seconds: Seconds,
}

/// All methods default to a no-op so implementors only override what they
/// care about (mirrors the teacher's notification-handler pattern).
pub trait EventSubscriber {
    fn on_update(&mut self, _state: &GameStateSnapshot) {}
    fn on_rotation(&mut self, _pending: &Rotation) {}
    fn on_warning(&mut self, _seconds_remaining: Seconds) {}
    fn on_early_warning(&mut self, _seconds_remaining: Seconds) {}
    fn on_period_end(&mut self, _info: PeriodEndInfo) {}
    fn on_game_end(&mut self, _stats: &FinalStats) {}
    fn on_recovery(&mut self, _info: &RecoveryOutcome) {}
    fn on_error(&mut self, _message: &str) {}
    fn on_score_update(&mut self, _scoring: &Scoring) {}
}

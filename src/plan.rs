//! `Rotation` and `Plan` (spec.md §3): the ordered substitution schedule
//! produced by the Urgency Planner and rewritten by the Recovery Controller.

use serde::{Deserialize, Serialize};

use crate::config::Seconds;
use crate::planner::RotationReason;

/// Contract: `|off| == |on| >= 1`. Immutable once recorded into history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rotation {
    pub time: Seconds,
    pub off: Vec<String>,
    pub on: Vec<String>,
    pub reason: RotationReason,
}

/// Ordered sequence of rotations by strictly increasing time, plus the
/// next-to-execute index. Only the suffix beyond `current_index` is
/// binding — the prefix is history.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Plan {
    pub rotations: Vec<Rotation>,
    pub current_index: usize,
}

impl Plan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_scheduled(&self) -> Option<&Rotation> {
        self.rotations.get(self.current_index)
    }

    pub fn remaining(&self) -> usize {
        self.rotations.len().saturating_sub(self.current_index)
    }

    pub fn advance(&mut self) {
        self.current_index += 1;
    }

    /// Replace everything from `current_index` onward with `new_tail`,
    /// discarding any rotation with `time <= at_or_before`.
    pub fn replace_tail(&mut self, at_or_before: Seconds, new_tail: Vec<Rotation>) {
        self.rotations.truncate(self.current_index);
        self.rotations
            .extend(new_tail.into_iter().filter(|r| r.time > at_or_before));
    }

    pub fn history(&self) -> &[Rotation] {
        &self.rotations[..self.current_index.min(self.rotations.len())]
    }
}

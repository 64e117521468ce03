use thiserror::Error;

use crate::roster::RepairReport;

/// One violation found while validating a `SetupInput`.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ValidationViolation {
    pub field: String,
    pub message: String,
}

impl ValidationViolation {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Why a `CatchUpRejected` fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum CatchUpRejectReason {
    /// Delta was zero or negative, or the game was already over.
    NonPositiveOrGameOver,
    /// Delta exceeded `maxCatchup` (3600s) and was treated as stale.
    Stale,
}

/// The full error taxonomy from the design (spec.md §7).
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    #[error("setup is invalid: {0:?}")]
    Validation(Vec<ValidationViolation>),

    #[error("fewer than {required} eligible players ({available} available)")]
    InsufficientPlayers { required: usize, available: usize },

    #[error("rotation at t={time} referenced players outside the expected court/bench sets")]
    RotationRejection { time: u32 },

    #[error("roster invariant violated and repaired: {0:?}")]
    InvariantViolation(RepairReport),

    #[error("tick error: {0}")]
    TickError(String),

    #[error("catch-up rejected: {0:?}")]
    CatchUpRejected(CatchUpRejectReason),

    #[error("no rotation is pending")]
    NoPendingRotation,

    #[error("the engine has already ended")]
    GameOver,

    #[error("the engine is not running")]
    NotRunning,
}

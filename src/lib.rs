// Rotation Planning & Enforcement Engine
// Copyright (c) 2026

// Modules
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod plan;
pub mod planner;
pub mod persistence;
pub mod recovery;
pub mod roster;
pub mod setup;
pub mod solver;
pub mod variance;

pub use config::{GameConfig, Seconds, Sport};
pub use engine::{Engine, EventSubscriber};
pub use error::EngineError;
pub use plan::{Plan, Rotation};
pub use planner::RotationReason;
pub use setup::{PeriodFormat, SetupInput};

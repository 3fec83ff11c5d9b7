//! Tabular Q-learning for an agent crossing a warehouse floor.
//!
//! [`warehouse::Warehouse`] is the environment, [`learning::learning_agent::QLearningAgent`]
//! the learner, [`simulation::Simulation`] the step/episode loop and
//! [`engine::SimulationEngine`] drives that loop on a timer for live observers.

pub mod config;
pub mod engine;
pub mod error;
pub mod learning;
pub mod simulation;
pub mod stats;
pub mod warehouse;
pub mod window;

pub use config::{Config, QLearningParams, SimulationConfig, WarehouseConfig};
pub use engine::SimulationEngine;
pub use error::{Error, Result};
pub use simulation::{Simulation, SimulationState};
pub use stats::{EpisodeResult, LearningStats, Trend};
pub use warehouse::{CellKind, Position, Warehouse};

pub type Int = i32;
pub type UInt = u32;

pub const GOAL_REWARD: f64 = 100.0;
pub const STEP_REWARD: f64 = -1.0;
/// An episode still running after this many steps is cut off and counted as a failure.
pub const MAX_STEPS_PER_EPISODE: UInt = 1000;

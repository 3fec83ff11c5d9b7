use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

use crate::config::{Config, QLearningParams, WarehouseConfig};
use crate::error::Result;
use crate::learning::agent_state::AgentState;
use crate::learning::learning_agent::QLearningAgent;
use crate::learning::q_table::QTable;
use crate::stats::{EpisodeResult, LearningStats};
use crate::warehouse::Warehouse;
use crate::{MAX_STEPS_PER_EPISODE, UInt};

pub const DEFAULT_SPEED_MS: u64 = 200;

/// Counters and run flags, as handed to observers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationState {
    pub is_running: bool,
    pub is_paused: bool,
    /// Milliseconds between steps.
    pub speed: u64,
    /// Starts at 1; bumped when an episode completes.
    pub episode: UInt,
    /// Steps taken in the current episode.
    pub step: UInt,
    /// Reward collected in the current episode.
    pub total_reward: f64,
}

impl Default for SimulationState {
    fn default() -> Self {
        SimulationState {
            is_running: false,
            is_paused: false,
            speed: DEFAULT_SPEED_MS,
            episode: 1,
            step: 0,
            total_reward: 0.0,
        }
    }
}

/// The step/episode loop without any timer attached.
///
/// `SimulationEngine` drives this on a schedule; it can also be stepped by hand
/// or run episode by episode for headless training.
#[derive(Debug, Clone)]
pub struct Simulation {
    warehouse: Warehouse,
    agent: QLearningAgent,
    agent_state: AgentState,
    state: SimulationState,
    stats: LearningStats,
    seed: Option<u64>,
}

impl Simulation {
    pub fn new(config: &WarehouseConfig, params: &QLearningParams) -> Result<Self> {
        Self::build(config, params, None)
    }

    /// Like [`Simulation::new`], but every agent it creates (including after a
    /// reset) draws from a generator seeded with `seed`.
    pub fn with_seed(config: &WarehouseConfig, params: &QLearningParams, seed: u64) -> Result<Self> {
        Self::build(config, params, Some(seed))
    }

    /// Build from a full [`Config`], taking the step interval from it as well.
    pub fn from_config(config: &Config, seed: Option<u64>) -> Result<Self> {
        config.validate()?;
        let mut sim = Self::build(&config.warehouse, &config.rl, seed)?;
        sim.state.speed = config.simulation.speed_ms;
        Ok(sim)
    }

    fn build(config: &WarehouseConfig, params: &QLearningParams, seed: Option<u64>) -> Result<Self> {
        let warehouse = Warehouse::new(config)?;
        let agent = new_agent(&warehouse, params, seed)?;
        info!(
            "Simulation created: {}x{} grid, start {}, goal {}",
            warehouse.width(),
            warehouse.height(),
            warehouse.start(),
            warehouse.goal()
        );
        Ok(Simulation {
            agent_state: AgentState::at(warehouse.start()),
            warehouse,
            agent,
            state: SimulationState::default(),
            stats: LearningStats::new(),
            seed,
        })
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn agent_state(&self) -> AgentState {
        self.agent_state
    }

    pub fn state(&self) -> SimulationState {
        self.state.clone()
    }

    pub fn snapshot(&self) -> (AgentState, SimulationState) {
        (self.agent_state(), self.state())
    }

    pub fn exploration_rate(&self) -> f64 {
        self.agent.exploration_rate()
    }

    pub fn learning_stats(&self) -> LearningStats {
        self.stats.clone()
    }

    pub fn q_table(&self) -> QTable {
        self.agent.q_table().clone()
    }

    pub(crate) fn state_mut(&mut self) -> &mut SimulationState {
        &mut self.state
    }

    /// Advance one step. Returns the episode result if this step finished one.
    pub fn step(&mut self) -> Option<EpisodeResult> {
        let position = self.agent_state.position;
        let action = self.agent.choose_action(position);
        let transition = self.agent.take_action(position, action);

        self.agent_state.move_to(transition.new_position);
        self.state.step += 1;
        self.state.total_reward += transition.reward;

        if transition.done || self.state.step > MAX_STEPS_PER_EPISODE {
            Some(self.complete_episode())
        } else {
            None
        }
    }

    /// Step until the current episode finishes.
    pub fn run_episode(&mut self) -> EpisodeResult {
        loop {
            if let Some(result) = self.step() {
                return result;
            }
        }
    }

    fn complete_episode(&mut self) -> EpisodeResult {
        // Checked against the position, not the `done` flag, so a capped
        // episode counts as a failure.
        let success = self.warehouse.is_goal(self.agent_state.position);
        let result = EpisodeResult {
            episode: self.state.episode,
            steps: self.state.step,
            success,
            total_reward: self.state.total_reward,
        };
        if !success {
            warn!(
                "Episode {} truncated after {} steps",
                result.episode, result.steps
            );
        }
        self.stats.record(result.clone());

        self.agent_state = AgentState::at(self.warehouse.start());
        self.state.step = 0;
        self.state.episode += 1;
        self.state.total_reward = 0.0;

        self.agent.decay_exploration();
        debug!(
            "Episode {} done: steps={} success={} reward={:.1} epsilon={:.4}",
            result.episode,
            result.steps,
            result.success,
            result.total_reward,
            self.agent.exploration_rate()
        );
        result
    }

    /// Back to the start with a brand-new agent on default hyperparameters.
    ///
    /// Counters and statistics are cleared; the configured speed is kept.
    pub fn reset(&mut self) -> Result<()> {
        self.agent = new_agent(&self.warehouse, &QLearningParams::default(), self.seed)?;
        self.agent_state = AgentState::at(self.warehouse.start());
        self.state = SimulationState {
            speed: self.state.speed,
            ..SimulationState::default()
        };
        self.stats = LearningStats::new();
        Ok(())
    }
}

fn new_agent(
    warehouse: &Warehouse,
    params: &QLearningParams,
    seed: Option<u64>,
) -> Result<QLearningAgent> {
    match seed {
        Some(seed) => QLearningAgent::with_seed(warehouse.clone(), params, seed),
        None => QLearningAgent::new(warehouse.clone(), params),
    }
}

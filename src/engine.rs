use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use log::info;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Duration, Instant, MissedTickBehavior};

use crate::config::{QLearningParams, WarehouseConfig};
use crate::error::{Error, Result};
use crate::learning::agent_state::AgentState;
use crate::learning::q_table::QTable;
use crate::simulation::{Simulation, SimulationState};
use crate::stats::LearningStats;

/// Observer called once per step with copies of the agent and counters.
type OnUpdate = Box<dyn FnMut(AgentState, SimulationState) + Send + 'static>;

struct Shared {
    sim: Simulation,
    on_update: Option<OnUpdate>,
    /// Bumped whenever the ticker is cancelled or replaced. A ticker that sees a
    /// different generation than the one it was spawned with must not step.
    generation: u64,
}

impl Shared {
    fn tick(&mut self) {
        self.sim.step();
        let (agent, state) = self.sim.snapshot();
        if let Some(on_update) = self.on_update.as_mut() {
            on_update(agent, state);
        }
    }
}

/// Runs a [`Simulation`] on a recurring timer: Idle, Running or Paused.
///
/// Steps are taken by a single Tokio task. Control calls (`start`, `pause`,
/// `reset`, `set_speed`) take the same lock as a step, so they always land
/// between steps, and once `pause` or `reset` returns no further step runs.
/// The update callback runs under that lock: it must not call back into the
/// engine.
pub struct SimulationEngine {
    shared: Arc<Mutex<Shared>>,
    ticker: Option<JoinHandle<()>>,
}

impl SimulationEngine {
    pub fn new(config: &WarehouseConfig, params: &QLearningParams) -> Result<Self> {
        Ok(Self::from_simulation(Simulation::new(config, params)?))
    }

    pub fn from_simulation(sim: Simulation) -> Self {
        SimulationEngine {
            shared: Arc::new(Mutex::new(Shared {
                sim,
                on_update: None,
                generation: 0,
            })),
            ticker: None,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        lock(&self.shared)
    }

    /// Begin stepping at the configured speed. Restarting while running
    /// replaces the timer rather than adding a second one.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start<F>(&mut self, on_update: F) -> Result<()>
    where
        F: FnMut(AgentState, SimulationState) + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
        let arc = Arc::clone(&self.shared);
        let mut shared = lock(&arc);
        shared.on_update = Some(Box::new(on_update));
        let state = shared.sim.state_mut();
        state.is_running = true;
        state.is_paused = false;
        let speed = state.speed;
        self.respawn(&mut shared, &handle, speed);
        info!("Simulation started, one step every {speed} ms");
        Ok(())
    }

    /// Stop stepping and keep all progress.
    pub fn pause(&mut self) {
        let arc = Arc::clone(&self.shared);
        let mut shared = lock(&arc);
        self.cancel(&mut shared);
        let state = shared.sim.state_mut();
        state.is_running = false;
        state.is_paused = true;
        info!("Simulation paused at episode {} step {}", state.episode, state.step);
    }

    /// Stop stepping and start over with a fresh agent on default hyperparameters.
    pub fn reset(&mut self) -> Result<()> {
        let arc = Arc::clone(&self.shared);
        let mut shared = lock(&arc);
        self.cancel(&mut shared);
        shared.sim.reset()?;
        info!("Simulation reset");
        Ok(())
    }

    /// Change the step interval, keeping the registered callback. While
    /// running the timer is rescheduled; while idle or paused nothing starts.
    pub fn set_speed(&mut self, speed_ms: u64) -> Result<()> {
        self.reschedule(speed_ms, None)
    }

    /// Like [`SimulationEngine::set_speed`], also replacing the callback.
    pub fn set_speed_with<F>(&mut self, speed_ms: u64, on_update: F) -> Result<()>
    where
        F: FnMut(AgentState, SimulationState) + Send + 'static,
    {
        self.reschedule(speed_ms, Some(Box::new(on_update)))
    }

    fn reschedule(&mut self, speed_ms: u64, on_update: Option<OnUpdate>) -> Result<()> {
        if speed_ms == 0 {
            return Err(Error::InvalidSpeed);
        }
        let arc = Arc::clone(&self.shared);
        let mut shared = lock(&arc);
        shared.sim.state_mut().speed = speed_ms;
        if let Some(on_update) = on_update {
            shared.on_update = Some(on_update);
        }
        if shared.sim.state().is_running {
            let handle = Handle::try_current().map_err(|_| Error::NoRuntime)?;
            self.respawn(&mut shared, &handle, speed_ms);
        }
        info!("Simulation speed set to {speed_ms} ms");
        Ok(())
    }

    /// Cancel any outstanding timer. Safe to call any number of times.
    pub fn cleanup(&mut self) {
        let arc = Arc::clone(&self.shared);
        let mut shared = lock(&arc);
        self.cancel(&mut shared);
    }

    pub fn is_running(&self) -> bool {
        self.lock().sim.state().is_running
    }

    pub fn current_agent(&self) -> AgentState {
        self.lock().sim.agent_state()
    }

    pub fn simulation_state(&self) -> SimulationState {
        self.lock().sim.state()
    }

    pub fn exploration_rate(&self) -> f64 {
        self.lock().sim.exploration_rate()
    }

    pub fn learning_stats(&self) -> LearningStats {
        self.lock().sim.learning_stats()
    }

    pub fn q_table(&self) -> QTable {
        self.lock().sim.q_table()
    }

    fn cancel(&mut self, shared: &mut Shared) {
        shared.generation += 1;
        if let Some(ticker) = self.ticker.take() {
            ticker.abort();
        }
    }

    fn respawn(&mut self, shared: &mut Shared, handle: &Handle, speed_ms: u64) {
        self.cancel(shared);
        let generation = shared.generation;
        let period = Duration::from_millis(speed_ms);
        let shared = Arc::clone(&self.shared);
        self.ticker = Some(handle.spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                let mut shared = lock(&shared);
                if shared.generation != generation {
                    break;
                }
                shared.tick();
            }
        }));
    }
}

// A panicking observer leaves the simulation between steps, so a poisoned lock
// still guards consistent state.
fn lock(shared: &Mutex<Shared>) -> MutexGuard<'_, Shared> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}

impl Drop for SimulationEngine {
    fn drop(&mut self) {
        self.cleanup();
    }
}

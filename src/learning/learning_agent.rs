use log::trace;
use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::config::QLearningParams;
use crate::error::Result;
use crate::learning::action::Action;
use crate::learning::policy::{Choice, EpsilonGreedy};
use crate::learning::q_table::QTable;
use crate::warehouse::{Position, Warehouse};

/// Result of taking one action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub new_position: Position,
    pub reward: f64,
    pub done: bool,
}

/// Epsilon-greedy tabular Q-learner for a single warehouse.
#[derive(Debug, Clone)]
pub struct QLearningAgent {
    warehouse: Warehouse,
    q_table: QTable,
    learning_rate: f64,
    discount_factor: f64,
    exploration: EpsilonGreedy,
    rng: StdRng,
}

impl QLearningAgent {
    pub fn new(warehouse: Warehouse, params: &QLearningParams) -> Result<Self> {
        Self::with_rng(warehouse, params, StdRng::from_os_rng())
    }

    pub fn with_seed(warehouse: Warehouse, params: &QLearningParams, seed: u64) -> Result<Self> {
        Self::with_rng(warehouse, params, StdRng::seed_from_u64(seed))
    }

    fn with_rng(warehouse: Warehouse, params: &QLearningParams, rng: StdRng) -> Result<Self> {
        params.validate()?;
        Ok(QLearningAgent {
            q_table: QTable::new(&warehouse),
            warehouse,
            learning_rate: params.learning_rate,
            discount_factor: params.discount_factor,
            exploration: EpsilonGreedy::new(
                params.exploration_rate,
                params.min_exploration_rate,
                params.exploration_decay,
            ),
            rng,
        })
    }

    pub fn warehouse(&self) -> &Warehouse {
        &self.warehouse
    }

    pub fn q_table(&self) -> &QTable {
        &self.q_table
    }

    pub fn exploration_rate(&self) -> f64 {
        self.exploration.rate()
    }

    /// With probability epsilon a uniformly random action, otherwise the greedy one.
    pub fn choose_action(&mut self, position: Position) -> Action {
        match self.exploration.choose(&mut self.rng) {
            Choice::Explore => Action::random(&mut self.rng),
            Choice::Exploit => self.greedy_action(position),
        }
    }

    pub fn greedy_action(&self, position: Position) -> Action {
        self.q_table.best_action(&position)
    }

    /// Apply `action` from `position`, learn from the outcome and report it.
    ///
    /// Moving into a wall or obstacle leaves the agent where it is; the step
    /// still costs the usual reward and still updates the table.
    pub fn take_action(&mut self, position: Position, action: Action) -> Transition {
        let new_position = self.warehouse.resolve(position, action);
        let reward = self.warehouse.reward(new_position);
        let done = self.warehouse.is_goal(new_position);

        self.update(position, action, reward, new_position);
        trace!("{position} --{action}--> {new_position} reward={reward}");

        Transition {
            new_position,
            reward,
            done,
        }
    }

    // Q(s,a) <- Q(s,a) + alpha * (r + gamma * max_a' Q(s',a') - Q(s,a))
    fn update(&mut self, state: Position, action: Action, reward: f64, next_state: Position) {
        let current = self.q_table.get(&state, action);
        let max_next = self.q_table.max_value(&next_state);
        let target = reward + self.discount_factor * max_next;
        let value = current + self.learning_rate * (target - current);
        self.q_table.set(state, action, value);
    }

    /// Called once per finished episode.
    pub fn decay_exploration(&mut self) {
        self.exploration.decay();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::WarehouseConfig;
    use crate::error::Error;
    use strum::IntoEnumIterator;

    fn open_floor() -> Warehouse {
        Warehouse::new(&WarehouseConfig {
            width: 10,
            height: 10,
            obstacles: vec![],
            start: Position::new(1, 1),
            goal: Position::new(9, 9),
        })
        .unwrap()
    }

    #[test]
    fn test_single_step_update() {
        let params = QLearningParams::default();
        let mut agent = QLearningAgent::with_seed(open_floor(), &params, 0).unwrap();
        let from = Position::new(1, 1);

        let t = agent.take_action(from, Action::Right);

        assert_eq!(t.new_position, Position::new(2, 1));
        assert_eq!(t.reward, -1.0);
        assert!(!t.done);
        assert_eq!(agent.q_table().get(&from, Action::Right), -params.learning_rate);
        // Other actions untouched.
        assert_eq!(agent.q_table().get(&from, Action::Left), 0.0);
    }

    #[test]
    fn test_wall_bump_updates_in_place() {
        let params = QLearningParams::default();
        let mut agent = QLearningAgent::with_seed(open_floor(), &params, 0).unwrap();
        let corner = Position::new(0, 0);

        let t = agent.take_action(corner, Action::Up);

        assert_eq!(t.new_position, corner);
        assert_eq!(t.reward, -1.0);
        assert!(!t.done);
        assert_eq!(agent.q_table().get(&corner, Action::Up), -0.1);
    }

    #[test]
    fn test_reaching_goal_from_any_side() {
        let params = QLearningParams::default();
        let goal = Position::new(5, 5);
        let warehouse = Warehouse::new(&WarehouseConfig {
            width: 10,
            height: 10,
            obstacles: vec![],
            start: Position::new(0, 0),
            goal,
        })
        .unwrap();
        let mut agent = QLearningAgent::with_seed(warehouse, &params, 0).unwrap();

        for (from, action) in [
            (Position::new(5, 6), Action::Up),
            (Position::new(5, 4), Action::Down),
            (Position::new(6, 5), Action::Left),
            (Position::new(4, 5), Action::Right),
        ] {
            let t = agent.take_action(from, action);
            assert_eq!(t.new_position, goal);
            assert_eq!(t.reward, 100.0);
            assert!(t.done);
        }
    }

    #[test]
    fn test_update_uses_next_state_max() {
        let params = QLearningParams {
            learning_rate: 0.5,
            discount_factor: 0.9,
            ..Default::default()
        };
        let mut agent = QLearningAgent::with_seed(open_floor(), &params, 0).unwrap();
        let next = Position::new(3, 1);
        agent.q_table.set(next, Action::Down, 10.0);
        agent.q_table.set(next, Action::Up, -4.0);

        agent.take_action(Position::new(2, 1), Action::Right);

        // 0 + 0.5 * (-1 + 0.9 * 10 - 0)
        assert_eq!(agent.q_table().get(&Position::new(2, 1), Action::Right), 4.0);
    }

    #[test]
    fn test_greedy_when_not_exploring() {
        let params = QLearningParams {
            exploration_rate: 0.0,
            min_exploration_rate: 0.0,
            ..Default::default()
        };
        let mut agent = QLearningAgent::with_seed(open_floor(), &params, 3).unwrap();
        let p = Position::new(4, 4);

        // All zero: first in order wins.
        assert_eq!(agent.choose_action(p), Action::Up);

        agent.q_table.set(p, Action::Left, 0.5);
        for _ in 0..20 {
            assert_eq!(agent.choose_action(p), Action::Left);
        }
    }

    #[test]
    fn test_full_exploration_hits_every_action() {
        let params = QLearningParams::default();
        let mut agent = QLearningAgent::with_seed(open_floor(), &params, 11).unwrap();
        let p = Position::new(4, 4);
        let seen = (0..200).map(|_| agent.choose_action(p)).collect::<Vec<_>>();
        for action in Action::iter() {
            assert!(seen.contains(&action));
        }
    }

    #[test]
    fn test_decay_exploration() {
        let params = QLearningParams::default();
        let mut agent = QLearningAgent::with_seed(open_floor(), &params, 0).unwrap();
        assert_eq!(agent.exploration_rate(), 1.0);
        agent.decay_exploration();
        assert_eq!(agent.exploration_rate(), 0.995);
        for _ in 0..2000 {
            agent.decay_exploration();
        }
        assert_eq!(agent.exploration_rate(), 0.01);
    }

    #[test]
    fn test_rejects_bad_params() {
        let params = QLearningParams {
            discount_factor: 1.5,
            ..Default::default()
        };
        assert!(matches!(
            QLearningAgent::with_seed(open_floor(), &params, 0),
            Err(Error::InvalidParameter {
                name: "discount_factor",
                ..
            })
        ));
    }
}

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Int;
use crate::error::{Error, Result};
use crate::warehouse::{Position, Warehouse};

/// Grid layout: size, obstacles, start and goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub width: Int,
    pub height: Int,
    #[serde(default)]
    pub obstacles: Vec<Position>,
    pub start: Position,
    pub goal: Position,
}

impl Default for WarehouseConfig {
    /// A 10x10 floor with a handful of walls between the start and the goal.
    fn default() -> Self {
        WarehouseConfig {
            width: 10,
            height: 10,
            start: Position::new(1, 1),
            goal: Position::new(8, 8),
            obstacles: positions(&[
                // vertical wall
                (4, 2),
                (4, 3),
                (4, 4),
                (4, 5),
                // horizontal wall
                (6, 6),
                (7, 6),
                // L-shape
                (2, 7),
                (3, 7),
                (3, 8),
                (7, 2),
                (8, 2),
                (1, 5),
                (2, 5),
                // around the goal
                (6, 8),
                (7, 7),
            ]),
        }
    }
}

impl WarehouseConfig {
    /// A 15x15 floor with longer walls.
    pub fn large() -> Self {
        WarehouseConfig {
            width: 15,
            height: 15,
            start: Position::new(1, 1),
            goal: Position::new(13, 13),
            obstacles: positions(&[
                (5, 2),
                (5, 3),
                (5, 4),
                (5, 5),
                (5, 6),
                (5, 7),
                (8, 8),
                (9, 8),
                (10, 8),
                (11, 8),
                (2, 10),
                (3, 10),
                (4, 10),
                (4, 11),
                (4, 12),
                (12, 3),
                (12, 4),
                (8, 2),
                (9, 2),
                (1, 6),
                (2, 6),
                (11, 11),
                (12, 11),
                (11, 12),
            ]),
        }
    }

    pub fn validate(&self) -> Result<()> {
        Warehouse::new(self).map(|_| ())
    }
}

fn positions(coords: &[(Int, Int)]) -> Vec<Position> {
    coords.iter().copied().map(Position::from).collect()
}

/// Hyperparameters for the tabular learner.
///
/// `exploration_rate` is only the starting value: once an agent is built the
/// rate lives inside the agent and is changed by decay alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QLearningParams {
    pub learning_rate: f64,
    pub discount_factor: f64,
    pub exploration_rate: f64,
    pub min_exploration_rate: f64,
    pub exploration_decay: f64,
}

impl Default for QLearningParams {
    fn default() -> Self {
        QLearningParams {
            learning_rate: 0.1,
            discount_factor: 0.95,
            exploration_rate: 1.0,
            min_exploration_rate: 0.01,
            exploration_decay: 0.995,
        }
    }
}

impl QLearningParams {
    pub fn validate(&self) -> Result<()> {
        check("learning_rate", self.learning_rate, "(0, 1]", |v| {
            v > 0.0 && v <= 1.0
        })?;
        check("discount_factor", self.discount_factor, "[0, 1]", unit)?;
        check("exploration_rate", self.exploration_rate, "[0, 1]", unit)?;
        check(
            "min_exploration_rate",
            self.min_exploration_rate,
            "[0, exploration_rate]",
            |v| unit(v) && v <= self.exploration_rate,
        )?;
        check("exploration_decay", self.exploration_decay, "[0, 1]", unit)
    }
}

fn unit(value: f64) -> bool {
    (0.0..=1.0).contains(&value)
}

fn check(
    name: &'static str,
    value: f64,
    range: &'static str,
    accept: impl Fn(f64) -> bool,
) -> Result<()> {
    // NaN fails every comparison, so it is rejected here too.
    if accept(value) {
        Ok(())
    } else {
        Err(Error::InvalidParameter { name, value, range })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Milliseconds between steps while running.
    pub speed_ms: u64,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        SimulationConfig { speed_ms: 200 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub rl: QLearningParams,
    pub warehouse: WarehouseConfig,
}

impl Config {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|source| Error::ReadConfig {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&contents)
    }

    pub fn validate(&self) -> Result<()> {
        if self.simulation.speed_ms == 0 {
            return Err(Error::InvalidSpeed);
        }
        self.warehouse.validate()?;
        self.rl.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serialization_toml() {
        let config = SimulationConfig { speed_ms: 50 };
        let serialized = toml::to_string(&config).unwrap();

        assert_eq!(serialized, "speed_ms = 50\n");

        let deserialized: SimulationConfig = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized, config);
    }

    #[test]
    fn test_missing_sections_fall_back_to_defaults() {
        let config = Config::from_toml_str("[rl]\nlearning_rate = 0.5\n").unwrap();
        assert_eq!(config.rl.learning_rate, 0.5);
        assert_eq!(config.rl.discount_factor, 0.95);
        assert_eq!(config.simulation, SimulationConfig::default());
        assert_eq!(config.warehouse, WarehouseConfig::default());
    }

    #[test]
    fn test_warehouse_from_toml() {
        let config = Config::from_toml_str(
            r#"
            [warehouse]
            width = 3
            height = 2
            start = { x = 0, y = 0 }
            goal = { x = 2, y = 1 }
            obstacles = [{ x = 1, y = 0 }]
            "#,
        )
        .unwrap();
        assert_eq!(config.warehouse.width, 3);
        assert_eq!(config.warehouse.obstacles, vec![Position::new(1, 0)]);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_from_file() {
        let config = Config::from_file("./warehouse.toml").expect("Failed to read the file");
        assert_eq!(config.warehouse, WarehouseConfig::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            Config::from_file("./does-not-exist.toml"),
            Err(Error::ReadConfig { .. })
        ));
    }

    #[test]
    fn test_default_layouts_are_valid() {
        assert!(WarehouseConfig::default().validate().is_ok());
        assert!(WarehouseConfig::large().validate().is_ok());
        assert_eq!(WarehouseConfig::default().obstacles.len(), 15);
        assert_eq!(WarehouseConfig::large().obstacles.len(), 24);
    }

    #[test]
    fn test_params_validation() {
        assert!(QLearningParams::default().validate().is_ok());

        let bad = [
            QLearningParams {
                learning_rate: 0.0,
                ..Default::default()
            },
            QLearningParams {
                learning_rate: 1.5,
                ..Default::default()
            },
            QLearningParams {
                discount_factor: -0.1,
                ..Default::default()
            },
            QLearningParams {
                exploration_decay: -0.5,
                ..Default::default()
            },
            QLearningParams {
                exploration_rate: f64::NAN,
                ..Default::default()
            },
            QLearningParams {
                exploration_rate: 0.1,
                min_exploration_rate: 0.2,
                ..Default::default()
            },
        ];
        for params in bad {
            assert!(
                matches!(params.validate(), Err(Error::InvalidParameter { .. })),
                "{params:?}"
            );
        }
    }

    #[test]
    fn test_zero_speed_rejected() {
        let config = Config {
            simulation: SimulationConfig { speed_ms: 0 },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(Error::InvalidSpeed)));
    }
}

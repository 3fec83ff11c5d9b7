use std::collections::HashSet;
use std::fmt;

use itertools::Itertools;
use serde::{Deserialize, Serialize};

use crate::config::WarehouseConfig;
use crate::error::{Error, Landmark, Result};
use crate::learning::action::Action;
use crate::{GOAL_REWARD, Int, STEP_REWARD};

/// A cell on the warehouse floor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: Int,
    pub y: Int,
}

impl Position {
    pub fn new(x: Int, y: Int) -> Self {
        Position { x, y }
    }
}

impl From<(Int, Int)> for Position {
    fn from(pair: (Int, Int)) -> Self {
        Position::new(pair.0, pair.1)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CellKind {
    Empty,
    Obstacle,
    Start,
    Goal,
}

/// The environment model: grid geometry, legality, transitions and rewards.
///
/// Built from a validated [`WarehouseConfig`]; every query is a pure function
/// of the layout.
#[derive(Debug, Clone, PartialEq)]
pub struct Warehouse {
    width: Int,
    height: Int,
    obstacles: HashSet<Position>,
    start: Position,
    goal: Position,
}

impl Warehouse {
    /// Validate the layout and build the environment.
    ///
    /// Rejects non-positive dimensions, and a start or goal that is off the
    /// grid or on an obstacle.
    pub fn new(config: &WarehouseConfig) -> Result<Self> {
        if config.width <= 0 || config.height <= 0 {
            return Err(Error::InvalidDimensions {
                width: config.width,
                height: config.height,
            });
        }
        let warehouse = Warehouse {
            width: config.width,
            height: config.height,
            obstacles: config.obstacles.iter().copied().collect(),
            start: config.start,
            goal: config.goal,
        };
        let landmarks = [
            (Landmark::Start, warehouse.start),
            (Landmark::Goal, warehouse.goal),
        ];
        for (landmark, position) in landmarks {
            if !warehouse.in_bounds(position) {
                return Err(Error::OutOfBounds {
                    landmark,
                    position,
                    width: warehouse.width,
                    height: warehouse.height,
                });
            }
            if warehouse.obstacles.contains(&position) {
                return Err(Error::OnObstacle { landmark, position });
            }
        }
        Ok(warehouse)
    }

    pub fn width(&self) -> Int {
        self.width
    }

    pub fn height(&self) -> Int {
        self.height
    }

    pub fn start(&self) -> Position {
        self.start
    }

    pub fn goal(&self) -> Position {
        self.goal
    }

    pub fn in_bounds(&self, position: Position) -> bool {
        (0..self.width).contains(&position.x) && (0..self.height).contains(&position.y)
    }

    /// True if the position is on the grid and not an obstacle.
    pub fn is_valid(&self, position: Position) -> bool {
        self.in_bounds(position) && !self.obstacles.contains(&position)
    }

    /// The cell one unit away in the direction of `action`. Not checked for
    /// validity; saturates at the edges of `Int`.
    pub fn next_position(&self, position: Position, action: Action) -> Position {
        let (dx, dy) = action.offset();
        Position::new(position.x.saturating_add(dx), position.y.saturating_add(dy))
    }

    /// Where the agent actually ends up: the neighbouring cell if it is valid,
    /// otherwise the agent stays put.
    pub fn resolve(&self, position: Position, action: Action) -> Position {
        let candidate = self.next_position(position, action);
        if self.is_valid(candidate) {
            candidate
        } else {
            position
        }
    }

    /// Reward for arriving at `position`.
    pub fn reward(&self, position: Position) -> f64 {
        if self.is_goal(position) {
            GOAL_REWARD
        } else {
            STEP_REWARD
        }
    }

    pub fn is_goal(&self, position: Position) -> bool {
        position == self.goal
    }

    pub fn cell_kind(&self, position: Position) -> CellKind {
        if self.obstacles.contains(&position) {
            CellKind::Obstacle
        } else if position == self.start {
            CellKind::Start
        } else if position == self.goal {
            CellKind::Goal
        } else {
            CellKind::Empty
        }
    }

    /// All in-bounds positions, row by row.
    pub fn positions(&self) -> impl Iterator<Item = Position> + '_ {
        (0..self.height)
            .cartesian_product(0..self.width)
            .map(|(y, x)| Position::new(x, y))
    }

    /// Layout of every cell, row by row, for renderers.
    pub fn cells(&self) -> impl Iterator<Item = (Position, CellKind)> + '_ {
        self.positions().map(|p| (p, self.cell_kind(p)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    fn open_floor() -> WarehouseConfig {
        WarehouseConfig {
            width: 5,
            height: 5,
            obstacles: vec![],
            start: Position::new(0, 0),
            goal: Position::new(4, 4),
        }
    }

    #[test]
    fn test_is_valid() {
        let mut config = open_floor();
        config.obstacles = vec![Position::new(2, 2), Position::new(2, 2)];
        let warehouse = Warehouse::new(&config).unwrap();

        assert!(warehouse.is_valid(Position::new(0, 0)));
        assert!(warehouse.is_valid(Position::new(4, 4)));
        assert!(!warehouse.is_valid(Position::new(-1, 0)));
        assert!(!warehouse.is_valid(Position::new(0, 5)));
        assert!(!warehouse.is_valid(Position::new(5, 0)));
        assert!(!warehouse.is_valid(Position::new(2, 2)));
    }

    #[test]
    fn test_next_position_offsets() {
        let warehouse = Warehouse::new(&open_floor()).unwrap();
        let p = Position::new(2, 2);
        assert_eq!(warehouse.next_position(p, Action::Up), Position::new(2, 1));
        assert_eq!(warehouse.next_position(p, Action::Down), Position::new(2, 3));
        assert_eq!(warehouse.next_position(p, Action::Left), Position::new(1, 2));
        assert_eq!(warehouse.next_position(p, Action::Right), Position::new(3, 2));
        // Not checked for validity.
        assert_eq!(
            warehouse.next_position(Position::new(0, 0), Action::Up),
            Position::new(0, -1)
        );
    }

    #[test]
    fn test_resolve_never_leaves_valid_cells() {
        let config = WarehouseConfig::default();
        let warehouse = Warehouse::new(&config).unwrap();
        for position in warehouse.positions().filter(|p| warehouse.is_valid(*p)) {
            for action in Action::iter() {
                let next = warehouse.resolve(position, action);
                assert!(warehouse.is_valid(next), "{position} {action:?} -> {next}");
            }
        }
    }

    #[test]
    fn test_next_position_saturates() {
        let warehouse = Warehouse::new(&open_floor()).unwrap();
        let far = Position::new(Int::MAX, Int::MIN);
        assert_eq!(warehouse.next_position(far, Action::Right), far);
        assert_eq!(warehouse.next_position(far, Action::Up), far);
        assert_eq!(warehouse.resolve(far, Action::Right), far);
        assert!(!warehouse.is_valid(warehouse.next_position(far, Action::Left)));
    }

    #[test]
    fn test_bumping_into_walls_stays_put() {
        let mut config = open_floor();
        config.obstacles = vec![Position::new(1, 0)];
        let warehouse = Warehouse::new(&config).unwrap();

        let corner = Position::new(0, 0);
        assert_eq!(warehouse.resolve(corner, Action::Up), corner);
        assert_eq!(warehouse.resolve(corner, Action::Left), corner);
        assert_eq!(warehouse.resolve(corner, Action::Right), corner);
        assert_eq!(warehouse.reward(warehouse.resolve(corner, Action::Right)), -1.0);
    }

    #[test]
    fn test_reward_depends_on_destination_only() {
        let warehouse = Warehouse::new(&open_floor()).unwrap();
        assert_eq!(warehouse.reward(Position::new(4, 4)), 100.0);
        assert_eq!(warehouse.reward(Position::new(3, 4)), -1.0);
        assert!(warehouse.is_goal(Position::new(4, 4)));
        assert!(!warehouse.is_goal(Position::new(4, 3)));
    }

    #[test]
    fn test_rejects_bad_layouts() {
        let mut config = open_floor();
        config.width = 0;
        assert!(matches!(
            Warehouse::new(&config),
            Err(Error::InvalidDimensions { width: 0, height: 5 })
        ));

        let mut config = open_floor();
        config.goal = Position::new(5, 4);
        assert!(matches!(
            Warehouse::new(&config),
            Err(Error::OutOfBounds {
                landmark: Landmark::Goal,
                ..
            })
        ));

        let mut config = open_floor();
        config.obstacles = vec![Position::new(0, 0)];
        assert!(matches!(
            Warehouse::new(&config),
            Err(Error::OnObstacle {
                landmark: Landmark::Start,
                ..
            })
        ));
    }

    #[test]
    fn test_cells_row_major() {
        let mut config = open_floor();
        config.obstacles = vec![Position::new(1, 0)];
        let warehouse = Warehouse::new(&config).unwrap();
        let cells = warehouse.cells().collect::<Vec<_>>();

        assert_eq!(cells.len(), 25);
        assert_eq!(cells[0], (Position::new(0, 0), CellKind::Start));
        assert_eq!(cells[1], (Position::new(1, 0), CellKind::Obstacle));
        assert_eq!(cells[5].0, Position::new(0, 1));
        assert_eq!(cells[24], (Position::new(4, 4), CellKind::Goal));
    }
}

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::StandardUniform as Standard;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::Int;

/// A unit move on the grid.
///
/// Variant order is the fixed tie-breaking order used by greedy selection.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, EnumIter, Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Action {
    Up,
    Down,
    Left,
    Right,
}

impl Action {
    /// (dx, dy) with y growing downwards.
    pub fn offset(&self) -> (Int, Int) {
        match self {
            Action::Up => (0, -1),
            Action::Down => (0, 1),
            Action::Left => (-1, 0),
            Action::Right => (1, 0),
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Standard.sample(rng)
    }
}

impl Distribution<Action> for Standard {
    fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Action {
        match rng.random_range(0..4) {
            0 => Action::Up,
            1 => Action::Down,
            2 => Action::Left,
            _ => Action::Right,
        }
    }
}

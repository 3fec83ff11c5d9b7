use std::collections::HashMap;

use itertools::Itertools;
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use crate::learning::action::Action;
use crate::warehouse::{Position, Warehouse};

/// Value estimates per (state, action).
///
/// Seeded with `0.0` for all four actions at every in-bounds cell. Entries are
/// only ever overwritten, never removed, so lookups over the grid are total.
#[derive(Debug, Clone, PartialEq)]
pub struct QTable {
    tab: HashMap<Position, ActionValues>,
}

/// One table row: an estimate for each action.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ActionValues {
    pub up: f64,
    pub down: f64,
    pub left: f64,
    pub right: f64,
}

impl ActionValues {
    pub fn get(&self, action: Action) -> f64 {
        match action {
            Action::Up => self.up,
            Action::Down => self.down,
            Action::Left => self.left,
            Action::Right => self.right,
        }
    }

    fn get_mut(&mut self, action: Action) -> &mut f64 {
        match action {
            Action::Up => &mut self.up,
            Action::Down => &mut self.down,
            Action::Left => &mut self.left,
            Action::Right => &mut self.right,
        }
    }

    /// Highest-valued action. Ties go to the earliest in `Action::iter()` order.
    pub fn best_action(&self) -> Action {
        let mut best = Action::Up;
        let mut best_value = self.get(best);
        for action in Action::iter() {
            let value = self.get(action);
            if value > best_value {
                best = action;
                best_value = value;
            }
        }
        best
    }

    pub fn max_value(&self) -> f64 {
        Action::iter()
            .map(|a| self.get(a))
            .fold(f64::NEG_INFINITY, f64::max)
    }
}

impl QTable {
    pub fn new(warehouse: &Warehouse) -> Self {
        let tab = (0..warehouse.width())
            .cartesian_product(0..warehouse.height())
            .map(|(x, y)| (Position::new(x, y), ActionValues::default()))
            .collect();
        QTable { tab }
    }

    pub fn len(&self) -> usize {
        self.tab.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tab.is_empty()
    }

    pub fn row(&self, state: &Position) -> Option<&ActionValues> {
        self.tab.get(state)
    }

    /// Estimate for `(state, action)`. Unknown states read as `0.0`.
    pub fn get(&self, state: &Position, action: Action) -> f64 {
        self.row(state).map_or(0.0, |row| row.get(action))
    }

    pub fn set(&mut self, state: Position, action: Action, value: f64) {
        *self.tab.entry(state).or_default().get_mut(action) = value;
    }

    pub fn best_action(&self, state: &Position) -> Action {
        self.row(state)
            .copied()
            .unwrap_or_default()
            .best_action()
    }

    pub fn max_value(&self, state: &Position) -> f64 {
        self.row(state).copied().unwrap_or_default().max_value()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Position, &ActionValues)> {
        self.tab.iter()
    }
}

/// Rows keyed `"x,y"`, in row-major order.
impl Serialize for QTable {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(
            self.tab
                .iter()
                .sorted_by_key(|(p, _)| (p.y, p.x))
                .map(|(p, row)| (format!("{},{}", p.x, p.y), row)),
        )
    }
}

use serde::{Deserialize, Serialize};

use crate::warehouse::Position;

/// Where the agent is and where it was one step ago.
///
/// The previous position is kept for renderers only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgentState {
    pub position: Position,
    pub previous_position: Position,
}

impl AgentState {
    pub fn at(position: Position) -> Self {
        AgentState {
            position,
            previous_position: position,
        }
    }

    pub fn move_to(&mut self, position: Position) {
        self.previous_position = self.position;
        self.position = position;
    }
}

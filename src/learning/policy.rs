use rand::Rng;
use serde::{Deserialize, Serialize};

/// Outcome of the explore/exploit coin flip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Choice {
    Explore,
    Exploit,
}

/// Epsilon-greedy exploration with a multiplicative, floored decay.
///
/// The rate is owned here and only moves through [`EpsilonGreedy::decay`], so
/// it can never increase.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpsilonGreedy {
    rate: f64,
    min_rate: f64,
    decay: f64,
}

impl EpsilonGreedy {
    pub fn new(rate: f64, min_rate: f64, decay: f64) -> Self {
        EpsilonGreedy {
            rate,
            min_rate,
            decay,
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }

    pub fn choose<R: Rng + ?Sized>(&self, rng: &mut R) -> Choice {
        if rng.random::<f64>() < self.rate {
            Choice::Explore
        } else {
            Choice::Exploit
        }
    }

    /// epsilon <- max(min_rate, epsilon * decay)
    pub fn decay(&mut self) {
        self.rate = self.min_rate.max(self.rate * self.decay);
    }
}

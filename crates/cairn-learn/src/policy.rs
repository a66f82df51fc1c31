//! Learning hyperparameters and epsilon-greedy action selection.

use crate::error::AgentError;
use crate::table::ValueTable;
use cairn_core::{ActionId, StateId};
use rand::Rng;
use serde::{Deserialize, Serialize};

/// Learning-rate, discount, and exploration constants.
///
/// All three must be finite and in `[0, 1]`. They are fixed for an
/// agent's lifetime.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Hyperparameters {
    /// Learning rate α.
    pub alpha: f64,
    /// Discount factor γ.
    pub gamma: f64,
    /// Exploration rate ε.
    pub epsilon: f64,
}

impl Default for Hyperparameters {
    fn default() -> Self {
        Self {
            alpha: 0.5,
            gamma: 0.9,
            epsilon: 0.1,
        }
    }
}

impl Hyperparameters {
    /// Check every parameter is finite and in `[0, 1]`.
    pub fn validate(&self) -> Result<(), AgentError> {
        for (name, value) in [
            ("alpha", self.alpha),
            ("gamma", self.gamma),
            ("epsilon", self.epsilon),
        ] {
            if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                return Err(AgentError::InvalidHyperparameter { name, value });
            }
        }
        Ok(())
    }
}

/// Epsilon-greedy selector over one [`ValueTable`] row.
///
/// With probability `1 - ε` returns the row's greedy action; otherwise
/// an action id drawn uniformly from the table's columns, which may
/// coincide with the greedy one.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PolicyEngine {
    epsilon: f64,
}

impl PolicyEngine {
    /// Create a selector with exploration rate `epsilon`.
    pub fn new(epsilon: f64) -> Self {
        Self { epsilon }
    }

    /// Exploration rate.
    pub fn epsilon(&self) -> f64 {
        self.epsilon
    }

    /// Choose an action for `state`.
    pub fn select<R: Rng + ?Sized>(&self, table: &ValueTable, state: StateId, rng: &mut R) -> ActionId {
        if rng.random::<f64>() < self.epsilon {
            let (_, cols) = table.shape();
            ActionId(rng.random_range(0..cols) as u8)
        } else {
            table.best_action(state).0
        }
    }
}

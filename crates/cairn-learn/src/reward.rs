//! Distance-based reward shaping for goal-seeking learners.

use cairn_core::{euclidean, Direction, Position};
use cairn_space::Grid;

/// One observed transition, as seen by the reward function.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Transition {
    /// Position before the move attempt.
    pub from: Position,
    /// Position after the move attempt (equal to `from` if rejected).
    pub to: Position,
    /// Goal cell.
    pub goal: Position,
    /// Whether `to` is the goal.
    pub reached: bool,
    /// Direction chosen for this transition, whether or not it moved.
    pub direction: Direction,
    /// Direction chosen for the transition before.
    pub previous_direction: Direction,
}

/// Reward shaping constants.
///
/// Terms are additive. Before the goal is reached, closing distance
/// earns `approach` and opening it costs `approach`. Once the goal is
/// reached the distance terms invert, and a heading that reverses the
/// previous one costs `reversal`. Starting from a non-routable cell
/// costs `obstacle`. A transition that does not change position earns
/// no distance term.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RewardShaping {
    /// Magnitude of the distance term.
    pub approach: f64,
    /// Penalty when the transition started on a non-routable cell.
    pub obstacle: f64,
    /// Penalty for reversing direction after reaching the goal.
    pub reversal: f64,
}

impl Default for RewardShaping {
    fn default() -> Self {
        Self {
            approach: 100.0,
            obstacle: 100.0,
            reversal: 1000.0,
        }
    }
}

impl RewardShaping {
    /// Reward for `t` on `grid`.
    pub fn reward(&self, grid: &Grid, t: &Transition) -> f64 {
        let before = euclidean(t.from, t.goal);
        let after = euclidean(t.to, t.goal);
        let mut reward = 0.0;

        if !t.reached {
            if after < before {
                reward += self.approach;
            } else if after > before {
                reward -= self.approach;
            }
        }
        if !grid.is_routable_at(t.from) {
            reward -= self.obstacle;
        }
        if t.reached {
            if after < before {
                reward -= self.approach;
            }
            if t.previous_direction.is_reversed_by(t.direction) {
                reward -= self.reversal;
            }
            if after > before {
                reward += self.approach;
            }
        }
        reward
    }
}

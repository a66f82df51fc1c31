//! Per-tick metrics for the simulation driver.
//!
//! [`StepMetrics`] captures timing and movement counts for a single tick.
//! [`Simulation::run()`](crate::Simulation::run) folds several ticks
//! together with [`absorb()`](StepMetrics::absorb).

use cairn_core::TickId;
use cairn_learn::{MoveResult, TickOutcome};

/// Timing and outcome counts collected during a tick (or a run of ticks).
///
/// Durations are in microseconds.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Last tick covered by these metrics.
    pub tick: TickId,
    /// Wall-clock time for the whole tick.
    pub total_us: u64,
    /// Time spent ticking learners.
    pub learner_us: u64,
    /// Time spent ticking wanderers.
    pub wanderer_us: u64,
    /// Agents that changed cell.
    pub moved: u32,
    /// Agents that chose to stay (or had no move available).
    pub stayed: u32,
    /// Moves rejected for leaving the grid.
    pub out_of_bounds: u32,
    /// Moves rejected by an obstacle or an occupied cell.
    pub blocked: u32,
    /// Learners standing on their goal after the tick.
    pub goals_reached: u32,
    /// Value-table checkpoints written.
    pub checkpoints: u32,
    /// Sum of shaped rewards applied this tick.
    pub reward_sum: f64,
    /// Number of rewards applied (learners past their first tick).
    pub rewarded: u32,
}

impl StepMetrics {
    /// Count one movement result.
    pub fn record_move(&mut self, result: MoveResult) {
        match result {
            MoveResult::Moved => self.moved += 1,
            MoveResult::Stayed => self.stayed += 1,
            MoveResult::OutOfBounds => self.out_of_bounds += 1,
            MoveResult::Blocked => self.blocked += 1,
        }
    }

    /// Count one learner's tick outcome.
    pub fn record_learner(&mut self, outcome: &TickOutcome) {
        self.record_move(outcome.move_result);
        if outcome.goal_reached {
            self.goals_reached += 1;
        }
        if outcome.checkpointed {
            self.checkpoints += 1;
        }
        if let Some(r) = outcome.reward {
            self.reward_sum += r;
            self.rewarded += 1;
        }
    }

    /// Fold a later tick's metrics into this accumulator.
    pub fn absorb(&mut self, other: &StepMetrics) {
        self.tick = self.tick.max(other.tick);
        self.total_us += other.total_us;
        self.learner_us += other.learner_us;
        self.wanderer_us += other.wanderer_us;
        self.moved += other.moved;
        self.stayed += other.stayed;
        self.out_of_bounds += other.out_of_bounds;
        self.blocked += other.blocked;
        self.goals_reached += other.goals_reached;
        self.checkpoints += other.checkpoints;
        self.reward_sum += other.reward_sum;
        self.rewarded += other.rewarded;
    }

    /// Mean reward per applied update, or 0 when none were applied.
    pub fn mean_reward(&self) -> f64 {
        if self.rewarded == 0 {
            0.0
        } else {
            self.reward_sum / f64::from(self.rewarded)
        }
    }
}

//! Dense state × action value table.

use crate::error::TableError;
use cairn_core::{ActionId, StateId, NUM_ACTIONS};
use cairn_space::Grid;

/// Dense `states × actions` table of `f64` value estimates.
///
/// Row `s` holds the estimates for state [`StateId`] `s`; column `a`
/// the estimate for [`ActionId`] `a`. Storage is a single row-major
/// buffer.
#[derive(Clone, Debug, PartialEq)]
pub struct ValueTable {
    rows: usize,
    cols: usize,
    values: Vec<f64>,
}

impl ValueTable {
    /// A zero-initialised table of the given shape.
    pub fn new(rows: usize, cols: usize) -> Result<Self, TableError> {
        if rows == 0 || cols == 0 {
            return Err(TableError::Empty);
        }
        Ok(Self {
            rows,
            cols,
            values: vec![0.0; rows * cols],
        })
    }

    /// A zero-initialised table with one row per grid cell and
    /// [`NUM_ACTIONS`] columns.
    pub fn for_grid(grid: &Grid) -> Self {
        Self {
            rows: grid.cell_count(),
            cols: NUM_ACTIONS,
            values: vec![0.0; grid.cell_count() * NUM_ACTIONS],
        }
    }

    /// Wrap an existing row-major buffer.
    ///
    /// `values.len()` must equal `rows * cols`.
    pub fn from_values(rows: usize, cols: usize, values: Vec<f64>) -> Result<Self, TableError> {
        if rows == 0 || cols == 0 {
            return Err(TableError::Empty);
        }
        if values.len() != rows * cols {
            return Err(TableError::ShapeMismatch {
                expected_rows: rows,
                expected_cols: cols,
                found_rows: values.len() / cols,
                found_cols: cols,
            });
        }
        Ok(Self { rows, cols, values })
    }

    /// `(rows, cols)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// Fail with `ShapeMismatch` unless this table is `rows × cols`.
    pub fn ensure_shape(&self, rows: usize, cols: usize) -> Result<(), TableError> {
        if (self.rows, self.cols) != (rows, cols) {
            return Err(TableError::ShapeMismatch {
                expected_rows: rows,
                expected_cols: cols,
                found_rows: self.rows,
                found_cols: self.cols,
            });
        }
        Ok(())
    }

    /// The whole buffer, row-major.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    /// All estimates for `state`.
    ///
    /// # Panics
    ///
    /// Panics if `state` is out of range.
    pub fn row(&self, state: StateId) -> &[f64] {
        let start = state.0 * self.cols;
        &self.values[start..start + self.cols]
    }

    /// The estimate for `(state, action)`, or `None` out of range.
    pub fn get(&self, state: StateId, action: ActionId) -> Option<f64> {
        self.offset(state, action).map(|i| self.values[i])
    }

    /// Overwrite the estimate for `(state, action)`.
    ///
    /// Returns `false` (and writes nothing) when out of range.
    pub fn set(&mut self, state: StateId, action: ActionId, value: f64) -> bool {
        match self.offset(state, action) {
            Some(i) => {
                self.values[i] = value;
                true
            }
            None => false,
        }
    }

    /// Greedy action for `state` and its estimate.
    ///
    /// Scans the full row; ties resolve to the lowest action id.
    pub fn best_action(&self, state: StateId) -> (ActionId, f64) {
        let row = self.row(state);
        let mut best = 0usize;
        for (a, &v) in row.iter().enumerate().skip(1) {
            if v > row[best] {
                best = a;
            }
        }
        (ActionId(best as u8), row[best])
    }

    /// Largest estimate in the row for `state`.
    pub fn max_value(&self, state: StateId) -> f64 {
        self.best_action(state).1
    }

    /// One-step Q-learning update:
    /// `Q[p][a] ← (1-α)·Q[p][a] + α·(reward + γ·max Q[n])`.
    pub fn update(
        &mut self,
        prev_state: StateId,
        action: ActionId,
        reward: f64,
        next_state: StateId,
        alpha: f64,
        gamma: f64,
    ) {
        let target = reward + gamma * self.max_value(next_state);
        let i = prev_state.0 * self.cols + action.index();
        let q = &mut self.values[i];
        *q = (1.0 - alpha) * *q + alpha * target;
    }

    fn offset(&self, state: StateId, action: ActionId) -> Option<usize> {
        (state.0 < self.rows && action.index() < self.cols)
            .then(|| state.0 * self.cols + action.index())
    }
}

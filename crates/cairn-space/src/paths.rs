//! Path search over the routable cells of a [`Grid`].

use crate::grid::Grid;
use cairn_core::{Direction, Position, StateId};
use std::collections::VecDeque;
use std::sync::Arc;
use tracing::trace;

/// Graph search between two cells of a grid.
///
/// Implementations return the full path from `start` to `goal`
/// inclusive, or an empty vector when `goal` is unreachable (including
/// when either endpoint is not routable).
pub trait PathFinder {
    /// Find a path from `start` to `goal`.
    fn find_path(&self, grid: &Grid, start: Position, goal: Position) -> Vec<Position>;
}

impl<F: PathFinder + ?Sized> PathFinder for Arc<F> {
    fn find_path(&self, grid: &Grid, start: Position, goal: Position) -> Vec<Position> {
        (**self).find_path(grid, start, goal)
    }
}

/// Breadth-first search over the 8-connected routable cells.
///
/// Neighbours are expanded in compass order (North first, clockwise),
/// so among equal-length paths the result is deterministic. Every step
/// costs the same, diagonal or not.
#[derive(Clone, Copy, Debug, Default)]
pub struct BreadthFirst;

impl PathFinder for BreadthFirst {
    fn find_path(&self, grid: &Grid, start: Position, goal: Position) -> Vec<Position> {
        if !grid.is_routable_at(start) || !grid.is_routable_at(goal) {
            return Vec::new();
        }
        if start == goal {
            return vec![start];
        }

        let idx = |p: Position| grid.state_id(p).map(|s| s.0);
        let (Some(start_i), Some(goal_i)) = (idx(start), idx(goal)) else {
            return Vec::new();
        };

        // parent[i] == i marks the root.
        let mut parent: Vec<Option<usize>> = vec![None; grid.cell_count()];
        let mut queue = VecDeque::new();
        parent[start_i] = Some(start_i);
        queue.push_back(start);

        while let Some(cur) = queue.pop_front() {
            let Some(cur_i) = idx(cur) else { continue };
            if cur_i == goal_i {
                break;
            }
            for dir in Direction::COMPASS {
                let next = cur.step(dir);
                if !grid.is_routable_at(next) {
                    continue;
                }
                let Some(next_i) = idx(next) else { continue };
                if parent[next_i].is_none() {
                    parent[next_i] = Some(cur_i);
                    queue.push_back(next);
                }
            }
        }

        if parent[goal_i].is_none() {
            trace!(%start, %goal, "no path");
            return Vec::new();
        }

        let mut path = Vec::new();
        let mut at = goal_i;
        loop {
            if let Some(p) = grid.position_of(StateId(at)) {
                path.push(p);
            }
            match parent[at] {
                Some(prev) if prev != at => at = prev,
                _ => break,
            }
        }
        path.reverse();
        path
    }
}

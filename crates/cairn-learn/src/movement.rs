//! Single-step movement against the grid and the shared index.

use cairn_core::{AgentId, Direction, Position};
use cairn_space::{Entry, Grid, IndexError, Occupancy};
use tracing::debug;

/// What happened to a movement attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MoveResult {
    /// The agent moved to the candidate cell.
    Moved,
    /// The chosen direction was [`Direction::Stay`].
    Stayed,
    /// The candidate cell lies outside the grid.
    OutOfBounds,
    /// The candidate cell is an obstacle or occupied by another agent.
    Blocked,
}

impl MoveResult {
    /// Whether the agent's position changed.
    pub fn moved(self) -> bool {
        matches!(self, MoveResult::Moved)
    }
}

/// Smallest occupancy query radius that still covers every neighbour,
/// diagonals included.
pub const MIN_COLLISION_RADIUS: f64 = std::f64::consts::SQRT_2;

/// The radius actually queried for a configured `collision_radius`.
///
/// Smaller values are raised to [`MIN_COLLISION_RADIUS`] so a diagonal
/// neighbour is never missed.
pub fn query_radius(collision_radius: f64) -> f64 {
    collision_radius.max(MIN_COLLISION_RADIUS)
}

/// Attempt to move agent `id` one step from `from` in `direction`.
///
/// The candidate is rejected if it is outside the grid, not routable, or
/// if any occupant within [`query_radius`] of `from` stands on it. On
/// success the index entry is moved; the caller updates its own copy of
/// the position to `from.step(direction)`.
///
/// Rejections are not errors. The only error is an index contract
/// violation (the agent is not registered).
pub fn try_step(
    id: AgentId,
    from: Position,
    direction: Direction,
    collision_radius: f64,
    grid: &Grid,
    index: &mut dyn Occupancy<AgentId>,
) -> Result<MoveResult, IndexError> {
    if direction == Direction::Stay {
        return Ok(MoveResult::Stayed);
    }
    let candidate = from.step(direction);
    if !grid.contains(candidate) {
        debug!(agent = %id, %from, %candidate, "move rejected: out of bounds");
        return Ok(MoveResult::OutOfBounds);
    }
    if !grid.is_routable_at(candidate) {
        debug!(agent = %id, %from, %candidate, "move rejected: obstacle");
        return Ok(MoveResult::Blocked);
    }
    let on_candidate: &dyn Fn(&Entry<AgentId>) -> bool = &|e| e.position == candidate;
    let occupied = index.explore(from, query_radius(collision_radius), Some(on_candidate));
    if !occupied.is_empty() {
        debug!(agent = %id, %from, %candidate, by = %occupied[0].key, "move rejected: occupied");
        return Ok(MoveResult::Blocked);
    }
    index.move_to(id, candidate)?;
    Ok(MoveResult::Moved)
}

//! Integer grid positions and the planar metrics defined over them.

use crate::direction::Direction;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell on the simulation grid.
///
/// Coordinates are signed so that a candidate move one step past an
/// edge is representable (and then rejected by a bounds check) rather
/// than wrapping around. Equality is exact-coordinate.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    /// Column, growing eastwards.
    pub x: i32,
    /// Row, growing northwards.
    pub y: i32,
}

impl Position {
    /// Construct a position from its coordinates.
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// This position displaced by `(dx, dy)`.
    pub const fn offset(self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }

    /// The cell one step away in `direction` (unchanged for `Stay`).
    pub fn step(self, direction: Direction) -> Self {
        let (dx, dy) = direction.offset();
        self.offset(dx, dy)
    }

    /// Chebyshev (L-inf) distance to `other`.
    pub fn chebyshev(self, other: Self) -> u32 {
        let dx = (self.x - other.x).unsigned_abs();
        let dy = (self.y - other.y).unsigned_abs();
        dx.max(dy)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(i32, i32)> for Position {
    fn from((x, y): (i32, i32)) -> Self {
        Self { x, y }
    }
}

/// Euclidean distance between two cell coordinates.
pub fn euclidean(a: Position, b: Position) -> f64 {
    let dx = f64::from(b.x - a.x);
    let dy = f64::from(b.y - a.y);
    (dx * dx + dy * dy).sqrt()
}

/// Bearing from `from` to `to` in degrees clockwise from North, in `[0, 360)`.
///
/// North is `+y`, East is `+x`. Returns `0.0` when the points coincide.
pub fn bearing_between(from: Position, to: Position) -> f64 {
    let dx = f64::from(to.x - from.x);
    let dy = f64::from(to.y - from.y);
    if dx == 0.0 && dy == 0.0 {
        return 0.0;
    }
    let deg = dx.atan2(dy).to_degrees();
    if deg < 0.0 {
        deg + 360.0
    } else {
        deg
    }
}

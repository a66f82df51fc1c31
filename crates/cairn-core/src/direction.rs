//! The closed set of movement choices and their action-id encoding.

use crate::position::Position;
use std::fmt;

/// Number of discrete actions: eight compass directions plus [`Direction::Stay`].
pub const NUM_ACTIONS: usize = 9;

/// Compass direction (or no movement) for a single grid step.
///
/// Offsets use a y-up convention: North is `(0, +1)`, East is `(+1, 0)`.
/// Discriminants are the action ids used as value-table columns.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Direction {
    /// `(0, +1)`.
    North = 0,
    /// `(+1, +1)`.
    Northeast = 1,
    /// `(+1, 0)`.
    East = 2,
    /// `(+1, -1)`.
    Southeast = 3,
    /// `(0, -1)`.
    South = 4,
    /// `(-1, -1)`.
    Southwest = 5,
    /// `(-1, 0)`.
    West = 6,
    /// `(-1, +1)`.
    Northwest = 7,
    /// Agent does not move.
    Stay = 8,
}

/// Action id → direction. Index is the action id.
const ACTION_TABLE: [Direction; NUM_ACTIONS] = [
    Direction::North,
    Direction::Northeast,
    Direction::East,
    Direction::Southeast,
    Direction::South,
    Direction::Southwest,
    Direction::West,
    Direction::Northwest,
    Direction::Stay,
];

impl Direction {
    /// The eight moving directions, in action-id order.
    pub const COMPASS: [Direction; 8] = [
        Direction::North,
        Direction::Northeast,
        Direction::East,
        Direction::Southeast,
        Direction::South,
        Direction::Southwest,
        Direction::West,
        Direction::Northwest,
    ];

    /// Returns the `(dx, dy)` offset for this direction.
    pub const fn offset(self) -> (i32, i32) {
        match self {
            Direction::North => (0, 1),
            Direction::Northeast => (1, 1),
            Direction::East => (1, 0),
            Direction::Southeast => (1, -1),
            Direction::South => (0, -1),
            Direction::Southwest => (-1, -1),
            Direction::West => (-1, 0),
            Direction::Northwest => (-1, 1),
            Direction::Stay => (0, 0),
        }
    }

    /// The action id that selects this direction.
    pub const fn action(self) -> ActionId {
        ActionId(self as u8)
    }

    /// Directions that count as reversing away from `self`.
    ///
    /// For each compass direction this is the exact opposite plus its two
    /// neighbours on the compass rose. `Stay` has no opposite.
    pub const fn opposites(self) -> &'static [Direction] {
        match self {
            Direction::North => &[Direction::South, Direction::Southwest, Direction::Southeast],
            Direction::Northeast => &[Direction::Southwest, Direction::South, Direction::West],
            Direction::East => &[Direction::West, Direction::Southwest, Direction::Northwest],
            Direction::Southeast => &[Direction::Northwest, Direction::West, Direction::North],
            Direction::South => &[Direction::North, Direction::Northwest, Direction::Northeast],
            Direction::Southwest => &[Direction::Northeast, Direction::North, Direction::East],
            Direction::West => &[Direction::East, Direction::Northeast, Direction::Southeast],
            Direction::Northwest => &[Direction::Southeast, Direction::East, Direction::South],
            Direction::Stay => &[],
        }
    }

    /// Whether `other` reverses away from `self` (see [`opposites`](Self::opposites)).
    pub fn is_reversed_by(self, other: Direction) -> bool {
        self.opposites().contains(&other)
    }

    /// Compass direction of the sign of the delta from `from` to `to`.
    ///
    /// Returns `Stay` when the points coincide.
    pub fn towards(from: Position, to: Position) -> Direction {
        let dx = (to.x - from.x).signum();
        let dy = (to.y - from.y).signum();
        match (dx, dy) {
            (0, 1) => Direction::North,
            (1, 1) => Direction::Northeast,
            (1, 0) => Direction::East,
            (1, -1) => Direction::Southeast,
            (0, -1) => Direction::South,
            (-1, -1) => Direction::Southwest,
            (-1, 0) => Direction::West,
            (-1, 1) => Direction::Northwest,
            _ => Direction::Stay,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Column index into a value table, in `0..NUM_ACTIONS`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(pub u8);

impl ActionId {
    /// Decode an action id, or `None` if it is outside `0..NUM_ACTIONS`.
    pub fn direction(self) -> Option<Direction> {
        ACTION_TABLE.get(self.0 as usize).copied()
    }

    /// The id as a column index.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for ActionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Direction> for ActionId {
    fn from(d: Direction) -> Self {
        d.action()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_table_round_trips() {
        for id in 0..NUM_ACTIONS as u8 {
            let dir = ActionId(id).direction().unwrap();
            assert_eq!(dir.action(), ActionId(id));
        }
        assert_eq!(ActionId(9).direction(), None);
    }

    #[test]
    fn action_seven_is_northwest() {
        assert_eq!(ActionId(7).direction(), Some(Direction::Northwest));
        assert_eq!(ActionId(8).direction(), Some(Direction::Stay));
    }

    #[test]
    fn compass_offsets_are_distinct_unit_steps() {
        let mut seen = Vec::new();
        for d in Direction::COMPASS {
            let (dx, dy) = d.offset();
            assert!(dx.abs() <= 1 && dy.abs() <= 1);
            assert_ne!((dx, dy), (0, 0));
            assert!(!seen.contains(&(dx, dy)));
            seen.push((dx, dy));
        }
    }

    #[test]
    fn west_is_reversed_by_eastern_directions() {
        assert!(Direction::West.is_reversed_by(Direction::East));
        assert!(Direction::West.is_reversed_by(Direction::Northeast));
        assert!(Direction::West.is_reversed_by(Direction::Southeast));
        assert!(!Direction::West.is_reversed_by(Direction::West));
        assert!(!Direction::West.is_reversed_by(Direction::North));
        assert!(!Direction::West.is_reversed_by(Direction::Stay));
    }

    #[test]
    fn opposite_sets_point_backwards() {
        // Every member of the opposite set points against the heading.
        for d in Direction::COMPASS {
            let (hx, hy) = d.offset();
            for o in d.opposites() {
                let (ox, oy) = o.offset();
                assert!(hx * ox + hy * oy < 0, "{d} -> {o}");
            }
            assert_eq!(d.opposites().len(), 3);
        }
        assert!(Direction::Stay.opposites().is_empty());
    }

    #[test]
    fn towards_uses_delta_signs() {
        let o = Position::new(5, 5);
        assert_eq!(Direction::towards(o, Position::new(9, 9)), Direction::Northeast);
        assert_eq!(Direction::towards(o, Position::new(9, 1)), Direction::Southeast);
        assert_eq!(Direction::towards(o, Position::new(5, 0)), Direction::South);
        assert_eq!(Direction::towards(o, Position::new(0, 5)), Direction::West);
        assert_eq!(Direction::towards(o, o), Direction::Stay);
    }
}

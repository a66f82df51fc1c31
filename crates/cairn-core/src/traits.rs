//! Capabilities shared between spatial indices and the entities they track.

use crate::position::Position;
use std::hash::Hash;

/// Anything that occupies a grid cell and can be registered in a spatial index.
///
/// The index stores only the key and a copy of the position, never a
/// reference to the occupant, so occupants stay free to be mutated by
/// their owner between index operations.
pub trait Occupant {
    /// Identity under which the occupant is registered.
    type Key: Copy + Eq + Hash;

    /// The occupant's registration key.
    fn key(&self) -> Self::Key;

    /// The cell the occupant currently stands on.
    fn position(&self) -> Position;
}

impl<K: Copy + Eq + Hash> Occupant for (K, Position) {
    type Key = K;

    fn key(&self) -> K {
        self.0
    }

    fn position(&self) -> Position {
        self.1
    }
}

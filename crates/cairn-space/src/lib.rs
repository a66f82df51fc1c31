//! Spatial data structures for Cairn simulations.
//!
//! - [`Grid`]: the immutable obstacle map agents move over, with lazy
//!   radius queries via [`CellExplore`].
//! - [`SpatialIndex`]: bucketed registry of occupant positions answering
//!   "who is near P" without scanning every occupant. Consumers go
//!   through the [`Occupancy`] trait so the backing structure can be
//!   swapped.
//! - [`PathFinder`] and its breadth-first implementation [`BreadthFirst`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod grid;
pub mod index;
pub mod paths;

pub use error::{GridError, IndexError};
pub use grid::{CellExplore, Grid, OPEN_CELL};
pub use index::{Entry, Occupancy, SpatialIndex, DEFAULT_BUCKET_SIZE};
pub use paths::{BreadthFirst, PathFinder};

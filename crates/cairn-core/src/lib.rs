//! Core types for the Cairn grid simulation kernel.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the fundamental vocabulary shared by the rest of the workspace:
//! strongly-typed IDs, grid [`Position`]s, the closed [`Direction`]
//! action set, and the [`Occupant`] capability used by spatial indices.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod direction;
pub mod id;
pub mod position;
pub mod traits;

pub use direction::{ActionId, Direction, NUM_ACTIONS};
pub use id::{AgentId, StateId, TickId};
pub use position::{bearing_between, euclidean, Position};
pub use traits::Occupant;

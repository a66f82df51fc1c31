//! Tabular Q-learning agents for Cairn grid simulations.
//!
//! The decision loop is split into small pieces that can be tested on
//! their own:
//!
//! - [`ValueTable`]: dense state × action estimates with greedy lookup
//!   and the one-step Q-learning update.
//! - [`PolicyEngine`]: epsilon-greedy action selection.
//! - [`RewardShaping`]: distance-based reward for a [`Transition`].
//! - [`try_step`]: bounds, obstacle, and occupancy checks for one move.
//! - [`LearningAgent`]: ties them together into a per-tick cycle.
//!
//! Tables persist through the [`TableStore`] trait; [`FileTableStore`]
//! writes the binary format defined in [`codec`]. [`Wanderer`]s are
//! non-learning agents that share the grid with learners.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod agent;
pub mod codec;
pub mod error;
pub mod movement;
pub mod policy;
pub mod reward;
pub mod store;
pub mod table;
pub mod wander;

pub use agent::{LearnerConfig, LearningAgent, TickOutcome};
pub use codec::{decode_table, encode_table, FORMAT_VERSION, MAGIC};
pub use error::{AgentError, TableError};
pub use movement::{query_radius, try_step, MoveResult, MIN_COLLISION_RADIUS};
pub use policy::{Hyperparameters, PolicyEngine};
pub use reward::{RewardShaping, Transition};
pub use store::{FileTableStore, TableStore};
pub use table::ValueTable;
pub use wander::{goal_direction, PathFollower, WanderMode, Wanderer, WandererConfig};

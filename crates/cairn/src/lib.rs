//! Cairn: a grid simulation kernel where agents learn to reach an exit
//! with tabular Q-learning.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Cairn sub-crates.
//!
//! # Quick start
//!
//! ```rust
//! use cairn::prelude::*;
//!
//! let mut config = SimulationConfig::new(GridSource::Open { width: 8, height: 8 }, "q.caqt");
//! config.learners.push(LearnerSpec {
//!     start: Position::new(1, 1),
//!     goal: Position::new(6, 6),
//!     hyperparameters: Hyperparameters::default(),
//!     table_path: None,
//! });
//! config.checkpoint_tick = u64::MAX;
//!
//! let mut sim = Simulation::new(config, FileTableStore).unwrap();
//! let result = sim.step().unwrap();
//! assert_eq!(result.tick, TickId(1));
//! assert!(result.learner_outcomes[0].reward.is_none());
//! ```
//!
//! # Modules
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cairn-core` | Positions, directions, ids, `Occupant` |
//! | [`space`] | `cairn-space` | `Grid`, `SpatialIndex`, path finding |
//! | [`learn`] | `cairn-learn` | Value tables, policy, agents, persistence |
//! | [`engine`] | `cairn-engine` | Configuration and the lockstep driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Positions, compass directions, and ids (`cairn-core`).
pub use cairn_core as types;

/// Obstacle grid, spatial index, and path finding (`cairn-space`).
///
/// Consumers query occupancy through [`space::Occupancy`], implemented
/// by [`space::SpatialIndex`].
pub use cairn_space as space;

/// Learning and rule-driven agents (`cairn-learn`).
///
/// [`learn::LearningAgent`] runs the decision cycle;
/// [`learn::TableStore`] is the persistence seam.
pub use cairn_learn as learn;

/// Configuration and the lockstep driver (`cairn-engine`).
pub use cairn_engine as engine;

/// Common imports for typical Cairn usage.
///
/// ```rust
/// use cairn::prelude::*;
/// ```
pub mod prelude {
    // Core types
    pub use cairn_core::{ActionId, AgentId, Direction, Occupant, Position, StateId, TickId};

    // Space
    pub use cairn_space::{BreadthFirst, Grid, Occupancy, PathFinder, SpatialIndex};

    // Learning
    pub use cairn_learn::{
        FileTableStore, Hyperparameters, LearnerConfig, LearningAgent, MoveResult, TableStore,
        TickOutcome, ValueTable, WanderMode, Wanderer, WandererConfig,
    };

    // Errors
    pub use cairn_engine::{ConfigError, SimulationError};
    pub use cairn_learn::{AgentError, TableError};
    pub use cairn_space::{GridError, IndexError};

    // Engine
    pub use cairn_engine::{
        GridSource, LearnerSpec, Simulation, SimulationConfig, StepMetrics, StepResult,
    };
}

//! Lockstep driver for Cairn grid simulations.
//!
//! A [`SimulationConfig`] (usually loaded from JSON) describes the grid
//! and the agent population. [`Simulation::new`] validates it, builds
//! the shared spatial index, and initialises learners and wanderers;
//! [`Simulation::step`] then ticks them in registration order.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod metrics;
pub mod simulation;

pub use config::{ConfigError, GridSource, LearnerSpec, SimulationConfig};
pub use metrics::StepMetrics;
pub use simulation::{Simulation, SimulationError, StepResult};

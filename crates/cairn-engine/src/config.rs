//! Simulation configuration, validation, and error types.
//!
//! [`SimulationConfig`] is the JSON-loadable input for constructing a
//! [`Simulation`](crate::Simulation). [`validate()`](SimulationConfig::validate)
//! checks structural invariants at startup; the simulation constructor
//! runs the same checks against the grid it builds.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use cairn_core::{AgentId, Position, TickId};
use cairn_learn::{Hyperparameters, LearnerConfig, RewardShaping, WandererConfig, MIN_COLLISION_RADIUS};
use cairn_space::{Grid, GridError, DEFAULT_BUCKET_SIZE};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while loading or validating a [`SimulationConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("cannot read {path}: {source}")]
    Io {
        /// File that failed to load.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: io::Error,
    },
    /// The config is not valid JSON for this schema.
    #[error("invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// The grid could not be built.
    #[error("grid: {0}")]
    Grid(#[from] GridError),
    /// Bucket side is zero.
    #[error("bucket_size must be at least 1")]
    ZeroBucketSize,
    /// Collision radius is below the diagonal minimum or not finite.
    #[error("collision_radius must be finite and at least sqrt(2), got {value}")]
    InvalidCollisionRadius {
        /// The rejected value.
        value: f64,
    },
    /// No learners and no wanderers configured.
    #[error("no agents configured")]
    NoAgents,
    /// A learner's hyperparameters are out of range.
    #[error("learner {index}: invalid {name} = {value}, must be finite and in [0, 1]")]
    InvalidHyperparameter {
        /// Position of the learner in `learners`.
        index: usize,
        /// Parameter name.
        name: &'static str,
        /// The rejected value.
        value: f64,
    },
    /// A configured position lies outside the grid.
    #[error("{what} {position} lies outside the {width}x{height} grid")]
    OutsideGrid {
        /// Which position, e.g. `"learners[2].goal"`.
        what: String,
        /// The offending position.
        position: Position,
        /// Grid width.
        width: u32,
        /// Grid height.
        height: u32,
    },
    /// A start position is an obstacle.
    #[error("{what} {position} is not routable")]
    NotRoutable {
        /// Which position, e.g. `"wanderers[0].start"`.
        what: String,
        /// The offending position.
        position: Position,
    },
    /// Two agents share a start cell.
    #[error("{what} {position} is already taken by another agent")]
    DuplicateStart {
        /// Which position.
        what: String,
        /// The shared cell.
        position: Position,
    },
}

// ── GridSource ─────────────────────────────────────────────────────

/// Where the obstacle grid comes from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GridSource {
    /// Inline rows, `rows[y][x]`.
    Rows(Vec<Vec<i32>>),
    /// A CSV raster file, resolved relative to the working directory.
    Csv(PathBuf),
    /// An all-open grid.
    Open {
        /// Number of columns.
        width: u32,
        /// Number of rows.
        height: u32,
    },
}

impl GridSource {
    /// Build the grid.
    pub fn build(&self) -> Result<Grid, GridError> {
        match self {
            GridSource::Rows(rows) => Grid::from_rows(rows.clone()),
            GridSource::Csv(path) => Grid::from_csv_path(path),
            GridSource::Open { width, height } => Grid::open(*width, *height),
        }
    }
}

// ── LearnerSpec ────────────────────────────────────────────────────

/// One learning agent in a [`SimulationConfig`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LearnerSpec {
    /// Start cell.
    pub start: Position,
    /// Goal (exit) cell.
    pub goal: Position,
    /// α, γ, ε.
    #[serde(flatten)]
    pub hyperparameters: Hyperparameters,
    /// Overrides the simulation-wide table path.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_path: Option<PathBuf>,
}

// ── SimulationConfig ───────────────────────────────────────────────

fn default_bucket_size() -> u32 {
    DEFAULT_BUCKET_SIZE
}

fn default_checkpoint_tick() -> u64 {
    LearnerConfig::DEFAULT_CHECKPOINT_TICK.0
}

fn default_canonical_start() -> Position {
    LearnerConfig::DEFAULT_CANONICAL_START
}

fn default_collision_radius() -> f64 {
    2.0
}

fn check_radius(value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= MIN_COLLISION_RADIUS {
        Ok(())
    } else {
        Err(ConfigError::InvalidCollisionRadius { value })
    }
}

/// Complete configuration for constructing a simulation.
///
/// Agents receive ids in order: learners first, then wanderers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Obstacle grid.
    pub grid: GridSource,
    /// Spatial index bucket side. Default: 2.
    #[serde(default = "default_bucket_size")]
    pub bucket_size: u32,
    /// Master seed; each agent's RNG is derived from it and its id.
    #[serde(default)]
    pub seed: u64,
    /// Tick at which the canonical learner saves its table. Default: 300.
    #[serde(default = "default_checkpoint_tick")]
    pub checkpoint_tick: u64,
    /// Start cell of the learner allowed to checkpoint. Default: (1, 1).
    #[serde(default = "default_canonical_start")]
    pub canonical_start: Position,
    /// Value table location shared by learners without their own.
    pub table_path: PathBuf,
    /// Occupancy query radius for learners. Default: 2. Must be at least
    /// [`MIN_COLLISION_RADIUS`] so diagonal neighbours are covered.
    #[serde(default = "default_collision_radius")]
    pub collision_radius: f64,
    /// Learning agents.
    #[serde(default)]
    pub learners: Vec<LearnerSpec>,
    /// Rule-driven agents.
    #[serde(default)]
    pub wanderers: Vec<WandererConfig>,
}

impl SimulationConfig {
    /// A config with defaults and no agents.
    pub fn new(grid: GridSource, table_path: impl Into<PathBuf>) -> Self {
        Self {
            grid,
            bucket_size: default_bucket_size(),
            seed: 0,
            checkpoint_tick: default_checkpoint_tick(),
            canonical_start: default_canonical_start(),
            table_path: table_path.into(),
            collision_radius: default_collision_radius(),
            learners: Vec::new(),
            wanderers: Vec::new(),
        }
    }

    /// Parse a config from JSON text.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON config file.
    pub fn from_json_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Build the grid and check every structural invariant against it.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = self.grid.build()?;
        self.validate_against(&grid)
    }

    /// Check every structural invariant against an already-built grid.
    pub fn validate_against(&self, grid: &Grid) -> Result<(), ConfigError> {
        // 1. Index buckets need a positive side.
        if self.bucket_size == 0 {
            return Err(ConfigError::ZeroBucketSize);
        }
        // 2. Collision radius must be a usable query radius.
        check_radius(self.collision_radius)?;
        // 3. At least one agent.
        if self.learners.is_empty() && self.wanderers.is_empty() {
            return Err(ConfigError::NoAgents);
        }

        let inside = |what: String, position: Position| -> Result<(), ConfigError> {
            if grid.contains(position) {
                Ok(())
            } else {
                Err(ConfigError::OutsideGrid {
                    what,
                    position,
                    width: grid.width(),
                    height: grid.height(),
                })
            }
        };
        let mut taken = HashSet::new();
        let mut start = |what: String, position: Position| -> Result<(), ConfigError> {
            inside(what.clone(), position)?;
            if !grid.is_routable_at(position) {
                return Err(ConfigError::NotRoutable { what, position });
            }
            if !taken.insert(position) {
                return Err(ConfigError::DuplicateStart { what, position });
            }
            Ok(())
        };

        // 4. Learners: hyperparameters in range, positions on the grid.
        for (i, l) in self.learners.iter().enumerate() {
            let h = l.hyperparameters;
            for (name, value) in [("alpha", h.alpha), ("gamma", h.gamma), ("epsilon", h.epsilon)] {
                if !value.is_finite() || !(0.0..=1.0).contains(&value) {
                    return Err(ConfigError::InvalidHyperparameter {
                        index: i,
                        name,
                        value,
                    });
                }
            }
            start(format!("learners[{i}].start"), l.start)?;
            inside(format!("learners[{i}].goal"), l.goal)?;
        }
        // 5. Wanderers: start routable, path goals on the grid.
        for (i, w) in self.wanderers.iter().enumerate() {
            check_radius(w.collision_radius)?;
            start(format!("wanderers[{i}].start"), w.start)?;
            if let cairn_learn::WanderMode::PathFollow { goal } = w.mode {
                inside(format!("wanderers[{i}].goal"), goal)?;
            }
        }
        Ok(())
    }

    /// The per-agent config for learner `index`, with its derived seed.
    pub(crate) fn learner_config(&self, index: usize, id: AgentId) -> LearnerConfig {
        let learner = &self.learners[index];
        LearnerConfig {
            start: learner.start,
            goal: learner.goal,
            hyperparameters: learner.hyperparameters,
            collision_radius: self.collision_radius,
            table_path: learner
                .table_path
                .clone()
                .unwrap_or_else(|| self.table_path.clone()),
            checkpoint_tick: TickId(self.checkpoint_tick),
            canonical_start: self.canonical_start,
            shaping: RewardShaping::default(),
            seed: self.agent_seed(id),
        }
    }

    /// Seed for agent `id`, derived from the master seed.
    pub fn agent_seed(&self, id: AgentId) -> u64 {
        // splitmix64 finaliser over (seed, id).
        let mut z = self
            .seed
            .wrapping_add(u64::from(id.0).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

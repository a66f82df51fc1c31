//! Lockstep simulation driver.
//!
//! [`Simulation`] owns the grid, the shared spatial index, and every
//! agent. Each [`step()`](Simulation::step) advances the tick counter and
//! ticks learners then wanderers, in registration order, handing each
//! one `&mut` access to the index for the duration of its own tick.
//!
//! `Simulation` is [`Send`] but not shared: all mutating methods take
//! `&mut self`.

use std::time::Instant;

use cairn_core::{AgentId, Occupant, TickId};
use cairn_learn::{AgentError, LearningAgent, MoveResult, TableStore, TickOutcome, Wanderer};
use cairn_space::{BreadthFirst, Grid, IndexError, PathFinder, SpatialIndex};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{ConfigError, SimulationConfig};
use crate::metrics::StepMetrics;

// Fails to compile if any field is !Send.
const _: () = {
    #[allow(dead_code)]
    fn assert_send<T: Send>() {}
    #[allow(dead_code)]
    fn check() {
        assert_send::<Simulation>();
    }
};

// ── SimulationError ─────────────────────────────────────────────

/// Errors from constructing or stepping a [`Simulation`].
#[derive(Debug, Error)]
pub enum SimulationError {
    /// The configuration is invalid.
    #[error("config: {0}")]
    Config(#[from] ConfigError),
    /// The spatial index could not be built.
    #[error("index: {0}")]
    Index(#[from] IndexError),
    /// An agent failed to initialise or tick.
    #[error("agent {agent}: {source}")]
    Agent {
        /// The failing agent.
        agent: AgentId,
        /// What went wrong.
        #[source]
        source: AgentError,
    },
}

// ── StepResult ──────────────────────────────────────────────────

/// Result of one [`Simulation::step()`].
#[derive(Clone, Debug)]
pub struct StepResult {
    /// The tick that just ran.
    pub tick: TickId,
    /// One outcome per learner, in registration order.
    pub learner_outcomes: Vec<TickOutcome>,
    /// One movement result per wanderer, in registration order.
    pub wanderer_results: Vec<MoveResult>,
    /// Counts and timings for this tick.
    pub metrics: StepMetrics,
}

// ── Simulation ──────────────────────────────────────────────────

/// Single-threaded driver for learners and wanderers on one grid.
///
/// Learners receive ids `0..L`, wanderers `L..L+W`, in config order.
///
/// ```ignore
/// let config = SimulationConfig::from_json_path("maze.json")?;
/// let mut sim = Simulation::new(config, FileTableStore)?;
/// let totals = sim.run(1000)?;
/// ```
pub struct Simulation {
    grid: Grid,
    index: SpatialIndex<AgentId>,
    learners: Vec<LearningAgent>,
    wanderers: Vec<Wanderer>,
    store: Box<dyn TableStore + Send>,
    path_finder: Box<dyn PathFinder + Send>,
    current_tick: TickId,
    last_metrics: StepMetrics,
    seed: u64,
}

impl Simulation {
    /// Build the grid, validate `config` against it, and initialise every
    /// agent. Value tables are loaded through `store`.
    pub fn new(
        config: SimulationConfig,
        store: impl TableStore + Send + 'static,
    ) -> Result<Self, SimulationError> {
        let grid = config.grid.build().map_err(ConfigError::from)?;
        config.validate_against(&grid)?;

        let mut index = SpatialIndex::new(grid.width(), grid.height(), config.bucket_size)?;
        let mut learners = Vec::with_capacity(config.learners.len());
        for i in 0..config.learners.len() {
            let id = agent_id(i);
            let learner_config = config.learner_config(i, id);
            let agent = LearningAgent::init(id, &learner_config, &grid, &mut index, &store)
                .map_err(|source| SimulationError::Agent { agent: id, source })?;
            learners.push(agent);
        }
        let mut wanderers = Vec::with_capacity(config.wanderers.len());
        for (j, wc) in config.wanderers.iter().enumerate() {
            let id = agent_id(learners.len() + j);
            let wanderer = Wanderer::init(id, wc, config.agent_seed(id), &grid, &mut index)
                .map_err(|source| SimulationError::Agent { agent: id, source })?;
            wanderers.push(wanderer);
        }

        info!(
            width = grid.width(),
            height = grid.height(),
            learners = learners.len(),
            wanderers = wanderers.len(),
            seed = config.seed,
            "simulation initialised"
        );

        Ok(Self {
            grid,
            index,
            learners,
            wanderers,
            store: Box::new(store),
            path_finder: Box::new(BreadthFirst),
            current_tick: TickId(0),
            last_metrics: StepMetrics::default(),
            seed: config.seed,
        })
    }

    /// Replace the path finder used by path-following wanderers.
    pub fn with_path_finder(mut self, finder: impl PathFinder + Send + 'static) -> Self {
        self.path_finder = Box::new(finder);
        self
    }

    /// Execute one tick: every learner, then every wanderer.
    ///
    /// # Errors
    ///
    /// Returns [`SimulationError::Agent`] if an agent hits an index
    /// contract violation or fails to checkpoint. The tick counter has
    /// already advanced; agents ticked before the failure keep their moves.
    pub fn step(&mut self) -> Result<StepResult, SimulationError> {
        let tick = self.current_tick.next();
        self.current_tick = tick;
        let mut metrics = StepMetrics {
            tick,
            ..Default::default()
        };
        let started = Instant::now();

        let mut learner_outcomes = Vec::with_capacity(self.learners.len());
        for agent in &mut self.learners {
            let outcome = agent
                .tick(tick, &self.grid, &mut self.index, &*self.store)
                .map_err(|source| SimulationError::Agent {
                    agent: agent.id(),
                    source,
                })?;
            metrics.record_learner(&outcome);
            learner_outcomes.push(outcome);
        }
        metrics.learner_us = elapsed_us(started);

        let wanderers_started = Instant::now();
        let mut wanderer_results = Vec::with_capacity(self.wanderers.len());
        for wanderer in &mut self.wanderers {
            let result = wanderer
                .tick(&self.grid, &mut self.index, &*self.path_finder)
                .map_err(|source| SimulationError::Agent {
                    agent: wanderer.id(),
                    source,
                })?;
            metrics.record_move(result);
            wanderer_results.push(result);
        }
        metrics.wanderer_us = elapsed_us(wanderers_started);
        metrics.total_us = elapsed_us(started);

        debug!(
            %tick,
            moved = metrics.moved,
            blocked = metrics.blocked,
            goals = metrics.goals_reached,
            "tick complete"
        );
        self.last_metrics = metrics.clone();
        Ok(StepResult {
            tick,
            learner_outcomes,
            wanderer_results,
            metrics,
        })
    }

    /// Execute `ticks` steps and return their metrics folded together.
    pub fn run(&mut self, ticks: u64) -> Result<StepMetrics, SimulationError> {
        let mut totals = StepMetrics {
            tick: self.current_tick,
            ..Default::default()
        };
        for _ in 0..ticks {
            let result = self.step()?;
            totals.absorb(&result.metrics);
        }
        info!(
            ticks,
            last_tick = %self.current_tick,
            goals = self.learners.iter().filter(|a| a.goal_reached()).count(),
            mean_reward = totals.mean_reward(),
            "run complete"
        );
        Ok(totals)
    }

    /// Last tick executed (0 before the first step).
    pub fn current_tick(&self) -> TickId {
        self.current_tick
    }

    /// Learning agents in registration order.
    pub fn agents(&self) -> &[LearningAgent] {
        &self.learners
    }

    /// Wanderers in registration order.
    pub fn wanderers(&self) -> &[Wanderer] {
        &self.wanderers
    }

    /// The obstacle grid.
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// The shared occupancy index.
    pub fn index(&self) -> &SpatialIndex<AgentId> {
        &self.index
    }

    /// Metrics from the most recent step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }

    /// Master seed the agents' RNGs were derived from.
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Save every learner's table through the store, regardless of
    /// checkpoint ownership.
    pub fn checkpoint_all(&self) -> Result<(), SimulationError> {
        for agent in &self.learners {
            agent
                .checkpoint(&*self.store)
                .map_err(|source| SimulationError::Agent {
                    agent: agent.id(),
                    source,
                })?;
        }
        Ok(())
    }

    /// Number of registered agents of both kinds.
    pub fn population(&self) -> usize {
        self.learners.len() + self.wanderers.len()
    }

    /// Where each agent currently stands, in id order.
    pub fn positions(&self) -> Vec<(AgentId, cairn_core::Position)> {
        self.learners
            .iter()
            .map(|a| (a.key(), a.position()))
            .chain(self.wanderers.iter().map(|w| (w.key(), w.position())))
            .collect()
    }
}

fn agent_id(i: usize) -> AgentId {
    AgentId(u32::try_from(i).unwrap_or(u32::MAX))
}

fn elapsed_us(since: Instant) -> u64 {
    u64::try_from(since.elapsed().as_micros()).unwrap_or(u64::MAX)
}

impl std::fmt::Debug for Simulation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Simulation")
            .field("current_tick", &self.current_tick)
            .field("seed", &self.seed)
            .field("learners", &self.learners.len())
            .field("wanderers", &self.wanderers.len())
            .field("grid", &(self.grid.width(), self.grid.height()))
            .finish()
    }
}

//! The tabular Q-learning agent and its per-tick decision loop.
//!
//! # Lifecycle
//!
//! [`LearningAgent::init`] loads or creates the value table, registers
//! the agent in the shared index, and computes its initial state. The
//! agent then waits for its first tick. Every [`tick`](LearningAgent::tick)
//! after the first starts by learning from the previous transition,
//! then chooses and attempts a new move:
//!
//! 1. update `Q[previous_state][previous_action]` with the shaped reward
//!    (skipped on the first tick);
//! 2. select an action epsilon-greedily;
//! 3. remember the current position, state, and direction;
//! 4. attempt the move (bounds, obstacle, and occupancy checks);
//! 5. recompute the state id and the goal-reached flag;
//! 6. save the table if this is the checkpoint tick and the agent
//!    started at the canonical start.
//!
//! The grid, index, and table store are borrowed for the duration of a
//! call and never retained.

use crate::error::AgentError;
use crate::movement::{try_step, MoveResult};
use crate::policy::{Hyperparameters, PolicyEngine};
use crate::reward::{RewardShaping, Transition};
use crate::store::TableStore;
use crate::table::ValueTable;
use cairn_core::{ActionId, AgentId, Direction, Occupant, Position, StateId, TickId, NUM_ACTIONS};
use cairn_space::{Grid, Occupancy, DEFAULT_BUCKET_SIZE};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Static parameters of one learning agent.
#[derive(Clone, Debug, PartialEq)]
pub struct LearnerConfig {
    /// Start cell; must be routable.
    pub start: Position,
    /// Goal cell.
    pub goal: Position,
    /// α, γ, ε.
    pub hyperparameters: Hyperparameters,
    /// Radius of the occupancy query made before each move.
    pub collision_radius: f64,
    /// Where the value table is loaded from and checkpointed to.
    pub table_path: PathBuf,
    /// Tick at which the checkpoint is written.
    pub checkpoint_tick: TickId,
    /// Only the agent starting here writes the checkpoint.
    pub canonical_start: Position,
    /// Reward constants.
    pub shaping: RewardShaping,
    /// Seed for the agent's exploration RNG.
    pub seed: u64,
}

impl LearnerConfig {
    /// Default checkpoint tick.
    pub const DEFAULT_CHECKPOINT_TICK: TickId = TickId(300);
    /// Default canonical start.
    pub const DEFAULT_CANONICAL_START: Position = Position::new(1, 1);

    /// A config with default hyperparameters, collision radius, and
    /// checkpoint policy.
    pub fn new(start: Position, goal: Position, table_path: impl Into<PathBuf>) -> Self {
        Self {
            start,
            goal,
            hyperparameters: Hyperparameters::default(),
            collision_radius: f64::from(DEFAULT_BUCKET_SIZE),
            table_path: table_path.into(),
            checkpoint_tick: Self::DEFAULT_CHECKPOINT_TICK,
            canonical_start: Self::DEFAULT_CANONICAL_START,
            shaping: RewardShaping::default(),
            seed: 0,
        }
    }
}

/// Transition memory kept between ticks.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Memory {
    state: StateId,
    position: Position,
    action: ActionId,
    /// Direction chosen before `action`.
    direction: Direction,
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Phase {
    AwaitingFirstTick,
    Acting(Memory),
}

/// Everything observable about one tick of a [`LearningAgent`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TickOutcome {
    /// The tick this outcome belongs to.
    pub tick: TickId,
    /// Chosen action.
    pub action: ActionId,
    /// Direction the action decodes to.
    pub direction: Direction,
    /// Result of the move attempt.
    pub move_result: MoveResult,
    /// Reward applied to the previous transition (`None` on the first tick).
    pub reward: Option<f64>,
    /// Whether the agent stands on its goal after the move.
    pub goal_reached: bool,
    /// Whether the table was saved this tick.
    pub checkpointed: bool,
}

/// Goal-seeking agent learning a movement policy with tabular Q-learning.
pub struct LearningAgent {
    id: AgentId,
    start: Position,
    goal: Position,
    position: Position,
    state: StateId,
    direction: Direction,
    goal_reached: bool,
    phase: Phase,
    table: ValueTable,
    hyperparameters: Hyperparameters,
    policy: PolicyEngine,
    shaping: RewardShaping,
    collision_radius: f64,
    table_path: PathBuf,
    checkpoint_tick: TickId,
    owns_checkpoint: bool,
    rng: ChaCha8Rng,
}

impl LearningAgent {
    /// Initialise an agent and register it in `index`.
    ///
    /// The value table is loaded from `config.table_path` through
    /// `store`; if none is stored, a zeroed table sized for `grid` is
    /// created. A stored table of any other shape is rejected with
    /// `ShapeMismatch`.
    pub fn init(
        id: AgentId,
        config: &LearnerConfig,
        grid: &Grid,
        index: &mut dyn Occupancy<AgentId>,
        store: &dyn TableStore,
    ) -> Result<Self, AgentError> {
        config.hyperparameters.validate()?;
        let outside = |what: &'static str, position: Position| AgentError::OutsideGrid {
            what,
            position,
            width: grid.width(),
            height: grid.height(),
        };
        let state = grid
            .state_id(config.start)
            .ok_or_else(|| outside("start", config.start))?;
        if !grid.contains(config.goal) {
            return Err(outside("goal", config.goal));
        }

        let table = match store.load(&config.table_path)? {
            Some(table) => {
                table.ensure_shape(grid.cell_count(), NUM_ACTIONS)?;
                table
            }
            None => ValueTable::for_grid(grid),
        };

        index.insert(id, config.start)?;
        info!(
            agent = %id,
            start = %config.start,
            goal = %config.goal,
            "learning agent initialised"
        );

        Ok(Self {
            id,
            start: config.start,
            goal: config.goal,
            position: config.start,
            state,
            direction: Direction::Stay,
            goal_reached: false,
            phase: Phase::AwaitingFirstTick,
            table,
            hyperparameters: config.hyperparameters,
            policy: PolicyEngine::new(config.hyperparameters.epsilon),
            shaping: config.shaping,
            collision_radius: config.collision_radius,
            table_path: config.table_path.clone(),
            checkpoint_tick: config.checkpoint_tick,
            owns_checkpoint: config.start == config.canonical_start,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
        })
    }

    /// Run one decision cycle.
    pub fn tick(
        &mut self,
        tick: TickId,
        grid: &Grid,
        index: &mut dyn Occupancy<AgentId>,
        store: &dyn TableStore,
    ) -> Result<TickOutcome, AgentError> {
        let reward = match self.phase {
            Phase::AwaitingFirstTick => None,
            Phase::Acting(memory) => Some(self.learn(grid, memory)),
        };

        let action = self.policy.select(&self.table, self.state, &mut self.rng);
        let direction = action.direction().unwrap_or(Direction::Stay);
        self.phase = Phase::Acting(Memory {
            state: self.state,
            position: self.position,
            action,
            direction: self.direction,
        });

        let move_result = try_step(
            self.id,
            self.position,
            direction,
            self.collision_radius,
            grid,
            index,
        )?;
        self.direction = direction;
        if move_result.moved() {
            self.position = self.position.step(direction);
            if let Some(state) = grid.state_id(self.position) {
                self.state = state;
            }
        }
        self.goal_reached = self.position == self.goal;

        let checkpointed = self.owns_checkpoint && tick == self.checkpoint_tick;
        if checkpointed {
            self.checkpoint(store)?;
        }

        Ok(TickOutcome {
            tick,
            action,
            direction,
            move_result,
            reward,
            goal_reached: self.goal_reached,
            checkpointed,
        })
    }

    /// Apply the shaped reward for the transition out of `memory`.
    fn learn(&mut self, grid: &Grid, memory: Memory) -> f64 {
        let transition = Transition {
            from: memory.position,
            to: self.position,
            goal: self.goal,
            reached: self.goal_reached,
            direction: self.direction,
            previous_direction: memory.direction,
        };
        let reward = self.shaping.reward(grid, &transition);
        let h = self.hyperparameters;
        self.table
            .update(memory.state, memory.action, reward, self.state, h.alpha, h.gamma);
        reward
    }

    /// Save the value table to this agent's table path.
    pub fn checkpoint(&self, store: &dyn TableStore) -> Result<(), AgentError> {
        store.save(&self.table, &self.table_path)?;
        info!(agent = %self.id, path = %self.table_path.display(), "checkpointed value table");
        Ok(())
    }

    /// Unregister from `index`, returning the last recorded position.
    pub fn retire(&self, index: &mut dyn Occupancy<AgentId>) -> Result<Position, AgentError> {
        let at = index.remove(self.id)?;
        debug!(agent = %self.id, position = %at, "learning agent retired");
        Ok(at)
    }

    /// Registration key.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Start cell.
    pub fn start(&self) -> Position {
        self.start
    }

    /// Goal cell.
    pub fn goal(&self) -> Position {
        self.goal
    }

    /// Current state id.
    pub fn state(&self) -> StateId {
        self.state
    }

    /// Last chosen direction (`Stay` before the first tick).
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Whether the agent stands on its goal.
    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Whether the agent has not yet ticked.
    pub fn awaiting_first_tick(&self) -> bool {
        self.phase == Phase::AwaitingFirstTick
    }

    /// Whether this agent writes the checkpoint.
    pub fn owns_checkpoint(&self) -> bool {
        self.owns_checkpoint
    }

    /// The value table.
    pub fn table(&self) -> &ValueTable {
        &self.table
    }

    /// Mutable access to the value table, e.g. to seed estimates.
    pub fn table_mut(&mut self) -> &mut ValueTable {
        &mut self.table
    }

    /// α, γ, ε.
    pub fn hyperparameters(&self) -> Hyperparameters {
        self.hyperparameters
    }

    /// Where the table is checkpointed.
    pub fn table_path(&self) -> &Path {
        &self.table_path
    }
}

impl Occupant for LearningAgent {
    type Key = AgentId;

    fn key(&self) -> AgentId {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }
}

impl fmt::Debug for LearningAgent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LearningAgent")
            .field("id", &self.id)
            .field("position", &self.position)
            .field("goal", &self.goal)
            .field("state", &self.state)
            .field("direction", &self.direction)
            .field("goal_reached", &self.goal_reached)
            .field("phase", &self.phase)
            .finish_non_exhaustive()
    }
}

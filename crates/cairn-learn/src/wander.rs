//! Non-learning agents moving by fixed rules.
//!
//! A [`Wanderer`] shares the grid and index with the learners and
//! occupies cells like them, but never updates a value table. Its
//! behaviour per tick is set by a [`WanderMode`].

use crate::error::AgentError;
use crate::movement::{query_radius, try_step, MoveResult, MIN_COLLISION_RADIUS};
use cairn_core::{bearing_between, AgentId, Direction, Occupant, Position};
use cairn_space::{Entry, Grid, Occupancy, PathFinder};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::{debug, info, warn};

/// Compass direction from `from` towards `goal`, by the sign of each
/// coordinate delta. `Stay` when already there.
pub fn goal_direction(from: Position, goal: Position) -> Direction {
    Direction::towards(from, goal)
}

/// Per-tick movement rule for a [`Wanderer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum WanderMode {
    /// One step in a uniformly random compass direction.
    Random,
    /// Pick a random routable neighbour and step along the bearing to it.
    Bearing,
    /// Follow a shortest path to `goal`, re-planning when blocked.
    PathFollow {
        /// Destination cell.
        goal: Position,
    },
}

/// Path-following state: the remaining steps of the current trip, or
/// no trip at all.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PathFollower {
    remaining: Option<VecDeque<Position>>,
}

impl PathFollower {
    /// A follower with no trip in progress.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a trip is in progress.
    pub fn is_travelling(&self) -> bool {
        self.remaining.is_some()
    }

    /// Steps left on the current trip (0 with no trip).
    pub fn remaining(&self) -> usize {
        self.remaining.as_ref().map_or(0, VecDeque::len)
    }

    /// Start a trip from `from` to `goal` using `finder`.
    ///
    /// The finder's first element (the start cell) is dropped. Returns
    /// `false` and leaves no trip in progress when no path exists.
    pub fn plan(
        &mut self,
        finder: &dyn PathFinder,
        grid: &Grid,
        from: Position,
        goal: Position,
    ) -> bool {
        let mut path: VecDeque<Position> = finder.find_path(grid, from, goal).into();
        if path.is_empty() {
            self.remaining = None;
            return false;
        }
        path.pop_front();
        self.remaining = Some(path);
        true
    }

    /// Take the next step of the trip.
    ///
    /// Returns `None`, ending the trip, once every step is consumed.
    pub fn next_step(&mut self) -> Option<Position> {
        let step = self.remaining.as_mut()?.pop_front();
        if step.is_none() {
            self.remaining = None;
        }
        step
    }

    /// Drop the current trip.
    pub fn abandon(&mut self) {
        self.remaining = None;
    }
}

/// Static parameters of one wanderer.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct WandererConfig {
    /// Start cell; must be routable.
    pub start: Position,
    /// Movement rule.
    #[serde(flatten)]
    pub mode: WanderMode,
    /// Radius of the occupancy query made before each move. Values below
    /// [`MIN_COLLISION_RADIUS`] are raised to it.
    #[serde(default = "WandererConfig::default_collision_radius")]
    pub collision_radius: f64,
}

impl WandererConfig {
    fn default_collision_radius() -> f64 {
        MIN_COLLISION_RADIUS
    }

    /// A config with the default collision radius.
    pub fn new(start: Position, mode: WanderMode) -> Self {
        Self {
            start,
            mode,
            collision_radius: Self::default_collision_radius(),
        }
    }
}

/// Rule-driven agent sharing the grid with learners.
#[derive(Debug)]
pub struct Wanderer {
    id: AgentId,
    position: Position,
    mode: WanderMode,
    collision_radius: f64,
    follower: PathFollower,
    goal_reached: bool,
    rng: ChaCha8Rng,
}

impl Wanderer {
    /// Initialise a wanderer and register it in `index`.
    pub fn init(
        id: AgentId,
        config: &WandererConfig,
        seed: u64,
        grid: &Grid,
        index: &mut dyn Occupancy<AgentId>,
    ) -> Result<Self, AgentError> {
        if !grid.contains(config.start) {
            return Err(AgentError::OutsideGrid {
                what: "start",
                position: config.start,
                width: grid.width(),
                height: grid.height(),
            });
        }
        index.insert(id, config.start)?;
        info!(agent = %id, start = %config.start, mode = ?config.mode, "wanderer initialised");
        Ok(Self {
            id,
            position: config.start,
            mode: config.mode,
            collision_radius: config.collision_radius,
            follower: PathFollower::new(),
            goal_reached: false,
            rng: ChaCha8Rng::seed_from_u64(seed),
        })
    }

    /// Move once according to the wanderer's mode.
    pub fn tick(
        &mut self,
        grid: &Grid,
        index: &mut dyn Occupancy<AgentId>,
        finder: &dyn PathFinder,
    ) -> Result<MoveResult, AgentError> {
        match self.mode {
            WanderMode::Random => self.move_randomly(grid, index),
            WanderMode::Bearing => self.move_with_bearing(grid, index),
            WanderMode::PathFollow { goal } => self.move_towards_goal(goal, grid, index, finder),
        }
    }

    fn move_randomly(
        &mut self,
        grid: &Grid,
        index: &mut dyn Occupancy<AgentId>,
    ) -> Result<MoveResult, AgentError> {
        let direction = Direction::COMPASS[self.rng.random_range(0..Direction::COMPASS.len())];
        let result = try_step(self.id, self.position, direction, self.collision_radius, grid, index)?;
        if result.moved() {
            self.position = self.position.step(direction);
        }
        Ok(result)
    }

    fn move_with_bearing(
        &mut self,
        grid: &Grid,
        index: &mut dyn Occupancy<AgentId>,
    ) -> Result<MoveResult, AgentError> {
        let Some(target) = grid.find_routable_goal(self.position, 1.0, &mut self.rng) else {
            return Ok(MoveResult::Stayed);
        };
        let bearing = bearing_between(self.position, target);
        let before = self.position;
        let after = index.move_towards(self.id, bearing, 1)?;
        if !grid.is_routable_at(after) {
            index.move_to(self.id, before)?;
            debug!(agent = %self.id, from = %before, to = %after, "bearing move rolled back");
            return Ok(MoveResult::Blocked);
        }
        self.position = after;
        Ok(if after == before {
            MoveResult::Stayed
        } else {
            MoveResult::Moved
        })
    }

    fn move_towards_goal(
        &mut self,
        goal: Position,
        grid: &Grid,
        index: &mut dyn Occupancy<AgentId>,
        finder: &dyn PathFinder,
    ) -> Result<MoveResult, AgentError> {
        if !self.follower.is_travelling() && !self.follower.plan(finder, grid, self.position, goal) {
            warn!(agent = %self.id, from = %self.position, %goal, "no path to goal");
            return Ok(MoveResult::Stayed);
        }
        let Some(step) = self.follower.next_step() else {
            return Ok(MoveResult::Stayed);
        };
        let on_step: &dyn Fn(&Entry<AgentId>) -> bool = &|e| e.position == step;
        if !index
            .explore(self.position, query_radius(self.collision_radius), Some(on_step))
            .is_empty()
        {
            self.follower.abandon();
            debug!(agent = %self.id, from = %self.position, %step, "path step occupied; trip abandoned");
            return Ok(MoveResult::Blocked);
        }
        index.move_to(self.id, step)?;
        self.position = step;
        if self.position == goal && !self.goal_reached {
            self.goal_reached = true;
            info!(agent = %self.id, %goal, "wanderer reached goal");
        }
        Ok(MoveResult::Moved)
    }

    /// Registration key.
    pub fn id(&self) -> AgentId {
        self.id
    }

    /// Movement rule.
    pub fn mode(&self) -> WanderMode {
        self.mode
    }

    /// Whether a path-following wanderer has arrived at its goal.
    pub fn goal_reached(&self) -> bool {
        self.goal_reached
    }

    /// Path-following state.
    pub fn follower(&self) -> &PathFollower {
        &self.follower
    }
}

impl Occupant for Wanderer {
    type Key = AgentId;

    fn key(&self) -> AgentId {
        self.id
    }

    fn position(&self) -> Position {
        self.position
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_space::{BreadthFirst, SpatialIndex};

    fn open(w: u32, h: u32) -> (Grid, SpatialIndex<AgentId>) {
        (Grid::open(w, h).unwrap(), SpatialIndex::new(w, h, 2).unwrap())
    }

    #[test]
    fn goal_direction_uses_delta_signs() {
        let here = Position::new(3, 3);
        assert_eq!(goal_direction(here, Position::new(5, 3)), Direction::East);
        assert_eq!(goal_direction(here, Position::new(1, 1)), Direction::Southwest);
        assert_eq!(goal_direction(here, Position::new(3, 9)), Direction::North);
        assert_eq!(goal_direction(here, here), Direction::Stay);
    }

    // ── PathFollower ────────────────────────────────────────────

    #[test]
    fn follower_drops_start_and_ends_trip() {
        let grid = Grid::open(4, 1).unwrap();
        let mut f = PathFollower::new();
        assert!(f.plan(&BreadthFirst, &grid, Position::new(0, 0), Position::new(2, 0)));
        assert_eq!(f.remaining(), 2);
        assert_eq!(f.next_step(), Some(Position::new(1, 0)));
        assert_eq!(f.next_step(), Some(Position::new(2, 0)));
        assert!(f.is_travelling());
        assert_eq!(f.next_step(), None);
        assert!(!f.is_travelling());
    }

    #[test]
    fn follower_without_path_is_idle() {
        let grid = Grid::from_rows(vec![vec![0, 1, 0]]).unwrap();
        let mut f = PathFollower::new();
        assert!(!f.plan(&BreadthFirst, &grid, Position::new(0, 0), Position::new(2, 0)));
        assert!(!f.is_travelling());
    }

    // ── Modes ───────────────────────────────────────────────────

    #[test]
    fn random_wanderer_stays_on_routable_cells() {
        let grid = Grid::from_rows(vec![
            vec![0, 0, 0, 0],
            vec![0, 1, 1, 0],
            vec![0, 0, 0, 0],
        ])
        .unwrap();
        let mut index = SpatialIndex::new(4, 3, 2).unwrap();
        let cfg = WandererConfig::new(Position::new(0, 0), WanderMode::Random);
        let mut w = Wanderer::init(AgentId(0), &cfg, 5, &grid, &mut index).unwrap();
        for _ in 0..200 {
            w.tick(&grid, &mut index, &BreadthFirst).unwrap();
            assert!(grid.is_routable_at(w.position()));
            assert_eq!(index.position_of(AgentId(0)), Some(w.position()));
        }
    }

    #[test]
    fn bearing_wanderer_moves_to_neighbours() {
        let (grid, mut index) = open(6, 6);
        let cfg = WandererConfig::new(Position::new(3, 3), WanderMode::Bearing);
        let mut w = Wanderer::init(AgentId(0), &cfg, 9, &grid, &mut index).unwrap();
        for _ in 0..50 {
            let before = w.position();
            let r = w.tick(&grid, &mut index, &BreadthFirst).unwrap();
            assert_eq!(r, MoveResult::Moved);
            assert_eq!(before.chebyshev(w.position()), 1);
            assert_eq!(index.position_of(AgentId(0)), Some(w.position()));
        }
    }

    #[test]
    fn path_follower_reaches_goal() {
        let (grid, mut index) = open(5, 5);
        let goal = Position::new(4, 2);
        let cfg = WandererConfig::new(Position::new(0, 0), WanderMode::PathFollow { goal });
        let mut w = Wanderer::init(AgentId(0), &cfg, 1, &grid, &mut index).unwrap();
        for _ in 0..4 {
            assert_eq!(w.tick(&grid, &mut index, &BreadthFirst).unwrap(), MoveResult::Moved);
        }
        assert_eq!(w.position(), goal);
        assert!(w.goal_reached());
        assert_eq!(w.tick(&grid, &mut index, &BreadthFirst).unwrap(), MoveResult::Stayed);
        assert_eq!(w.position(), goal);
    }

    #[test]
    fn occupied_step_abandons_trip() {
        let (grid, mut index) = open(5, 1);
        index.insert(AgentId(7), Position::new(1, 0)).unwrap();
        let cfg = WandererConfig::new(
            Position::new(0, 0),
            WanderMode::PathFollow {
                goal: Position::new(4, 0),
            },
        );
        let mut w = Wanderer::init(AgentId(0), &cfg, 1, &grid, &mut index).unwrap();
        assert_eq!(w.tick(&grid, &mut index, &BreadthFirst).unwrap(), MoveResult::Blocked);
        assert!(!w.follower().is_travelling());
        assert_eq!(w.position(), Position::new(0, 0));
        index.remove(AgentId(7)).unwrap();
        assert_eq!(w.tick(&grid, &mut index, &BreadthFirst).unwrap(), MoveResult::Moved);
        assert_eq!(w.position(), Position::new(1, 0));
    }

    #[test]
    fn surrounded_random_wanderer_never_moves() {
        let (grid, mut index) = open(3, 3);
        let centre = Position::new(1, 1);
        let mut key = 1;
        for y in 0..3 {
            for x in 0..3 {
                if (x, y) != (1, 1) {
                    index.insert(AgentId(key), Position::new(x, y)).unwrap();
                    key += 1;
                }
            }
        }
        let mut cfg = WandererConfig::new(centre, WanderMode::Random);
        cfg.collision_radius = 1.0;
        let mut w = Wanderer::init(AgentId(0), &cfg, 3, &grid, &mut index).unwrap();
        for _ in 0..100 {
            let r = w.tick(&grid, &mut index, &BreadthFirst).unwrap();
            assert!(!r.moved());
            assert_eq!(w.position(), centre);
        }
        index.check_consistency().unwrap();
    }

    #[test]
    fn diagonal_path_step_onto_occupant_is_blocked() {
        let (grid, mut index) = open(3, 3);
        index.insert(AgentId(7), Position::new(1, 1)).unwrap();
        let goal = Position::new(2, 2);
        let mut cfg = WandererConfig::new(Position::new(0, 0), WanderMode::PathFollow { goal });
        cfg.collision_radius = 1.0;
        let mut w = Wanderer::init(AgentId(0), &cfg, 1, &grid, &mut index).unwrap();
        assert_eq!(w.tick(&grid, &mut index, &BreadthFirst).unwrap(), MoveResult::Blocked);
        assert!(!w.follower().is_travelling());
        assert_eq!(w.position(), Position::new(0, 0));
    }

    #[test]
    fn config_parses_tagged_mode() {
        let cfg: WandererConfig =
            serde_json::from_str(r#"{"start":{"x":1,"y":2},"mode":"path_follow","goal":{"x":3,"y":4}}"#)
                .unwrap();
        assert_eq!(
            cfg.mode,
            WanderMode::PathFollow {
                goal: Position::new(3, 4)
            }
        );
        assert_eq!(cfg.collision_radius, MIN_COLLISION_RADIUS);
    }
}

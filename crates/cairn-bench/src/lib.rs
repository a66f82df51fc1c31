//! Benchmark profiles and utilities for Cairn simulations.
//!
//! - [`reference_profile`]: 64x64 open grid, 16 learners, 16 wanderers
//! - [`obstacle_profile`]: 128x128 grid with scattered obstacles
//! - [`init_agent_positions`]: deterministic placement on routable cells

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::collections::HashSet;

use cairn_core::Position;
use cairn_engine::{GridSource, LearnerSpec, SimulationConfig};
use cairn_learn::{Hyperparameters, WanderMode, WandererConfig};

/// Table path used by the profiles. Pair with an in-memory store.
pub const PROFILE_TABLE: &str = "bench.caqt";

/// 64x64 open grid with 16 learners and 16 wanderers of mixed modes.
pub fn reference_profile(seed: u64) -> SimulationConfig {
    profile(GridSource::Open { width: 64, height: 64 }, 64, 64, 16, 16, seed)
}

/// 128x128 grid, about one cell in seven blocked, 32 learners and 32 wanderers.
pub fn obstacle_profile(seed: u64) -> SimulationConfig {
    let rows = scattered_rows(128, 128, 7);
    profile(GridSource::Rows(rows), 128, 128, 32, 32, seed)
}

fn profile(
    grid: GridSource,
    width: u32,
    height: u32,
    learners: usize,
    wanderers: usize,
    seed: u64,
) -> SimulationConfig {
    let blocked: HashSet<Position> = match &grid {
        GridSource::Rows(rows) => rows
            .iter()
            .enumerate()
            .flat_map(|(y, row)| {
                row.iter()
                    .enumerate()
                    .filter(|&(_, &v)| v != 0)
                    .map(move |(x, _)| Position::new(x as i32, y as i32))
            })
            .collect(),
        _ => HashSet::new(),
    };
    let starts = init_agent_positions(width, height, learners + wanderers, seed, &blocked);
    let far = Position::new(width as i32 - 2, height as i32 - 2);

    let mut config = SimulationConfig::new(grid, PROFILE_TABLE);
    config.seed = seed;
    for (i, &start) in starts[..learners].iter().enumerate() {
        let goal = if i % 2 == 0 { far } else { Position::new(0, height as i32 - 1) };
        config.learners.push(LearnerSpec {
            start,
            goal,
            hyperparameters: Hyperparameters::default(),
            table_path: None,
        });
    }
    for (j, &start) in starts[learners..].iter().enumerate() {
        let mode = match j % 3 {
            0 => WanderMode::Random,
            1 => WanderMode::Bearing,
            _ => WanderMode::PathFollow { goal: far },
        };
        config.wanderers.push(WandererConfig::new(start, mode));
    }
    config
}

/// Obstacle rows in the same pattern as the test fixtures, keeping the
/// canonical start `(1, 1)` open.
pub fn scattered_rows(width: u32, height: u32, every: u32) -> Vec<Vec<i32>> {
    (0..height)
        .map(|y| {
            (0..width)
                .map(|x| {
                    let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) % every.max(1);
                    i32::from(h == 0 && (x, y) != (1, 1))
                })
                .collect()
        })
        .collect()
}

/// Deterministic start cells for `n` agents.
///
/// The first is always the canonical start `(1, 1)`; the rest are spread
/// by a hash of `seed`, linearly probing past blocked or taken cells.
pub fn init_agent_positions(
    width: u32,
    height: u32,
    n: usize,
    seed: u64,
    blocked: &HashSet<Position>,
) -> Vec<Position> {
    let cells = u64::from(width) * u64::from(height);
    let at = |flat: u64| Position::new((flat % u64::from(width)) as i32, (flat / u64::from(width)) as i32);
    let mut taken = HashSet::new();
    let mut positions = Vec::with_capacity(n);
    if n == 0 {
        return positions;
    }
    let canonical = Position::new(1, 1);
    taken.insert(canonical);
    positions.push(canonical);

    for i in 1..n as u64 {
        let mut flat = seed
            .wrapping_mul(6_364_136_223_846_793_005)
            .wrapping_add(i.wrapping_mul(1_442_695_040_888_963_407))
            % cells;
        while taken.contains(&at(flat)) || blocked.contains(&at(flat)) {
            flat = (flat + 1) % cells;
        }
        taken.insert(at(flat));
        positions.push(at(flat));
    }
    positions
}

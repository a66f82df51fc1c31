//! Load a simulation config, run it for a number of ticks, and print a summary.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cairn_core::Occupant;
use cairn_engine::{Simulation, SimulationConfig};
use cairn_learn::FileTableStore;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "cairn-run", version, about = "Run a Cairn grid simulation")]
struct Cli {
    /// Path to the JSON simulation config.
    config: PathBuf,

    /// Number of ticks to run.
    #[arg(short, long, default_value_t = 1000)]
    ticks: u64,

    /// Override the config's master seed.
    #[arg(long)]
    seed: Option<u64>,

    /// Save every learner's table after the run, not only the canonical one.
    #[arg(long)]
    save_all: bool,

    /// Log filter used when RUST_LOG is unset.
    #[arg(long, default_value = "info")]
    log: String,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log);

    let mut config = SimulationConfig::from_json_path(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    if let Some(seed) = cli.seed {
        config.seed = seed;
    }

    let mut sim = Simulation::new(config, FileTableStore).context("initialising simulation")?;
    let totals = sim
        .run(cli.ticks)
        .with_context(|| format!("running {} ticks", cli.ticks))?;
    if cli.save_all {
        sim.checkpoint_all().context("saving value tables")?;
    }

    for agent in sim.agents() {
        if agent.goal_reached() {
            info!(agent = %agent.id(), position = %agent.position(), "at goal");
        } else {
            warn!(agent = %agent.id(), position = %agent.position(), goal = %agent.goal(), "goal not reached");
        }
    }

    println!(
        "ticks={} moved={} stayed={} blocked={} out_of_bounds={} checkpoints={} mean_reward={:.3} total_us={}",
        totals.tick,
        totals.moved,
        totals.stayed,
        totals.blocked,
        totals.out_of_bounds,
        totals.checkpoints,
        totals.mean_reward(),
        totals.total_us,
    );
    Ok(())
}

fn init_tracing(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

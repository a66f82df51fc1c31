use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use cairn_core::{AgentId, Occupant, Position, TickId};
use cairn_engine::{ConfigError, GridSource, LearnerSpec, Simulation, SimulationConfig, SimulationError};
use cairn_learn::{AgentError, FileTableStore, Hyperparameters, TableError, TableStore, WanderMode, WandererConfig};
use cairn_test_utils::{FailingTableStore, MemoryTableStore, ScriptedPathFinder};

fn wall_rows() -> Vec<Vec<i32>> {
    vec![
        vec![0, 0, 1, 0, 0],
        vec![0, 0, 1, 0, 0],
        vec![0, 0, 1, 0, 0],
        vec![0, 0, 1, 0, 0],
        vec![0, 0, 0, 0, 0],
    ]
}

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cairn-engine-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir
}

fn canonical_learner(goal: (i32, i32)) -> LearnerSpec {
    LearnerSpec {
        start: Position::new(1, 1),
        goal: goal.into(),
        hyperparameters: Hyperparameters {
            alpha: 0.5,
            gamma: 0.9,
            epsilon: 0.2,
        },
        table_path: None,
    }
}

#[test]
fn json_config_runs_to_checkpoint_on_disk() {
    let dir = scratch("json");
    let table = dir.join("q.caqt");
    let _ = fs::remove_file(&table);
    let cfg_path = dir.join("sim.json");
    fs::write(
        &cfg_path,
        format!(
            r#"{{
                "grid": {{"open": {{"width": 8, "height": 8}}}},
                "seed": 5,
                "checkpoint_tick": 20,
                "table_path": {table:?},
                "learners": [
                    {{"start": {{"x": 1, "y": 1}}, "goal": {{"x": 6, "y": 6}},
                      "alpha": 0.5, "gamma": 0.9, "epsilon": 0.1}}
                ],
                "wanderers": [
                    {{"start": {{"x": 4, "y": 4}}, "mode": "bearing"}},
                    {{"start": {{"x": 0, "y": 7}}, "mode": "path_follow", "goal": {{"x": 7, "y": 0}}}}
                ]
            }}"#
        ),
    )
    .unwrap();

    let config = SimulationConfig::from_json_path(&cfg_path).unwrap();
    let mut sim = Simulation::new(config, FileTableStore).unwrap();
    let totals = sim.run(25).unwrap();
    assert_eq!(totals.checkpoints, 1);
    assert_eq!(sim.current_tick(), TickId(25));

    let stored = FileTableStore.load(&table).unwrap().unwrap();
    assert_eq!(stored.shape(), (64, 9));
    assert!(stored.as_slice().iter().any(|&v| v != 0.0));
    fs::remove_file(&table).unwrap();
}

#[test]
fn second_run_resumes_from_saved_table() {
    let store = Arc::new(MemoryTableStore::new());
    let mut config = SimulationConfig::new(GridSource::Rows(wall_rows()), "q");
    config.learners.push(canonical_learner((4, 0)));
    config.checkpoint_tick = 50;

    let mut first = Simulation::new(config.clone(), Arc::clone(&store)).unwrap();
    first.run(50).unwrap();
    let saved = store.get("q").unwrap();

    let second = Simulation::new(config, Arc::clone(&store)).unwrap();
    assert_eq!(second.agents()[0].table(), &saved);
    assert_eq!(second.agents()[0].position(), Position::new(1, 1));
}

#[test]
fn exploring_learner_reaches_goal_through_gap() {
    let store = Arc::new(MemoryTableStore::new());
    let mut config = SimulationConfig::new(GridSource::Rows(wall_rows()), "q");
    let mut learner = canonical_learner((4, 0));
    learner.hyperparameters.epsilon = 1.0;
    config.learners.push(learner);
    config.checkpoint_tick = u64::MAX;
    config.seed = 2;
    let mut sim = Simulation::new(config, store).unwrap();
    for _ in 0..5000 {
        sim.step().unwrap();
        let p = sim.agents()[0].position();
        assert!(sim.grid().is_routable_at(p), "learner inside wall at {p}");
        if sim.agents()[0].goal_reached() {
            return;
        }
    }
    panic!("goal not reached in 5000 ticks");
}

#[test]
fn checkpoint_failure_names_the_agent() {
    let mut config = SimulationConfig::new(GridSource::Open { width: 4, height: 4 }, "q");
    config.learners.push(canonical_learner((3, 3)));
    config.checkpoint_tick = 3;
    let mut sim = Simulation::new(config, FailingTableStore::new(0)).unwrap();
    sim.step().unwrap();
    sim.step().unwrap();
    match sim.step().unwrap_err() {
        SimulationError::Agent {
            agent,
            source: AgentError::Table(TableError::Io(_)),
        } => assert_eq!(agent, AgentId(0)),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn scripted_finder_drives_path_wanderer() {
    let mut config = SimulationConfig::new(GridSource::Open { width: 5, height: 5 }, "q");
    let goal = Position::new(0, 2);
    config
        .wanderers
        .push(WandererConfig::new(Position::new(0, 0), WanderMode::PathFollow { goal }));
    let finder = Arc::new(ScriptedPathFinder::new(vec![
        Position::new(0, 0),
        Position::new(0, 1),
        goal,
    ]));
    let mut sim = Simulation::new(config, MemoryTableStore::new())
        .unwrap()
        .with_path_finder(Arc::clone(&finder));
    sim.run(3).unwrap();
    assert_eq!(sim.wanderers()[0].position(), goal);
    assert!(sim.wanderers()[0].goal_reached());
    assert_eq!(finder.calls(), 1);
}

#[test]
fn shape_mismatch_in_store_is_fatal() {
    let store = Arc::new(MemoryTableStore::new());
    store.put("q", cairn_learn::ValueTable::new(4, 9).unwrap());
    let mut config = SimulationConfig::new(GridSource::Open { width: 3, height: 3 }, "q");
    config.learners.push(canonical_learner((2, 2)));
    let err = Simulation::new(config, store).unwrap_err();
    assert!(matches!(
        err,
        SimulationError::Agent {
            source: AgentError::Table(TableError::ShapeMismatch { .. }),
            ..
        }
    ));
}

#[test]
fn missing_grid_csv_is_config_error() {
    let mut config = SimulationConfig::new(GridSource::Csv("/nonexistent/grid.csv".into()), "q");
    config.learners.push(canonical_learner((2, 2)));
    let err = Simulation::new(config, MemoryTableStore::new()).unwrap_err();
    assert!(matches!(err, SimulationError::Config(ConfigError::Grid(_))));
}

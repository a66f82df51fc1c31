use cairn_core::{ActionId, AgentId, Position, StateId, TickId, NUM_ACTIONS};
use cairn_learn::{
    AgentError, FileTableStore, LearnerConfig, LearningAgent, TableError, TableStore, ValueTable,
};
use cairn_space::{Grid, SpatialIndex};
use cairn_test_utils::{FailingTableStore, MemoryTableStore};
use std::fs;
use std::path::PathBuf;

fn scratch(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("cairn-persist-{}-{name}", std::process::id()));
    fs::create_dir_all(&dir).unwrap();
    dir.join("q.caqt")
}

fn filled(rows: usize) -> ValueTable {
    let mut t = ValueTable::new(rows, NUM_ACTIONS).unwrap();
    for s in 0..rows {
        for a in 0..NUM_ACTIONS {
            let v = (s as f64 * 0.1 - a as f64 * 3.7).sin() * 1e3;
            t.set(StateId(s), ActionId(a as u8), v);
        }
    }
    t
}

#[test]
fn file_round_trip_is_bit_identical() {
    let path = scratch("roundtrip");
    let table = filled(5 * 5);
    FileTableStore.save(&table, &path).unwrap();
    let back = FileTableStore.load(&path).unwrap().unwrap();
    assert_eq!(back.shape(), (25, NUM_ACTIONS));
    for (a, b) in table.as_slice().iter().zip(back.as_slice()) {
        assert_eq!(a.to_bits(), b.to_bits());
    }
    fs::remove_file(&path).unwrap();
}

#[test]
fn stored_table_for_other_grid_is_rejected_at_init() {
    let path = scratch("mismatch");
    FileTableStore.save(&filled(4 * 4), &path).unwrap();

    let grid = Grid::open(5, 5).unwrap();
    let mut index = SpatialIndex::new(5, 5, 2).unwrap();
    let cfg = LearnerConfig::new(Position::new(1, 1), Position::new(4, 4), &path);
    let err = LearningAgent::init(AgentId(0), &cfg, &grid, &mut index, &FileTableStore).unwrap_err();
    match err {
        AgentError::Table(TableError::ShapeMismatch {
            expected_rows,
            found_rows,
            ..
        }) => assert_eq!((expected_rows, found_rows), (25, 16)),
        other => panic!("unexpected {other:?}"),
    }
    fs::remove_file(&path).unwrap();
}

#[test]
fn learner_resumes_from_stored_table() {
    let store = MemoryTableStore::new();
    let grid = Grid::open(5, 5).unwrap();
    let mut seeded = ValueTable::for_grid(&grid);
    seeded.set(StateId(6), ActionId(2), 42.0);
    store.put("q", seeded);

    let mut index = SpatialIndex::new(5, 5, 2).unwrap();
    let cfg = LearnerConfig::new(Position::new(1, 1), Position::new(4, 4), "q");
    let agent = LearningAgent::init(AgentId(0), &cfg, &grid, &mut index, &store).unwrap();
    assert_eq!(agent.table().get(StateId(6), ActionId(2)), Some(42.0));
}

#[test]
fn checkpoint_writes_the_learned_table() {
    let store = MemoryTableStore::new();
    let grid = Grid::open(6, 6).unwrap();
    let mut index = SpatialIndex::new(6, 6, 2).unwrap();
    let mut cfg = LearnerConfig::new(Position::new(1, 1), Position::new(4, 4), "q");
    cfg.checkpoint_tick = TickId(20);
    cfg.seed = 17;
    let mut agent = LearningAgent::init(AgentId(0), &cfg, &grid, &mut index, &store).unwrap();
    for t in 1..=25 {
        agent.tick(TickId(t), &grid, &mut index, &store).unwrap();
    }
    assert_eq!(store.save_count(), 1);
    let saved = store.get("q").unwrap();
    assert_eq!(saved.shape(), (36, NUM_ACTIONS));
    assert!(saved.as_slice().iter().any(|&v| v != 0.0));
}

#[test]
fn failed_checkpoint_surfaces_as_error() {
    let store = FailingTableStore::new(0);
    let grid = Grid::open(4, 4).unwrap();
    let mut index = SpatialIndex::new(4, 4, 2).unwrap();
    let mut cfg = LearnerConfig::new(Position::new(1, 1), Position::new(3, 3), "q");
    cfg.checkpoint_tick = TickId(1);
    let mut agent = LearningAgent::init(AgentId(0), &cfg, &grid, &mut index, &store).unwrap();
    let err = agent.tick(TickId(1), &grid, &mut index, &store).unwrap_err();
    assert!(matches!(err, AgentError::Table(TableError::Io(_))));
}

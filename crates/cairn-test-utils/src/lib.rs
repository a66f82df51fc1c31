//! Test fixtures and mock collaborators for Cairn development.
//!
//! Provides an in-memory [`TableStore`](cairn_learn::TableStore), a
//! store that fails on demand, a scripted [`PathFinder`], and a handful
//! of standard grids (see [`fixtures`]).

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use cairn_core::Position;
use cairn_learn::{TableError, TableStore, ValueTable};
use cairn_space::{Grid, PathFinder};

/// [`TableStore`] backed by a map from path to table.
///
/// Pre-populate with [`put`](MemoryTableStore::put); inspect saves with
/// [`get`](MemoryTableStore::get) and [`save_count`](MemoryTableStore::save_count).
#[derive(Default)]
pub struct MemoryTableStore {
    tables: Mutex<HashMap<PathBuf, ValueTable>>,
    saves: AtomicUsize,
}

impl MemoryTableStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `table` at `path` without counting it as a save.
    pub fn put(&self, path: impl Into<PathBuf>, table: ValueTable) {
        self.tables.lock().unwrap().insert(path.into(), table);
    }

    /// The table stored at `path`, if any.
    pub fn get(&self, path: impl AsRef<Path>) -> Option<ValueTable> {
        self.tables.lock().unwrap().get(path.as_ref()).cloned()
    }

    /// Number of [`save`](TableStore::save) calls so far.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::Relaxed)
    }
}

impl TableStore for MemoryTableStore {
    fn load(&self, path: &Path) -> Result<Option<ValueTable>, TableError> {
        Ok(self.get(path))
    }

    fn save(&self, table: &ValueTable, path: &Path) -> Result<(), TableError> {
        self.saves.fetch_add(1, Ordering::Relaxed);
        self.put(path, table.clone());
        Ok(())
    }
}

/// [`TableStore`] that loads nothing and fails every save after the
/// first `succeed_for` saves.
pub struct FailingTableStore {
    succeed_for: usize,
    calls: AtomicUsize,
}

impl FailingTableStore {
    pub fn new(succeed_for: usize) -> Self {
        Self {
            succeed_for,
            calls: AtomicUsize::new(0),
        }
    }
}

impl TableStore for FailingTableStore {
    fn load(&self, _path: &Path) -> Result<Option<ValueTable>, TableError> {
        Ok(None)
    }

    fn save(&self, _table: &ValueTable, path: &Path) -> Result<(), TableError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_for {
            return Err(TableError::Io(io::Error::other(format!(
                "injected failure saving {}",
                path.display()
            ))));
        }
        Ok(())
    }
}

/// [`PathFinder`] returning the same path for every query.
pub struct ScriptedPathFinder {
    pub path: Vec<Position>,
    calls: AtomicUsize,
}

impl ScriptedPathFinder {
    pub fn new(path: Vec<Position>) -> Self {
        Self {
            path,
            calls: AtomicUsize::new(0),
        }
    }

    /// Number of queries answered.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl PathFinder for ScriptedPathFinder {
    fn find_path(&self, _grid: &Grid, _start: Position, _goal: Position) -> Vec<Position> {
        self.calls.fetch_add(1, Ordering::Relaxed);
        self.path.clone()
    }
}

//! Value-table persistence.

use crate::codec::{decode_table, encode_table};
use crate::error::TableError;
use crate::table::ValueTable;
use std::fs::{self, File};
use std::io::{self, BufReader, BufWriter, Write};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Loads and saves value tables by path.
///
/// Implementations decide the storage medium; the path is an opaque key
/// to them.
pub trait TableStore {
    /// Load the table stored at `path`.
    ///
    /// Returns `Ok(None)` when nothing is stored there.
    fn load(&self, path: &Path) -> Result<Option<ValueTable>, TableError>;

    /// Store `table` at `path`, replacing any previous table.
    fn save(&self, table: &ValueTable, path: &Path) -> Result<(), TableError>;
}

impl<S: TableStore + ?Sized> TableStore for Arc<S> {
    fn load(&self, path: &Path) -> Result<Option<ValueTable>, TableError> {
        (**self).load(path)
    }

    fn save(&self, table: &ValueTable, path: &Path) -> Result<(), TableError> {
        (**self).save(table, path)
    }
}

/// [`TableStore`] backed by files in the binary table format.
///
/// Saves write a sibling temporary file and rename it over the target,
/// so a reader never observes a half-written table.
#[derive(Clone, Copy, Debug, Default)]
pub struct FileTableStore;

impl TableStore for FileTableStore {
    fn load(&self, path: &Path) -> Result<Option<ValueTable>, TableError> {
        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no stored table");
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };
        let table = decode_table(&mut BufReader::new(file))?;
        let (rows, cols) = table.shape();
        info!(path = %path.display(), rows, cols, "loaded value table");
        Ok(Some(table))
    }

    fn save(&self, table: &ValueTable, path: &Path) -> Result<(), TableError> {
        let mut tmp = path.as_os_str().to_owned();
        tmp.push(".tmp");
        let tmp = Path::new(&tmp);
        {
            let mut w = BufWriter::new(File::create(tmp)?);
            encode_table(&mut w, table)?;
            w.flush()?;
        }
        fs::rename(tmp, path)?;
        let (rows, cols) = table.shape();
        info!(path = %path.display(), rows, cols, "saved value table");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cairn_core::{ActionId, StateId};
    use std::path::PathBuf;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("cairn-store-{}-{name}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir.join("table.caqt")
    }

    #[test]
    fn missing_file_loads_as_none() {
        let path = scratch("missing");
        let _ = fs::remove_file(&path);
        assert!(FileTableStore.load(&path).unwrap().is_none());
    }

    #[test]
    fn save_replaces_existing_table() {
        let path = scratch("replace");
        let mut t = ValueTable::new(4, 9).unwrap();
        FileTableStore.save(&t, &path).unwrap();
        t.set(StateId(3), ActionId(2), 7.25);
        FileTableStore.save(&t, &path).unwrap();
        let back = FileTableStore.load(&path).unwrap().unwrap();
        assert_eq!(back.get(StateId(3), ActionId(2)), Some(7.25));
        assert!(!path.with_extension("caqt.tmp").exists());
        fs::remove_file(&path).unwrap();
    }

    #[test]
    fn corrupt_file_is_an_error() {
        let path = scratch("corrupt");
        fs::write(&path, b"not a table").unwrap();
        assert!(matches!(
            FileTableStore.load(&path),
            Err(TableError::InvalidMagic)
        ));
        fs::remove_file(&path).unwrap();
    }
}

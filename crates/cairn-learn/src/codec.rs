//! Binary encode/decode for persisted value tables.
//!
//! Layout, all integers little-endian:
//!
//! ```text
//! magic    4 bytes  b"CAQT"
//! version  u8       FORMAT_VERSION
//! rows     u32
//! cols     u32
//! values   rows*cols f64 bit patterns, row-major
//! checksum u64      FNV-1a over rows, cols, and values
//! ```
//!
//! Values are written as raw bit patterns, so a round trip is bit-exact
//! (NaN payloads and signed zeros included).

use std::io::{self, Read, Write};

use crate::error::TableError;
use crate::table::ValueTable;

/// Magic bytes at the start of every table stream.
pub const MAGIC: [u8; 4] = *b"CAQT";

/// Current table format version.
pub const FORMAT_VERSION: u8 = 1;

/// FNV-1a offset basis for 64-bit.
const FNV_OFFSET: u64 = 0xcbf29ce484222325;
/// FNV-1a prime for 64-bit.
const FNV_PRIME: u64 = 0x00000100000001B3;

/// Incremental FNV-1a 64 hasher over little-endian encodings.
#[derive(Clone, Copy, Debug)]
struct Fnv1a(u64);

impl Fnv1a {
    fn new() -> Self {
        Self(FNV_OFFSET)
    }

    fn bytes(&mut self, bytes: &[u8]) {
        for &b in bytes {
            self.0 = (self.0 ^ u64::from(b)).wrapping_mul(FNV_PRIME);
        }
    }

    fn u32(&mut self, v: u32) {
        self.bytes(&v.to_le_bytes());
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    fn finish(self) -> u64 {
        self.0
    }
}

/// FNV-1a 64 checksum of a table's shape and value bits.
pub fn table_checksum(table: &ValueTable) -> u64 {
    let (rows, cols) = table.shape();
    let mut h = Fnv1a::new();
    h.u32(rows as u32);
    h.u32(cols as u32);
    for v in table.as_slice() {
        h.u64(v.to_bits());
    }
    h.finish()
}

// ── Primitive writers ───────────────────────────────────────────

fn write_u8(w: &mut dyn Write, v: u8) -> Result<(), TableError> {
    w.write_all(&[v])?;
    Ok(())
}

fn write_u32_le(w: &mut dyn Write, v: u32) -> Result<(), TableError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

fn write_u64_le(w: &mut dyn Write, v: u64) -> Result<(), TableError> {
    w.write_all(&v.to_le_bytes())?;
    Ok(())
}

// ── Primitive readers ───────────────────────────────────────────

fn read_exact(r: &mut dyn Read, buf: &mut [u8], what: &str) -> Result<(), TableError> {
    r.read_exact(buf).map_err(|e| match e.kind() {
        io::ErrorKind::UnexpectedEof => TableError::Truncated {
            detail: format!("stream ended while reading {what}"),
        },
        _ => TableError::Io(e),
    })
}

fn read_u8(r: &mut dyn Read, what: &str) -> Result<u8, TableError> {
    let mut buf = [0u8; 1];
    read_exact(r, &mut buf, what)?;
    Ok(buf[0])
}

fn read_u32_le(r: &mut dyn Read, what: &str) -> Result<u32, TableError> {
    let mut buf = [0u8; 4];
    read_exact(r, &mut buf, what)?;
    Ok(u32::from_le_bytes(buf))
}

fn read_u64_le(r: &mut dyn Read, what: &str) -> Result<u64, TableError> {
    let mut buf = [0u8; 8];
    read_exact(r, &mut buf, what)?;
    Ok(u64::from_le_bytes(buf))
}

// ── Table codec ─────────────────────────────────────────────────

/// Write `table` in the binary table format.
pub fn encode_table(w: &mut dyn Write, table: &ValueTable) -> Result<(), TableError> {
    let (rows, cols) = table.shape();
    w.write_all(&MAGIC)?;
    write_u8(w, FORMAT_VERSION)?;
    write_u32_le(w, rows as u32)?;
    write_u32_le(w, cols as u32)?;
    for v in table.as_slice() {
        write_u64_le(w, v.to_bits())?;
    }
    write_u64_le(w, table_checksum(table))?;
    Ok(())
}

/// Read one table in the binary table format.
///
/// Validates magic, version, and the trailing checksum.
pub fn decode_table(r: &mut dyn Read) -> Result<ValueTable, TableError> {
    let mut magic = [0u8; 4];
    read_exact(r, &mut magic, "magic")?;
    if magic != MAGIC {
        return Err(TableError::InvalidMagic);
    }
    let version = read_u8(r, "version")?;
    if version != FORMAT_VERSION {
        return Err(TableError::UnsupportedVersion { found: version });
    }
    let rows = read_u32_le(r, "row count")? as usize;
    let cols = read_u32_le(r, "column count")? as usize;
    let len = rows.checked_mul(cols).ok_or_else(|| TableError::Truncated {
        detail: format!("declared shape {rows}x{cols} overflows"),
    })?;

    // Grow as data arrives rather than trusting the header.
    let mut values = Vec::with_capacity(len.min(1 << 20));
    for i in 0..len {
        let bits = read_u64_le(r, &format!("value {i} of {len}"))?;
        values.push(f64::from_bits(bits));
    }
    let stored = read_u64_le(r, "checksum")?;

    let table = ValueTable::from_values(rows, cols, values)?;
    let computed = table_checksum(&table);
    if stored != computed {
        return Err(TableError::ChecksumMismatch { stored, computed });
    }
    Ok(table)
}

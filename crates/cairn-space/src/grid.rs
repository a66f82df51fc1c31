//! Static obstacle grid.

use crate::error::GridError;
use cairn_core::{euclidean, Position, StateId};
use rand::Rng;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Cell value marking a routable (open) cell.
pub const OPEN_CELL: i32 = 0;

/// Immutable `width × height` map of integer cell values.
///
/// Cell `(x, y)` is stored row-major at `y * width + x`, which is also
/// its [`StateId`]. A cell is *routable* iff it is in bounds and holds
/// [`OPEN_CELL`]; any other value is an obstacle.
///
/// Built once at simulation start and never mutated.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    width: u32,
    height: u32,
    cells: Vec<i32>,
}

impl Grid {
    /// Largest accepted dimension: coordinates are `i32`.
    pub const MAX_DIM: usize = i32::MAX as usize;

    /// An all-open grid.
    ///
    /// Returns `Err(GridError::EmptyGrid)` if either dimension is 0.
    pub fn open(width: u32, height: u32) -> Result<Self, GridError> {
        Self::from_cells(width as usize, height as usize, vec![OPEN_CELL; width as usize * height as usize])
    }

    /// Build a grid from rows of cell values; `rows[y][x]`.
    ///
    /// All rows must have the width of the first row.
    pub fn from_rows(rows: Vec<Vec<i32>>) -> Result<Self, GridError> {
        let height = rows.len();
        let width = rows.first().map_or(0, Vec::len);
        let mut cells = Vec::with_capacity(width * height);
        for (row, values) in rows.into_iter().enumerate() {
            if values.len() != width {
                return Err(GridError::RaggedRow {
                    row,
                    expected: width,
                    found: values.len(),
                });
            }
            cells.extend(values);
        }
        Self::from_cells(width, height, cells)
    }

    /// Parse a CSV raster: one grid row per line, comma-separated integers.
    ///
    /// Line `i` (ignoring blank lines) becomes row `y = i`.
    pub fn from_csv_str(text: &str) -> Result<Self, GridError> {
        let mut rows = Vec::new();
        for (line_idx, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            let mut row = Vec::new();
            for (col_idx, raw) in line.split(',').enumerate() {
                let raw = raw.trim();
                let value = raw.parse::<i32>().map_err(|_| GridError::Parse {
                    line: line_idx + 1,
                    column: col_idx + 1,
                    text: raw.to_string(),
                })?;
                row.push(value);
            }
            rows.push(row);
        }
        Self::from_rows(rows)
    }

    /// Read and parse a CSV raster file (see [`from_csv_str`](Self::from_csv_str)).
    pub fn from_csv_path(path: impl AsRef<Path>) -> Result<Self, GridError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        let grid = Self::from_csv_str(&text)?;
        debug!(path = %path.display(), width = grid.width, height = grid.height, "loaded grid raster");
        Ok(grid)
    }

    fn from_cells(width: usize, height: usize, cells: Vec<i32>) -> Result<Self, GridError> {
        if width == 0 || height == 0 {
            return Err(GridError::EmptyGrid);
        }
        if width > Self::MAX_DIM {
            return Err(GridError::DimensionTooLarge {
                name: "width",
                value: width,
                max: Self::MAX_DIM,
            });
        }
        if height > Self::MAX_DIM {
            return Err(GridError::DimensionTooLarge {
                name: "height",
                value: height,
                max: Self::MAX_DIM,
            });
        }
        Ok(Self {
            width: width as u32,
            height: height as u32,
            cells,
        })
    }

    /// Number of columns.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Number of rows.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Total number of cells (`width * height`).
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    /// Whether `pos` lies inside the grid.
    pub fn contains(&self, pos: Position) -> bool {
        pos.x >= 0 && pos.y >= 0 && (pos.x as u32) < self.width && (pos.y as u32) < self.height
    }

    /// The value stored at `pos`, or `None` out of bounds.
    pub fn value(&self, pos: Position) -> Option<i32> {
        self.state_id(pos).map(|s| self.cells[s.0])
    }

    /// True iff `(x, y)` is in bounds and open.
    pub fn is_routable(&self, x: i32, y: i32) -> bool {
        self.value(Position::new(x, y)) == Some(OPEN_CELL)
    }

    /// [`is_routable`](Self::is_routable) for a [`Position`].
    pub fn is_routable_at(&self, pos: Position) -> bool {
        self.is_routable(pos.x, pos.y)
    }

    /// Flattened index `y * width + x`, or `None` out of bounds.
    pub fn state_id(&self, pos: Position) -> Option<StateId> {
        if !self.contains(pos) {
            return None;
        }
        Some(StateId(pos.y as usize * self.width as usize + pos.x as usize))
    }

    /// Inverse of [`state_id`](Self::state_id).
    pub fn position_of(&self, state: StateId) -> Option<Position> {
        if state.0 >= self.cells.len() {
            return None;
        }
        let w = self.width as usize;
        Some(Position::new((state.0 % w) as i32, (state.0 / w) as i32))
    }

    /// Lazily enumerate cells within Euclidean `radius` of `center` whose
    /// value satisfies `predicate`.
    ///
    /// Cells are yielded in row-major order as `(position, value)`. The
    /// iterator is `Clone`, so a query can be restarted from the top.
    /// `center` may lie outside the grid; only in-bounds cells are yielded.
    pub fn explore<P>(&self, center: Position, radius: f64, predicate: P) -> CellExplore<'_, P>
    where
        P: Fn(i32) -> bool,
    {
        CellExplore::new(self, center, radius, predicate)
    }

    /// Pick a random routable cell within `radius` of `center`.
    ///
    /// When more than one candidate exists, `center` itself is never
    /// chosen. Returns `None` if no routable cell is in range.
    pub fn find_routable_goal<R: Rng + ?Sized>(
        &self,
        center: Position,
        radius: f64,
        rng: &mut R,
    ) -> Option<Position> {
        let candidates: Vec<Position> = self
            .explore(center, radius, |v| v == OPEN_CELL)
            .map(|(pos, _)| pos)
            .collect();
        match candidates.len() {
            0 => None,
            1 => Some(candidates[0]),
            _ => {
                let others: Vec<Position> =
                    candidates.into_iter().filter(|p| *p != center).collect();
                Some(others[rng.random_range(0..others.len())])
            }
        }
    }
}

/// Lazy, restartable radius query over a [`Grid`].
///
/// Created by [`Grid::explore`]. Walks the clipped bounding square of the
/// query disk and yields matching cells.
#[derive(Clone)]
pub struct CellExplore<'g, P> {
    grid: &'g Grid,
    center: Position,
    radius: f64,
    predicate: P,
    x_lo: i32,
    x_hi: i32,
    y_hi: i32,
    cursor: Position,
}

impl<'g, P> CellExplore<'g, P>
where
    P: Fn(i32) -> bool,
{
    fn new(grid: &'g Grid, center: Position, radius: f64, predicate: P) -> Self {
        let reach = if radius.is_finite() && radius >= 0.0 {
            radius.floor().min(f64::from(i32::MAX / 2)) as i32
        } else {
            -1
        };
        let max_x = grid.width as i32 - 1;
        let max_y = grid.height as i32 - 1;
        let x_lo = center.x.saturating_sub(reach.max(0)).max(0);
        let x_hi = center.x.saturating_add(reach).min(max_x);
        let y_lo = center.y.saturating_sub(reach.max(0)).max(0);
        let mut y_hi = center.y.saturating_add(reach).min(max_y);
        if reach < 0 {
            // Empty query: start past the end.
            y_hi = y_lo - 1;
        }
        Self {
            grid,
            center,
            radius,
            predicate,
            x_lo,
            x_hi,
            y_hi,
            cursor: Position::new(x_lo, y_lo),
        }
    }
}

impl<P> Iterator for CellExplore<'_, P>
where
    P: Fn(i32) -> bool,
{
    type Item = (Position, i32);

    fn next(&mut self) -> Option<Self::Item> {
        while self.cursor.y <= self.y_hi {
            if self.x_lo > self.x_hi {
                return None;
            }
            let pos = self.cursor;
            if self.cursor.x < self.x_hi {
                self.cursor.x += 1;
            } else {
                self.cursor = Position::new(self.x_lo, self.cursor.y + 1);
            }
            if euclidean(self.center, pos) > self.radius {
                continue;
            }
            let Some(value) = self.grid.value(pos) else {
                continue;
            };
            if (self.predicate)(value) {
                return Some((pos, value));
            }
        }
        None
    }
}

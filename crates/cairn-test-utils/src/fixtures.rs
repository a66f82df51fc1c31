//! Standard grids for tests and benchmarks.
//!
//! Rows are listed with `y = 0` first.

use cairn_core::Position;
use cairn_space::Grid;

/// An all-open `width × height` grid.
pub fn open_grid(width: u32, height: u32) -> Grid {
    Grid::open(width, height).unwrap()
}

/// 5×5 grid with a solid wall along `x = 2` except a gap at `y = 4`.
pub fn wall_with_gap() -> Grid {
    Grid::from_csv_str(
        "0,0,1,0,0\n\
         0,0,1,0,0\n\
         0,0,1,0,0\n\
         0,0,1,0,0\n\
         0,0,0,0,0\n",
    )
    .unwrap()
}

/// The gap cell in [`wall_with_gap`].
pub const WALL_GAP: Position = Position::new(2, 4);

/// `size × size` open grid ringed by obstacles.
pub fn walled_room(size: u32) -> Grid {
    let n = size as usize;
    let rows = (0..n)
        .map(|y| {
            (0..n)
                .map(|x| i32::from(x == 0 || y == 0 || x == n - 1 || y == n - 1))
                .collect()
        })
        .collect();
    Grid::from_rows(rows).unwrap()
}

/// Pseudo-random obstacle field with density about `1 / every`,
/// keeping `(1, 1)` open. Deterministic in `width`, `height`, and `every`.
pub fn scattered(width: u32, height: u32, every: u32) -> Grid {
    let mut rows = Vec::with_capacity(height as usize);
    for y in 0..height {
        let mut row = Vec::with_capacity(width as usize);
        for x in 0..width {
            let h = (x.wrapping_mul(73_856_093) ^ y.wrapping_mul(19_349_663)) % every.max(1);
            let blocked = h == 0 && (x, y) != (1, 1);
            row.push(i32::from(blocked));
        }
        rows.push(row);
    }
    Grid::from_rows(rows).unwrap()
}

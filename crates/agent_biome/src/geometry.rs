use serde::{Deserialize, Serialize};
use std::fmt;

/// A cell coordinate on a dish lattice. `(0, 0)` is the top-left cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct GridPos {
    pub x: u32,
    pub y: u32,
}

impl GridPos {
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Returns the cell displaced by `(dx, dy)`, or `None` when it would leave
    /// the non-negative quadrant. Upper bounds are checked by the dish.
    pub fn offset(self, dx: i32, dy: i32) -> Option<GridPos> {
        let x = i64::from(self.x) + i64::from(dx);
        let y = i64::from(self.y) + i64::from(dy);
        if x < 0 || y < 0 || x > i64::from(u32::MAX) || y > i64::from(u32::MAX) {
            return None;
        }
        Some(GridPos::new(x as u32, y as u32))
    }
}

impl fmt::Display for GridPos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

impl From<(u32, u32)> for GridPos {
    fn from((x, y): (u32, u32)) -> Self {
        GridPos::new(x, y)
    }
}

/// Fixed scan order for the eight Moore-adjacent cells: row by row, top to
/// bottom, left to right, skipping the center.
pub const MOORE_OFFSETS: [(i32, i32); 8] = [
    (-1, -1),
    (0, -1),
    (1, -1),
    (-1, 0),
    (1, 0),
    (-1, 1),
    (0, 1),
    (1, 1),
];

pub fn chebyshev_distance(a: GridPos, b: GridPos) -> u32 {
    let dx = a.x.abs_diff(b.x);
    let dy = a.y.abs_diff(b.y);
    dx.max(dy)
}

/// True when `a` and `b` are distinct, touching cells (Chebyshev distance 1).
pub fn is_moore_adjacent(a: GridPos, b: GridPos) -> bool {
    chebyshev_distance(a, b) == 1
}

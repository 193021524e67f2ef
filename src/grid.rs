// Static description of the map the robot drives on

use std::{collections::HashSet, fmt, str::FromStr};

use itertools::iproduct;
use serde::{Deserialize, Serialize};

use crate::errors::ConsoleError;

/// A (row, col) grid coordinate.
///
/// Coordinates are signed so that values coming from the pointer or from the
/// backend can be represented before they are bounds-checked against a
/// [`GridModel`]. On the wire a cell is a `[row, col]` pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[i32; 2]", into = "[i32; 2]")]
pub struct Cell {
    pub row: i32,
    pub col: i32,
}

impl Cell {
    pub const fn new(row: i32, col: i32) -> Self {
        Self { row, col }
    }
}

impl From<[i32; 2]> for Cell {
    fn from([row, col]: [i32; 2]) -> Self {
        Self { row, col }
    }
}

impl From<Cell> for [i32; 2] {
    fn from(cell: Cell) -> Self {
        [cell.row, cell.col]
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// Parses the `ROW,COL` form used on the command line.
impl FromStr for Cell {
    type Err = ConsoleError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let invalid = || ConsoleError::InvalidCellArgument {
            value: value.to_string(),
        };
        let (row, col) = value.split_once(',').ok_or_else(invalid)?;
        let row = row.trim().parse::<i32>().map_err(|_| invalid())?;
        let col = col.trim().parse::<i32>().map_err(|_| invalid())?;
        Ok(Self { row, col })
    }
}

/// Fixed R×C map with a set of obstacle cells. Built once at startup and
/// never mutated afterwards.
#[derive(Debug, Clone)]
pub struct GridModel {
    rows: i32,
    cols: i32,
    cell_size_px: f32,
    obstacles: HashSet<Cell>,
}

impl GridModel {
    pub fn new(
        rows: i32,
        cols: i32,
        cell_size_px: f32,
        obstacles: impl IntoIterator<Item = Cell>,
    ) -> Self {
        Self {
            rows: rows.max(0),
            cols: cols.max(0),
            cell_size_px,
            obstacles: obstacles.into_iter().collect(),
        }
    }

    pub fn rows(&self) -> i32 {
        self.rows
    }

    pub fn cols(&self) -> i32 {
        self.cols
    }

    pub fn cell_size_px(&self) -> f32 {
        self.cell_size_px
    }

    /// Surface size in pixels (width, height).
    pub fn pixel_size(&self) -> (f32, f32) {
        (
            self.cols as f32 * self.cell_size_px,
            self.rows as f32 * self.cell_size_px,
        )
    }

    pub fn is_valid(&self, cell: Cell) -> bool {
        (0..self.rows).contains(&cell.row) && (0..self.cols).contains(&cell.col)
    }

    pub fn is_obstacle(&self, cell: Cell) -> bool {
        self.obstacles.contains(&cell)
    }

    /// In bounds and not an obstacle.
    pub fn is_selectable(&self, cell: Cell) -> bool {
        self.is_valid(cell) && !self.is_obstacle(cell)
    }

    /// Maps a pointer position, relative to the top-left corner of the map
    /// surface, to the cell under it. Positions outside the grid map to `None`.
    pub fn cell_at(&self, x: f32, y: f32) -> Option<Cell> {
        if !x.is_finite() || !y.is_finite() || self.cell_size_px <= 0. {
            return None;
        }
        let row = (y / self.cell_size_px).floor();
        let col = (x / self.cell_size_px).floor();
        if row < 0. || col < 0. || row >= self.rows as f32 || col >= self.cols as f32 {
            return None;
        }
        Some(Cell::new(row as i32, col as i32))
    }

    /// Every cell in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = Cell> + '_ {
        iproduct!(0..self.rows, 0..self.cols).map(|(row, col)| Cell::new(row, col))
    }

    pub fn obstacles(&self) -> impl Iterator<Item = Cell> + '_ {
        self.obstacles.iter().copied()
    }
}

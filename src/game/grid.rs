//! One player's 10x10 board: placement legality, shot resolution, win detection

use super::ships::{Rotation, ShipShape};

/// Board edge length
pub const GRID_SIZE: usize = 10;

/// State of a single board cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Ship,
    Hit,
    Miss,
}

/// Result of a resolved shot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShotOutcome {
    Hit,
    Miss,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PlacementError {
    #[error("ship cell ({row}, {col}) lies outside the grid")]
    OutOfBounds { row: i64, col: i64 },

    #[error("cell ({row}, {col}) is already occupied")]
    Overlap { row: usize, col: usize },

    #[error("cell ({row}, {col}) touches another ship")]
    Adjacent { row: usize, col: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("shot ({row}, {col}) lies outside the grid")]
pub struct ShotOutOfBounds {
    pub row: i64,
    pub col: i64,
}

const NEIGHBOURS: [(i64, i64); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

fn index(row: i64, col: i64) -> Option<(usize, usize)> {
    let size = GRID_SIZE as i64;
    if (0..size).contains(&row) && (0..size).contains(&col) {
        Some((row as usize, col as usize))
    } else {
        None
    }
}

/// A player's board. Coordinates are 0-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    pub fn new() -> Self {
        Self {
            cells: [[Cell::Empty; GRID_SIZE]; GRID_SIZE],
        }
    }

    pub fn cell(&self, row: i64, col: i64) -> Option<Cell> {
        index(row, col).map(|(r, c)| self.cells[r][c])
    }

    /// Number of cells currently in `state`
    pub fn count(&self, state: Cell) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|&&cell| cell == state)
            .count()
    }

    fn touches_ship(&self, row: usize, col: usize) -> bool {
        NEIGHBOURS.iter().any(|(dr, dc)| {
            index(row as i64 + dr, col as i64 + dc)
                .map(|(r, c)| self.cells[r][c] == Cell::Ship)
                .unwrap_or(false)
        })
    }

    /// Place `shape` rotated by `rotation` with its bounding box at the origin.
    ///
    /// Every target cell must be inside the grid, empty, and not adjacent
    /// (8-way) to an existing ship. Nothing is written unless all cells pass.
    /// Returns the number of cells that became `Ship`.
    pub fn place(
        &mut self,
        origin_row: i64,
        origin_col: i64,
        shape: ShipShape,
        rotation: Rotation,
    ) -> Result<usize, PlacementError> {
        let matrix = shape.matrix().rotate(rotation);
        let mut targets = Vec::with_capacity(matrix.cell_count());

        for (i, j) in matrix.occupied() {
            let row = origin_row + i as i64;
            let col = origin_col + j as i64;

            let (r, c) = index(row, col).ok_or(PlacementError::OutOfBounds { row, col })?;
            if self.cells[r][c] != Cell::Empty {
                return Err(PlacementError::Overlap { row: r, col: c });
            }
            if self.touches_ship(r, c) {
                return Err(PlacementError::Adjacent { row: r, col: c });
            }
            targets.push((r, c));
        }

        for &(r, c) in &targets {
            self.cells[r][c] = Cell::Ship;
        }

        Ok(targets.len())
    }

    /// Resolve a shot. Repeating a shot answers with the stored result.
    pub fn shoot(&mut self, row: i64, col: i64) -> Result<ShotOutcome, ShotOutOfBounds> {
        let (r, c) = index(row, col).ok_or(ShotOutOfBounds { row, col })?;
        let cell = &mut self.cells[r][c];

        let outcome = match *cell {
            Cell::Ship | Cell::Hit => {
                *cell = Cell::Hit;
                ShotOutcome::Hit
            }
            Cell::Empty | Cell::Miss => {
                *cell = Cell::Miss;
                ShotOutcome::Miss
            }
        };

        Ok(outcome)
    }

    /// True when no unsunk ship cell remains
    pub fn all_sunk(&self) -> bool {
        self.count(Cell::Ship) == 0
    }
}

impl Default for Grid {
    fn default() -> Self {
        Self::new()
    }
}

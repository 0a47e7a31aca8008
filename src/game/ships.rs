//! Ship catalog and the rotation transform applied before placement

use std::fmt;
use std::str::FromStr;

/// Named ship shapes available to every player
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ShipShape {
    LShape,
    TShape,
    OneShape,
    TwoShape,
    ThreeShape,
    FourShape,
}

impl ShipShape {
    pub const ALL: [ShipShape; 6] = [
        ShipShape::LShape,
        ShipShape::TShape,
        ShipShape::OneShape,
        ShipShape::TwoShape,
        ShipShape::ThreeShape,
        ShipShape::FourShape,
    ];

    /// Wire name of the shape
    pub fn name(self) -> &'static str {
        match self {
            ShipShape::LShape => "L_SHAPE",
            ShipShape::TShape => "T_SHAPE",
            ShipShape::OneShape => "ONE_SHAPE",
            ShipShape::TwoShape => "TWO_SHAPE",
            ShipShape::ThreeShape => "THREE_SHAPE",
            ShipShape::FourShape => "FOUR_SHAPE",
        }
    }

    fn rows(self) -> &'static [&'static [u8]] {
        match self {
            ShipShape::LShape => &[&[1, 0], &[1, 0], &[1, 1]],
            ShipShape::TShape => &[&[1, 1, 1], &[0, 1, 0]],
            ShipShape::OneShape => &[&[1]],
            ShipShape::TwoShape => &[&[1], &[1]],
            ShipShape::ThreeShape => &[&[1], &[1], &[1]],
            ShipShape::FourShape => &[&[1], &[1], &[1], &[1]],
        }
    }

    /// Base (unrotated) cell matrix
    pub fn matrix(self) -> ShapeMatrix {
        ShapeMatrix {
            cells: self
                .rows()
                .iter()
                .map(|row| row.iter().map(|&c| c == 1).collect())
                .collect(),
        }
    }

    /// Number of occupied cells
    pub fn cell_count(self) -> usize {
        self.matrix().cell_count()
    }
}

impl fmt::Display for ShipShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown ship shape: {0}")]
pub struct UnknownShape(pub String);

impl FromStr for ShipShape {
    type Err = UnknownShape;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ShipShape::ALL
            .into_iter()
            .find(|shape| shape.name() == s)
            .ok_or_else(|| UnknownShape(s.to_string()))
    }
}

/// Clockwise rotation applied to a shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Map a wire rotation code (0-3) to a rotation
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Rotation::Deg0),
            1 => Some(Rotation::Deg90),
            2 => Some(Rotation::Deg180),
            3 => Some(Rotation::Deg270),
            _ => None,
        }
    }

    pub fn code(self) -> u8 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }
}

/// Rectangular present/absent matrix describing a ship footprint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapeMatrix {
    cells: Vec<Vec<bool>>,
}

impl ShapeMatrix {
    pub fn rows(&self) -> usize {
        self.cells.len()
    }

    pub fn cols(&self) -> usize {
        self.cells.first().map(Vec::len).unwrap_or(0)
    }

    /// Offsets of every occupied cell, row-major
    pub fn occupied(&self) -> impl Iterator<Item = (usize, usize)> + '_ {
        self.cells.iter().enumerate().flat_map(|(i, row)| {
            row.iter()
                .enumerate()
                .filter(|(_, &set)| set)
                .map(move |(j, _)| (i, j))
        })
    }

    pub fn cell_count(&self) -> usize {
        self.occupied().count()
    }

    /// Rotate clockwise. Pure transform, the receiver is untouched.
    pub fn rotate(&self, rotation: Rotation) -> ShapeMatrix {
        let rows = self.rows();
        let cols = self.cols();

        let (out_rows, out_cols) = match rotation {
            Rotation::Deg0 | Rotation::Deg180 => (rows, cols),
            Rotation::Deg90 | Rotation::Deg270 => (cols, rows),
        };
        let mut cells = vec![vec![false; out_cols]; out_rows];

        for i in 0..rows {
            for j in 0..cols {
                let (r, c) = match rotation {
                    Rotation::Deg0 => (i, j),
                    Rotation::Deg90 => (j, rows - 1 - i),
                    Rotation::Deg180 => (rows - 1 - i, cols - 1 - j),
                    Rotation::Deg270 => (cols - 1 - j, i),
                };
                cells[r][c] = self.cells[i][j];
            }
        }

        ShapeMatrix { cells }
    }
}

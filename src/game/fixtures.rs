//! Shared test data: a legal seven-ship fleet in wire coordinates

use super::ships::{Rotation, ShipShape};

/// (row, col, shape, rotation) placements, all unrotated
pub const FLEET: &[(i32, i32, ShipShape, Rotation)] = &[
    (1, 1, ShipShape::OneShape, Rotation::Deg0),
    (1, 3, ShipShape::OneShape, Rotation::Deg0),
    (1, 5, ShipShape::TwoShape, Rotation::Deg0),
    (1, 7, ShipShape::TwoShape, Rotation::Deg0),
    (1, 9, ShipShape::ThreeShape, Rotation::Deg0),
    (5, 1, ShipShape::ThreeShape, Rotation::Deg0),
    (5, 3, ShipShape::TShape, Rotation::Deg0),
];

/// Every ship cell covered by `FLEET`
pub const FLEET_CELLS: &[(i32, i32)] = &[
    (1, 1),
    (1, 3),
    (1, 5),
    (2, 5),
    (1, 7),
    (2, 7),
    (1, 9),
    (2, 9),
    (3, 9),
    (5, 1),
    (6, 1),
    (7, 1),
    (5, 3),
    (5, 4),
    (5, 5),
    (6, 4),
];

/// PLACE lines for `FLEET`
pub fn fleet_commands() -> Vec<String> {
    FLEET
        .iter()
        .map(|(row, col, shape, rotation)| {
            format!("PLACE {row} {col} {shape} {}", rotation.code())
        })
        .collect()
}

//! Placement policy knobs

use std::collections::HashMap;

use super::ships::ShipShape;

/// Policy constants for a match
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GameRules {
    /// Ships each player must place before the battle phase starts
    pub min_ships_for_battle: u32,
    /// Placements allowed per shape unless overridden
    pub default_shape_quota: u32,
    /// Per-shape placement limits
    pub shape_quotas: HashMap<ShipShape, u32>,
}

impl GameRules {
    pub fn quota_for(&self, shape: ShipShape) -> u32 {
        self.shape_quotas
            .get(&shape)
            .copied()
            .unwrap_or(self.default_shape_quota)
    }

    /// Most ships a single player could ever place under these quotas
    pub fn max_ships(&self) -> u32 {
        ShipShape::ALL.iter().map(|&s| self.quota_for(s)).sum()
    }
}

impl Default for GameRules {
    fn default() -> Self {
        Self {
            min_ships_for_battle: 7,
            default_shape_quota: 2,
            shape_quotas: HashMap::from([(ShipShape::FourShape, 1)]),
        }
    }
}

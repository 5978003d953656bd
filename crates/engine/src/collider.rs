use crate::math::TileCoord;
use crate::tilemap::SharedTilemap;
use serde::{Deserialize, Serialize};

/// JSON shape of a tilemap collider's layer configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TilemapColliderDef {
    pub collision_layer: u32,
    pub collides_with_layers: u32,
}

/// Solidity view over a tile grid: a cell is solid while it holds any tile
/// id other than -1. Holds no state of its own beyond the layer masks.
pub struct TilemapCollider {
    tilemap: SharedTilemap<i32>,
    collision_layer: u32,
    collides_with: u32,
}

impl TilemapCollider {
    pub fn new(tilemap: SharedTilemap<i32>, def: TilemapColliderDef) -> Self {
        Self {
            tilemap,
            collision_layer: def.collision_layer,
            collides_with: def.collides_with_layers,
        }
    }

    pub fn collision_layer(&self) -> u32 {
        self.collision_layer
    }

    pub fn collides_with_layer(&self, layer_mask: u32) -> bool {
        self.collides_with & layer_mask != 0
    }

    /// Out-of-bounds cells are not solid.
    pub fn is_solid(&self, coord: TileCoord) -> bool {
        self.tilemap
            .borrow()
            .get(coord)
            .is_some_and(|id| *id != -1)
    }
}

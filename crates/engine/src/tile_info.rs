use crate::loot::LootTable;
use serde::{Deserialize, Serialize};

/// Static metadata for one tile type.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TileInfo {
    #[serde(default)]
    pub loot_table: LootTable,
}

/// JSON shape of the tile registry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TileInfoDef {
    #[serde(default)]
    pub tile_info: Vec<TileInfo>,
}

/// Registry of tile metadata, indexed by tile id.
#[derive(Debug, Default)]
pub struct TileInfoSystem {
    infos: Vec<TileInfo>,
}

impl TileInfoSystem {
    pub fn new(infos: Vec<TileInfo>) -> Self {
        Self { infos }
    }

    pub fn from_def(def: TileInfoDef) -> Self {
        Self::new(def.tile_info)
    }

    /// `None` for the empty tile (-1) and for ids past the registry.
    pub fn info(&self, tile_id: i32) -> Option<&TileInfo> {
        if tile_id < 0 {
            return None;
        }
        self.infos.get(tile_id as usize)
    }

    pub fn len(&self) -> usize {
        self.infos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.infos.is_empty()
    }
}

pub mod archetype;
pub mod collider;
pub mod connector;
pub mod destructible;
pub mod dropper;
pub mod entity;
pub mod loot;
pub mod math;
pub mod pathfind;
pub mod services;
pub mod text;
pub mod tile_info;
pub mod tilemap;

pub use archetype::{ArchetypeDatabase, ArchetypeError, ItemArchetypeDef};
pub use collider::{TilemapCollider, TilemapColliderDef};
pub use connector::{TextureConnectorDef, TilemapTextureConnector};
pub use destructible::{DestructibleDef, DestructibleTilemap};
pub use dropper::{ItemDropperDef, TilemapItemDropper};
pub use entity::{Entity, EntityId, EntityWorld};
pub use loot::{ItemStack, LootTable, TableEntry};
pub use math::{transform_handle, TileCoord, Transform, TransformHandle, Vec2};
pub use pathfind::{
    FlowField, Node, NodeKind, PathfindSystem, PathfinderSource, PathfinderTarget,
    PathfinderTargetDef, Priority,
};
pub use services::Services;
pub use text::TextTilemap;
pub use tile_info::{TileInfo, TileInfoDef, TileInfoSystem};
pub use tilemap::{SharedTilemap, SubscriberId, Tilemap, TilemapDef, TilemapError};

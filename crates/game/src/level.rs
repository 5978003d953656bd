use quarry_engine::archetype::ArchetypeError;
use quarry_engine::{
    transform_handle, DestructibleDef, DestructibleTilemap, ItemArchetypeDef, ItemDropperDef,
    PathfinderSource, PathfinderTarget, PathfinderTargetDef, Services, SharedTilemap,
    SubscriberId, TextureConnectorDef, TileCoord, TileInfo, Tilemap, TilemapCollider,
    TilemapColliderDef, TilemapDef, TilemapError, TilemapItemDropper, TilemapTextureConnector,
    Vec2,
};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use thiserror::Error;

// Subscriber ids for the level grid's overlays.
const SUB_DESTRUCTIBLE: SubscriberId = SubscriberId(1);
const SUB_CONNECTOR: SubscriberId = SubscriberId(2);
const SUB_DROPPER: SubscriberId = SubscriberId(3);
const SUB_PATHFIND: SubscriberId = SubscriberId(4);

/// A pathfinder target placed at a fixed world position by the level file.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LevelTargetDef {
    pub position: [f32; 2],
    #[serde(flatten)]
    pub target: PathfinderTargetDef,
}

/// Everything a level brings: the tile grid plus the configuration of each
/// overlay component and the content databases.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct LevelDef {
    pub tilemap: TilemapDef<i32>,
    pub collider: TilemapColliderDef,
    pub destructible: DestructibleDef,
    pub texture_connector: TextureConnectorDef,
    pub item_dropper: ItemDropperDef,
    pub pathfinder_source: PathfinderSource,
    #[serde(default)]
    pub tile_info: Vec<TileInfo>,
    #[serde(default)]
    pub archetypes: Vec<ItemArchetypeDef>,
    #[serde(default)]
    pub targets: Vec<LevelTargetDef>,
}

#[derive(Debug, Error)]
pub enum LevelError {
    #[error("parse level json at {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("level tilemap: {0}")]
    Tilemap(#[from] TilemapError),
    #[error("level archetypes: {0}")]
    Archetypes(#[from] ArchetypeError),
}

/// Parses a level file, reporting the JSON path of whatever field failed.
pub fn parse_level_def(raw: &str) -> Result<LevelDef, LevelError> {
    let mut deserializer = serde_json::Deserializer::from_str(raw);
    serde_path_to_error::deserialize::<_, LevelDef>(&mut deserializer).map_err(|error| {
        let path = error.path().to_string();
        LevelError::Parse {
            path,
            source: error.into_inner(),
        }
    })
}

/// A loaded level: the tile grid with every overlay wired to it. `exit`
/// (or drop) releases the subscriptions and the pathfinder binding.
pub struct LevelScene {
    tilemap: SharedTilemap<i32>,
    collider: TilemapCollider,
    destructible: DestructibleTilemap,
    connector: TilemapTextureConnector,
    dropper: TilemapItemDropper,
    targets: Vec<Rc<RefCell<PathfinderTarget>>>,
}

impl std::fmt::Debug for LevelScene {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LevelScene").finish_non_exhaustive()
    }
}

impl LevelScene {
    pub fn enter(def: &LevelDef, services: &mut Services) -> Result<Self, LevelError> {
        let tilemap = Tilemap::from_def(def.tilemap.clone(), Vec2::ZERO)?.into_shared();

        let collider = TilemapCollider::new(tilemap.clone(), def.collider);

        let mut destructible =
            DestructibleTilemap::new(tilemap.clone(), def.destructible.clone());
        destructible.connect(SUB_DESTRUCTIBLE);

        let mut connector =
            TilemapTextureConnector::new(tilemap.clone(), def.texture_connector.clone());
        connector.connect(SUB_CONNECTOR);

        let mut dropper = TilemapItemDropper::new(tilemap.clone());
        dropper.connect(
            SUB_DROPPER,
            def.item_dropper.clone(),
            services.tile_info.clone(),
            services.archetypes.clone(),
            services.entities.clone(),
            services.rng.clone(),
        );

        services.pathfind.set_active_tilemap(
            tilemap.clone(),
            def.pathfinder_source.clone(),
            SUB_PATHFIND,
        );
        let mut targets = Vec::with_capacity(def.targets.len());
        for target_def in &def.targets {
            let target = Rc::new(RefCell::new(PathfinderTarget::new(
                transform_handle(Vec2::new(target_def.position[0], target_def.position[1])),
                target_def.target,
            )));
            services.pathfind.register_target(target.clone());
            targets.push(target);
        }

        Ok(Self {
            tilemap,
            collider,
            destructible,
            connector,
            dropper,
            targets,
        })
    }

    /// One fixed-step frame: drive the pathfinder worker, move item
    /// entities, then make mid-frame spawns visible.
    pub fn update(&mut self, dt_seconds: f32, services: &mut Services) {
        services.pathfind.tick();
        let mut entities = services.entities.borrow_mut();
        entities.integrate(dt_seconds);
        entities.apply_pending();
    }

    pub fn exit(&mut self, services: &mut Services) {
        services.pathfind.clear_targets();
        services.pathfind.clear_active_tilemap();
        self.targets.clear();
        self.dropper.disconnect();
        self.connector.disconnect();
        self.destructible.disconnect();
    }

    pub fn tilemap(&self) -> SharedTilemap<i32> {
        self.tilemap.clone()
    }

    pub fn collider(&self) -> &TilemapCollider {
        &self.collider
    }

    pub fn destructible(&mut self) -> &mut DestructibleTilemap {
        &mut self.destructible
    }

    pub fn connector(&self) -> &TilemapTextureConnector {
        &self.connector
    }

    pub fn targets(&self) -> &[Rc<RefCell<PathfinderTarget>>] {
        &self.targets
    }

    pub fn tile_center(&self, x: i32, y: i32) -> Vec2 {
        self.tilemap.borrow().tile_to_world(TileCoord::new(x, y))
    }
}

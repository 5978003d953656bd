use crate::archetype::ArchetypeDatabase;
use crate::entity::EntityWorld;
use crate::math::Vec2;
use crate::tile_info::TileInfoSystem;
use crate::tilemap::{SharedTilemap, SubscriberId};
use rand::rngs::StdRng;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::f32::consts::TAU;
use std::rc::Rc;
use tracing::warn;

/// JSON shape of the item dropper.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ItemDropperDef {
    pub item_archetype: String,
    #[serde(default)]
    pub max_initial_velocity: f32,
    #[serde(default)]
    pub item_spawn_radius: f32,
}

/// Spawns item entities when tiles leave the grid. Whenever a cell's id
/// changes away from a tile that has loot, the loot is rolled and each
/// resulting stack is queued as an item entity scattered around the tile's
/// world center.
pub struct TilemapItemDropper {
    tilemap: SharedTilemap<i32>,
    subscription: Option<SubscriberId>,
}

impl TilemapItemDropper {
    pub fn new(tilemap: SharedTilemap<i32>) -> Self {
        Self {
            tilemap,
            subscription: None,
        }
    }

    pub fn connect(
        &mut self,
        id: SubscriberId,
        def: ItemDropperDef,
        tile_info: Rc<TileInfoSystem>,
        archetypes: Rc<ArchetypeDatabase>,
        entities: Rc<RefCell<EntityWorld>>,
        rng: Rc<RefCell<StdRng>>,
    ) {
        self.tilemap.borrow_mut().subscribe(
            id,
            Box::new(move |map, coord, previous| {
                if coord.is_whole_map() {
                    return;
                }
                let Some(info) = tile_info.info(*previous) else {
                    return;
                };
                if archetypes.get(&def.item_archetype).is_none() {
                    warn!(
                        archetype = %def.item_archetype,
                        tile_id = *previous,
                        "item archetype not found, dropping no loot"
                    );
                    return;
                }
                let center = map.tile_to_world(coord);
                // Defs with negative scatter values collapse to no scatter.
                let radius = def.item_spawn_radius.max(0.0);
                let max_speed = def.max_initial_velocity.max(0.0);
                let mut rng = rng.borrow_mut();
                for stack in info.loot_table.generate_loot(&mut *rng) {
                    let offset = Vec2::new(
                        rng.random_range(-radius..=radius),
                        rng.random_range(-radius..=radius),
                    );
                    let angle = rng.random_range(0.0..TAU);
                    let speed = rng.random_range(0.0..=max_speed);
                    let velocity = Vec2::new(angle.cos(), angle.sin()) * speed;
                    entities.borrow_mut().spawn(
                        &def.item_archetype,
                        center + offset,
                        velocity,
                        Some(stack),
                    );
                }
            }),
        );
        self.subscription = Some(id);
    }

    pub fn disconnect(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.tilemap.borrow_mut().unsubscribe(id);
        }
    }
}

impl Drop for TilemapItemDropper {
    fn drop(&mut self) {
        self.disconnect();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archetype::ItemArchetypeDef;
    use crate::loot::{ItemStack, LootTable, TableEntry};
    use crate::math::TileCoord;
    use crate::tile_info::TileInfo;
    use crate::tilemap::Tilemap;
    use rand::SeedableRng;

    fn stone_info() -> TileInfo {
        TileInfo {
            loot_table: LootTable {
                entries: vec![TableEntry {
                    item_ids: vec![7],
                    min_count: 2,
                    max_count: 2,
                    probability: 1.0,
                    weight: 1.0,
                    allow_multiple_rolls: false,
                }],
                ..LootTable::default()
            },
        }
    }

    struct Fixture {
        tilemap: SharedTilemap<i32>,
        entities: Rc<RefCell<EntityWorld>>,
        _dropper: TilemapItemDropper,
    }

    fn fixture(archetype_known: bool) -> Fixture {
        fixture_with(
            archetype_known,
            ItemDropperDef {
                item_archetype: "rock_item".to_string(),
                max_initial_velocity: 4.0,
                item_spawn_radius: 0.5,
            },
        )
    }

    fn fixture_with(archetype_known: bool, def: ItemDropperDef) -> Fixture {
        let mut map = Tilemap::new(2, 2).expect("tilemap");
        map.replace_all(vec![3, 3, -1, -1]).expect("cells");
        map.set_tile_scale(Vec2::new(2.0, 2.0));
        let tilemap = map.into_shared();

        // Ids 0..=2 carry no loot; id 3 drops two of item 7.
        let tile_info = Rc::new(TileInfoSystem::new(vec![
            TileInfo::default(),
            TileInfo::default(),
            TileInfo::default(),
            stone_info(),
        ]));
        let archetypes = Rc::new(
            ArchetypeDatabase::from_defs(if archetype_known {
                vec![ItemArchetypeDef {
                    name: "rock_item".to_string(),
                    sprite: String::new(),
                }]
            } else {
                Vec::new()
            })
            .expect("archetypes"),
        );
        let entities = Rc::new(RefCell::new(EntityWorld::default()));
        let rng = Rc::new(RefCell::new(StdRng::seed_from_u64(7)));

        let mut dropper = TilemapItemDropper::new(tilemap.clone());
        dropper.connect(SubscriberId(3), def, tile_info, archetypes, entities.clone(), rng);
        Fixture {
            tilemap,
            entities,
            _dropper: dropper,
        }
    }

    #[test]
    fn destroying_a_loot_tile_spawns_its_stack() {
        let fixture = fixture(true);
        fixture.tilemap.borrow_mut().set(TileCoord::new(1, 0), -1);

        let mut entities = fixture.entities.borrow_mut();
        assert_eq!(entities.pending_spawn_count(), 1);
        entities.apply_pending();
        let entity = &entities.entities()[0];
        assert_eq!(entity.archetype, "rock_item");
        assert_eq!(entity.item_stack, Some(ItemStack { item_id: 7, count: 2 }));

        let center = fixture.tilemap.borrow().tile_to_world(TileCoord::new(1, 0));
        let position = entity.transform.borrow().position;
        assert!((position.x - center.x).abs() <= 0.5);
        assert!((position.y - center.y).abs() <= 0.5);
        assert!(entity.velocity.length() <= 4.0 + 1e-4);
    }

    #[test]
    fn negative_scatter_values_spawn_at_the_tile_center() {
        let fixture = fixture_with(
            true,
            ItemDropperDef {
                item_archetype: "rock_item".to_string(),
                max_initial_velocity: -4.0,
                item_spawn_radius: -0.5,
            },
        );
        fixture.tilemap.borrow_mut().set(TileCoord::new(1, 0), -1);

        let mut entities = fixture.entities.borrow_mut();
        assert_eq!(entities.pending_spawn_count(), 1);
        entities.apply_pending();
        let entity = &entities.entities()[0];
        let center = fixture.tilemap.borrow().tile_to_world(TileCoord::new(1, 0));
        assert_eq!(entity.transform.borrow().position, center);
        assert_eq!(entity.velocity, Vec2::ZERO);
    }

    #[test]
    fn tiles_without_loot_drop_nothing() {
        let fixture = fixture(true);
        fixture.tilemap.borrow_mut().set(TileCoord::new(0, 0), 1);
        fixture.tilemap.borrow_mut().set(TileCoord::new(0, 0), -1);
        assert_eq!(fixture.entities.borrow().pending_spawn_count(), 1);
    }

    #[test]
    fn clearing_an_already_empty_cell_drops_nothing() {
        let fixture = fixture(true);
        fixture.tilemap.borrow_mut().set(TileCoord::new(0, 1), 2);
        assert_eq!(fixture.entities.borrow().pending_spawn_count(), 0);
    }

    #[test]
    fn whole_grid_changes_drop_nothing() {
        let fixture = fixture(true);
        fixture
            .tilemap
            .borrow_mut()
            .replace_all(vec![-1; 4])
            .expect("replace");
        assert_eq!(fixture.entities.borrow().pending_spawn_count(), 0);
    }

    #[test]
    fn missing_archetype_drops_nothing() {
        let fixture = fixture(false);
        fixture.tilemap.borrow_mut().set(TileCoord::new(0, 0), -1);
        assert_eq!(fixture.entities.borrow().pending_spawn_count(), 0);
    }

    #[test]
    fn disconnect_stops_drops() {
        let mut fixture = fixture(true);
        fixture._dropper.disconnect();
        fixture.tilemap.borrow_mut().set(TileCoord::new(0, 0), -1);
        assert_eq!(fixture.entities.borrow().pending_spawn_count(), 0);
    }
}

use crate::math::TileCoord;
use crate::tilemap::{SharedTilemap, SubscriberId};
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::rc::Rc;
use tracing::warn;

/// JSON shape of the destructible overlay. `TileTypeHealths` is indexed by
/// tile id; a serialized value of `0.0` means indestructible and is stored
/// as `+inf` in memory.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DestructibleDef {
    #[serde(with = "indestructible_as_zero")]
    pub tile_type_healths: Vec<f32>,
}

mod indestructible_as_zero {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(values: &[f32], serializer: S) -> Result<S::Ok, S::Error> {
        let written: Vec<f32> = values
            .iter()
            .map(|health| if health.is_infinite() { 0.0 } else { *health })
            .collect();
        written.serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f32>, D::Error> {
        let read = Vec::<f32>::deserialize(deserializer)?;
        Ok(read
            .into_iter()
            .map(|health| if health == 0.0 { f32::INFINITY } else { health })
            .collect())
    }
}

#[derive(Debug, Default)]
struct HealthState {
    max_healths: Vec<f32>,
    width: i32,
    height: i32,
    health: Vec<f32>,
}

impl HealthState {
    fn max_health(&self, tile_id: i32) -> f32 {
        if tile_id < 0 {
            return 0.0;
        }
        match self.max_healths.get(tile_id as usize) {
            Some(health) => *health,
            None => f32::INFINITY,
        }
    }

    fn index_of(&self, coord: TileCoord) -> Option<usize> {
        if coord.x < 0 || coord.x >= self.width || coord.y < 0 || coord.y >= self.height {
            return None;
        }
        Some(coord.y as usize * self.width as usize + coord.x as usize)
    }

    fn rebuild(&mut self, width: i32, height: i32, tile_ids: &[i32]) {
        self.width = width;
        self.height = height;
        self.health = tile_ids.iter().map(|id| self.max_health(*id)).collect();
    }
}

/// Per-tile health overlay. Mirrors the source grid's dimensions, resets a
/// cell to full health whenever the tile id under it changes, and clears
/// tiles out of the source when their health is exhausted.
pub struct DestructibleTilemap {
    source: SharedTilemap<i32>,
    state: Rc<RefCell<HealthState>>,
    subscription: Option<SubscriberId>,
}

impl DestructibleTilemap {
    pub fn new(source: SharedTilemap<i32>, def: DestructibleDef) -> Self {
        Self {
            source,
            state: Rc::new(RefCell::new(HealthState {
                max_healths: def.tile_type_healths,
                width: 0,
                height: 0,
                health: Vec::new(),
            })),
            subscription: None,
        }
    }

    /// Builds the health grid from the current source contents and starts
    /// tracking changes under the given subscriber id.
    pub fn connect(&mut self, id: SubscriberId) {
        {
            let source = self.source.borrow();
            self.state
                .borrow_mut()
                .rebuild(source.width(), source.height(), source.cells());
        }
        let state = self.state.clone();
        self.source.borrow_mut().subscribe(
            id,
            Box::new(move |map, coord, _previous| {
                let mut state = state.borrow_mut();
                if coord.is_whole_map() {
                    state.rebuild(map.width(), map.height(), map.cells());
                    return;
                }
                if state.width != map.width() || state.height != map.height() {
                    warn!(
                        health_width = state.width,
                        health_height = state.height,
                        map_width = map.width(),
                        map_height = map.height(),
                        "health grid out of sync with tile grid, dropping cell update"
                    );
                    return;
                }
                let new_max = map.get(coord).map(|id| state.max_health(*id));
                if let (Some(index), Some(max)) = (state.index_of(coord), new_max) {
                    state.health[index] = max;
                }
            }),
        );
        self.subscription = Some(id);
    }

    pub fn disconnect(&mut self) {
        if let Some(id) = self.subscription.take() {
            self.source.borrow_mut().unsubscribe(id);
        }
    }

    pub fn max_health(&self, tile_id: i32) -> f32 {
        self.state.borrow().max_health(tile_id)
    }

    pub fn health_at(&self, coord: TileCoord) -> Option<f32> {
        let state = self.state.borrow();
        state.index_of(coord).map(|index| state.health[index])
    }

    /// Applies damage to one cell. Returns 0 while the tile survives; when
    /// the hit destroys it, the tile id is cleared to -1 (notifying every
    /// subscriber of the source grid) and the overkill amount is returned.
    pub fn damage_tile(&mut self, coord: TileCoord, damage: f32) -> f32 {
        let remaining = {
            let mut state = self.state.borrow_mut();
            let Some(index) = state.index_of(coord) else {
                return 0.0;
            };
            state.health[index] -= damage;
            state.health[index]
        };
        if remaining <= 0.0 {
            self.source.borrow_mut().set(coord, -1);
            let mut state = self.state.borrow_mut();
            if let Some(index) = state.index_of(coord) {
                state.health[index] = 0.0;
            }
            return -remaining;
        }
        0.0
    }

    /// Remaining health as a fraction of the cell's maximum. Empty cells,
    /// indestructible cells, and out-of-bounds coordinates all report 0.
    pub fn health_proportion(&self, coord: TileCoord) -> f32 {
        let state = self.state.borrow();
        let Some(index) = state.index_of(coord) else {
            return 0.0;
        };
        let Some(tile_id) = self.source.borrow().get(coord).copied() else {
            return 0.0;
        };
        let max = state.max_health(tile_id);
        if max <= 0.0 || max.is_infinite() {
            return 0.0;
        }
        state.health[index] / max
    }
}

impl Drop for DestructibleTilemap {
    fn drop(&mut self) {
        self.disconnect();
    }
}

use crate::loot::ItemStack;
use crate::math::{transform_handle, TransformHandle, Vec2};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntityId(pub u64);

#[derive(Debug, Default)]
pub struct EntityIdAllocator {
    next: u64,
}

impl EntityIdAllocator {
    pub fn allocate(&mut self) -> EntityId {
        let id = EntityId(self.next);
        self.next = self.next.saturating_add(1);
        id
    }
}

#[derive(Clone)]
pub struct Entity {
    pub id: EntityId,
    pub archetype: String,
    pub transform: TransformHandle,
    pub velocity: Vec2,
    pub item_stack: Option<ItemStack>,
}

/// Entity container with a deferred spawn/despawn queue. Spawns requested
/// mid-frame (item drops fire from inside tilemap callbacks) become visible
/// after `apply_pending`.
#[derive(Default)]
pub struct EntityWorld {
    allocator: EntityIdAllocator,
    entities: Vec<Entity>,
    pending_spawns: Vec<Entity>,
    pending_despawns: Vec<EntityId>,
}

impl EntityWorld {
    pub fn spawn(
        &mut self,
        archetype: &str,
        position: Vec2,
        velocity: Vec2,
        item_stack: Option<ItemStack>,
    ) -> EntityId {
        let id = self.allocator.allocate();
        self.pending_spawns.push(Entity {
            id,
            archetype: archetype.to_string(),
            transform: transform_handle(position),
            velocity,
            item_stack,
        });
        id
    }

    pub fn despawn(&mut self, id: EntityId) -> bool {
        let exists_now = self.entities.iter().any(|entity| entity.id == id);
        let pending_spawn = self.pending_spawns.iter().any(|entity| entity.id == id);
        if !exists_now && !pending_spawn {
            return false;
        }
        self.pending_despawns.push(id);
        true
    }

    pub fn apply_pending(&mut self) {
        if !self.pending_despawns.is_empty() {
            self.pending_despawns.sort_by_key(|id| id.0);
            self.pending_despawns.dedup();
            let pending = &self.pending_despawns;
            self.entities.retain(|entity| {
                pending
                    .binary_search_by_key(&entity.id.0, |id| id.0)
                    .is_err()
            });
            self.pending_despawns.clear();
        }
        self.entities.append(&mut self.pending_spawns);
    }

    /// Advances every entity by its velocity.
    pub fn integrate(&mut self, dt_seconds: f32) {
        for entity in &self.entities {
            let mut transform = entity.transform.borrow_mut();
            transform.position = transform.position + entity.velocity * dt_seconds;
        }
    }

    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn pending_spawn_count(&self) -> usize {
        self.pending_spawns.len()
    }

    pub fn find_entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.iter().find(|entity| entity.id == id)
    }

    pub fn clear(&mut self) {
        self.entities.clear();
        self.pending_spawns.clear();
        self.pending_despawns.clear();
    }
}
